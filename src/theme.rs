//! Theme: mapping semantic block states to visual attributes.
//!
//! Plugins declare what kind of information they are showing; this module
//! decides how it looks. Colors are `#rrggbb` strings passed through to
//! the bar; an unset attribute falls back to the bar's own defaults.

use serde::Deserialize;

use crate::bar::protocol::BlockState;

/// Visual attributes of one semantic state.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StateStyle {
    pub color: Option<String>,
    pub background: Option<String>,
    pub border: Option<String>,
}

/// The `[theme]` section of the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub idle: StateStyle,
    pub info: StateStyle,
    pub good: StateStyle,
    pub warning: StateStyle,
    pub critical: StateStyle,
    pub error: StateStyle,
    /// Whether the bar draws a separator after each block (bar default
    /// when unset).
    pub separator: Option<bool>,
    /// Width of the separator gap in pixels.
    pub separator_block_width: Option<u32>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            idle: StateStyle::default(),
            info: StateStyle {
                color: Some("#81a1c1".to_string()),
                ..StateStyle::default()
            },
            good: StateStyle {
                color: Some("#a3be8c".to_string()),
                ..StateStyle::default()
            },
            warning: StateStyle {
                color: Some("#ebcb8b".to_string()),
                ..StateStyle::default()
            },
            critical: StateStyle {
                color: Some("#bf616a".to_string()),
                ..StateStyle::default()
            },
            error: StateStyle {
                color: Some("#2e3440".to_string()),
                background: Some("#bf616a".to_string()),
                ..StateStyle::default()
            },
            separator: None,
            separator_block_width: None,
        }
    }
}

/// Resolved theme, with invalid color values dropped.
#[derive(Debug, Clone)]
pub struct Theme {
    config: ThemeConfig,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Self {
        let mut config = config.clone();
        for style in [
            &mut config.idle,
            &mut config.info,
            &mut config.good,
            &mut config.warning,
            &mut config.critical,
            &mut config.error,
        ] {
            sanitize_style(style);
        }
        Self { config }
    }

    /// Attributes for the given semantic state.
    pub fn style(&self, state: BlockState) -> &StateStyle {
        match state {
            BlockState::Idle => &self.config.idle,
            BlockState::Info => &self.config.info,
            BlockState::Good => &self.config.good,
            BlockState::Warning => &self.config.warning,
            BlockState::Critical => &self.config.critical,
            BlockState::Error => &self.config.error,
        }
    }

    pub fn separator(&self) -> Option<bool> {
        self.config.separator
    }

    pub fn separator_block_width(&self) -> Option<u32> {
        self.config.separator_block_width
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default())
    }
}

fn sanitize_style(style: &mut StateStyle) {
    for slot in [&mut style.color, &mut style.background, &mut style.border] {
        if let Some(value) = slot
            && !is_valid_color(value)
        {
            tracing::warn!(color = %value, "ignoring invalid theme color");
            *slot = None;
        }
    }
}

/// Accept `#rgb`, `#rrggbb` and `#rrggbbaa` hex colors.
fn is_valid_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_theme_styles_states() {
        let theme = Theme::default();
        assert_eq!(theme.style(BlockState::Idle).color, None);
        assert_eq!(
            theme.style(BlockState::Good).color.as_deref(),
            Some("#a3be8c")
        );
        assert!(theme.style(BlockState::Error).background.is_some());
    }

    #[test]
    fn test_invalid_colors_dropped() {
        let mut config = ThemeConfig::default();
        config.warning.color = Some("yellow".to_string());
        config.warning.background = Some("#ffee0".to_string());
        let theme = Theme::from_config(&config);
        assert_eq!(theme.style(BlockState::Warning).color, None);
        assert_eq!(theme.style(BlockState::Warning).background, None);
    }

    #[test]
    fn test_color_validation() {
        assert!(is_valid_color("#fff"));
        assert!(is_valid_color("#a3be8c"));
        assert!(is_valid_color("#a3be8cff"));
        assert!(!is_valid_color("a3be8c"));
        assert!(!is_valid_color("#a3be8"));
        assert!(!is_valid_color("#zzzzzz"));
    }

    #[test]
    fn test_theme_config_parses_from_toml() {
        let config: ThemeConfig = toml::from_str(
            r##"
            separator = false
            separator_block_width = 12

            [critical]
            color = "#000000"
            background = "#ff5555"
            "##,
        )
        .unwrap();
        assert_eq!(config.separator, Some(false));
        assert_eq!(config.separator_block_width, Some(12));
        assert_eq!(config.critical.background.as_deref(), Some("#ff5555"));
        // Unmentioned states keep their defaults.
        assert_eq!(config.good.color.as_deref(), Some("#a3be8c"));
    }
}
