//! Bar configuration: theme and the ordered plugin list.
//!
//! Read once at startup, never hot-reloaded. Plugin entries keep their
//! file order; that order is the dispatch order and the numeric instance
//! id space.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::plugin::loader::PluginSource;
use crate::theme::ThemeConfig;

/// One `[[plugin]]` entry of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PluginEntry {
    /// Path to a native plugin library.
    pub path: Option<PathBuf>,
    /// Name of a built-in plugin.
    pub builtin: Option<String>,
    /// Plugin-specific configuration subtree, passed to `init`.
    pub config: Option<toml::Table>,
}

impl PluginEntry {
    /// Resolve this entry to a plugin source.
    ///
    /// Exactly one of `path` and `builtin` must be set.
    pub fn source(&self) -> Result<PluginSource> {
        match (&self.path, &self.builtin) {
            (Some(path), None) => Ok(PluginSource::Path(path.clone())),
            (None, Some(name)) => Ok(PluginSource::Builtin(name.clone())),
            (Some(_), Some(_)) => bail!("plugin entry sets both 'path' and 'builtin'"),
            (None, None) => bail!("plugin entry needs either 'path' or 'builtin'"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub theme: ThemeConfig,
    #[serde(rename = "plugin")]
    pub plugins: Vec<PluginEntry>,
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicitly given path must exist; the default path is allowed
    /// to be absent, yielding the default (empty) configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::read(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// `~/.config/barkeep/config.toml` (or the platform equivalent).
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("barkeep").join("config.toml"))
            .context("could not determine the user config directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r##"
            [theme]
            separator = true

            [theme.warning]
            color = "#ffcc00"

            [[plugin]]
            builtin = "datetime"

            [plugin.config]
            format = "%H:%M"

            [[plugin]]
            path = "/usr/lib/barkeep/net.so"
            "##,
        )
        .unwrap();

        assert_eq!(config.plugins.len(), 2);
        assert_eq!(
            config.plugins[0].source().unwrap(),
            PluginSource::Builtin("datetime".to_string())
        );
        let subtree = config.plugins[0].config.as_ref().unwrap();
        assert_eq!(subtree["format"].as_str(), Some("%H:%M"));
        assert_eq!(
            config.plugins[1].source().unwrap(),
            PluginSource::Path(PathBuf::from("/usr/lib/barkeep/net.so"))
        );
        assert_eq!(config.theme.warning.color.as_deref(), Some("#ffcc00"));
    }

    #[test]
    fn test_entry_with_both_sources_rejected() {
        let entry = PluginEntry {
            path: Some(PathBuf::from("/x.so")),
            builtin: Some("datetime".to_string()),
            config: None,
        };
        assert!(entry.source().is_err());
    }

    #[test]
    fn test_entry_with_no_source_rejected() {
        let entry = PluginEntry::default();
        let err = entry.source().unwrap_err();
        assert!(err.to_string().contains("either"));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[plugin]]\nbuiltin = \"cycle\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.plugins.len(), 1);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/barkeep.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = toml::from_str::<Config>("plugins = []");
        assert!(result.is_err());
    }
}
