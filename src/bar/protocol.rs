//! Wire protocol for i3bar-compatible hosts.
//!
//! The output stream is line-oriented: one JSON header object, then an
//! infinite JSON array whose elements are complete status lines (arrays
//! of block objects), one per line, comma-terminated. Every status line
//! is a full redraw; the bar replaces its previous content wholesale.

use serde::Serialize;
use std::io::{self, Write};

use crate::theme::Theme;
use barkeep_plugin_interface::FfiBlockState;

/// Protocol version understood by i3bar and swaybar.
pub const PROTOCOL_VERSION: u32 = 1;

/// Signals the bar sends to pause/resume us when hidden. We install no
/// handlers, so the kernel defaults (SIGSTOP/SIGCONT) apply.
const STOP_SIGNAL: i32 = 19;
const CONT_SIGNAL: i32 = 18;

/// First line of the output stream.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Header {
    pub version: u32,
    pub stop_signal: i32,
    pub cont_signal: i32,
    pub click_events: bool,
}

impl Header {
    pub fn new(click_events: bool) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            stop_signal: STOP_SIGNAL,
            cont_signal: CONT_SIGNAL,
            click_events,
        }
    }
}

/// Semantic state of a block, host-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Idle,
    Info,
    Good,
    Warning,
    Critical,
    Error,
}

impl From<FfiBlockState> for BlockState {
    fn from(state: FfiBlockState) -> Self {
        match state {
            FfiBlockState::Idle => BlockState::Idle,
            FfiBlockState::Info => BlockState::Info,
            FfiBlockState::Good => BlockState::Good,
            FfiBlockState::Warning => BlockState::Warning,
            FfiBlockState::Critical => BlockState::Critical,
            FfiBlockState::Error => BlockState::Error,
        }
    }
}

/// A plugin's renderable output for one dispatch cycle, before theming.
///
/// This is what travels through a plugin's rendezvous channel; the
/// dispatcher tags it with identity and theme attributes at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockContent {
    pub full_text: String,
    pub short_text: Option<String>,
    pub state: BlockState,
    pub urgent: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// One block object of the wire status line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Block {
    /// Display name of the producing plugin.
    pub name: String,
    /// Numeric dispatch id, echoed back in click events.
    pub instance: String,
    pub full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub urgent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator_block_width: Option<u32>,
}

/// Tag plugin output with its identity and theme attributes.
pub fn render_block(content: &BlockContent, name: &str, id: usize, theme: &Theme) -> Block {
    let style = theme.style(content.state);
    Block {
        name: name.to_string(),
        instance: id.to_string(),
        full_text: content.full_text.clone(),
        short_text: content.short_text.clone(),
        color: style.color.clone(),
        background: style.background.clone(),
        border: style.border.clone(),
        urgent: content.urgent,
        separator: theme.separator(),
        separator_block_width: theme.separator_block_width(),
    }
}

/// Write the protocol preamble: the header object and the opening `[`
/// of the infinite status-line array.
pub fn write_preamble(w: &mut impl Write, header: &Header) -> io::Result<()> {
    serde_json::to_writer(&mut *w, header)?;
    w.write_all(b"\n[\n")?;
    w.flush()
}

/// Write one full status line (a complete array of blocks).
pub fn write_status_line<'a>(
    w: &mut impl Write,
    blocks: impl Iterator<Item = &'a Block>,
) -> io::Result<()> {
    let line: Vec<&Block> = blocks.collect();
    serde_json::to_writer(&mut *w, &line)?;
    w.write_all(b",\n")?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{Theme, ThemeConfig};
    use pretty_assertions::assert_eq;

    fn plain_theme() -> Theme {
        Theme::from_config(&ThemeConfig::default())
    }

    #[test]
    fn test_header_line() {
        let mut out = Vec::new();
        write_preamble(&mut out, &Header::new(true)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let (header_line, rest) = text.split_once('\n').unwrap();
        assert_eq!(rest, "[\n");

        let value: serde_json::Value = serde_json::from_str(header_line).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["click_events"], true);
        assert_eq!(value["stop_signal"], 19);
        assert_eq!(value["cont_signal"], 18);
    }

    #[test]
    fn test_status_line_is_json_array_with_trailing_comma() {
        let theme = plain_theme();
        let content = BlockContent {
            full_text: "12:00".to_string(),
            short_text: None,
            state: BlockState::Idle,
            urgent: false,
        };
        let block = render_block(&content, "datetime", 0, &theme);

        let mut out = Vec::new();
        write_status_line(&mut out, [&block].into_iter()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with(",\n"));

        let value: serde_json::Value =
            serde_json::from_str(text.trim_end_matches(",\n")).unwrap();
        assert_eq!(value[0]["full_text"], "12:00");
        assert_eq!(value[0]["name"], "datetime");
        assert_eq!(value[0]["instance"], "0");
    }

    #[test]
    fn test_unset_attributes_are_omitted() {
        let theme = plain_theme();
        let content = BlockContent {
            full_text: "ok".to_string(),
            short_text: None,
            state: BlockState::Idle,
            urgent: false,
        };
        let block = render_block(&content, "p", 1, &theme);
        let json = serde_json::to_string(&block).unwrap();
        assert!(!json.contains("short_text"));
        assert!(!json.contains("urgent"));
    }

    #[test]
    fn test_urgent_and_state_color_carried() {
        let theme = plain_theme();
        let content = BlockContent {
            full_text: "disk 97%".to_string(),
            short_text: Some("97%".to_string()),
            state: BlockState::Critical,
            urgent: true,
        };
        let block = render_block(&content, "disk", 2, &theme);
        assert!(block.urgent);
        assert_eq!(block.color, theme.style(BlockState::Critical).color);
        assert_eq!(block.short_text.as_deref(), Some("97%"));
    }

    #[test]
    fn test_block_state_from_ffi() {
        assert_eq!(BlockState::from(FfiBlockState::Good), BlockState::Good);
        assert_eq!(BlockState::from(FfiBlockState::Error), BlockState::Error);
    }
}
