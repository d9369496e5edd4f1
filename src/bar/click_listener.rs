//! Click-event listener: routes bar clicks back to plugins.
//!
//! The bar writes one JSON click event per line on our stdin, framed as
//! an infinite array (a leading `[` line, then comma-prefixed objects).
//! A dedicated thread parses each line and calls the addressed plugin's
//! click handler synchronously; the plugin's own worker thread keeps
//! running concurrently, so handlers must be thread-safe with respect
//! to `run`.

use serde::{Deserialize, Deserializer};
use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::plugin::convert;
use crate::plugin::handle::PluginHandle;

/// One click event parsed from the bar's input stream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClickEvent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "instance_id")]
    pub instance: usize,
    pub button: u32,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub relative_x: i32,
    #[serde(default)]
    pub relative_y: i32,
    #[serde(default)]
    pub output_x: i32,
    #[serde(default)]
    pub output_y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

/// Bars disagree on whether `instance` is a JSON string or a number;
/// accept both.
fn instance_id<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(id) => Ok(id),
        Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

/// Parse one input line into a click event.
///
/// Array framing (`[`, leading commas, the closing `]`) and unparseable
/// payloads yield `None`; malformed input never reaches a plugin.
pub fn parse_click_line(line: &str) -> Option<ClickEvent> {
    let mut payload = line.trim();
    payload = payload.strip_prefix('[').unwrap_or(payload);
    payload = payload.strip_prefix(',').unwrap_or(payload);
    let payload = payload.trim();
    if payload.is_empty() || payload == "]" {
        return None;
    }
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::debug!("dropping unparseable click event: {}", err);
            None
        }
    }
}

/// Spawn the listener thread over the given input stream.
///
/// The thread lives for the process lifetime; it only exits if the
/// input stream closes. Events addressed outside the configured id
/// range, or to plugins that did not enable click events, are silently
/// dropped.
pub fn spawn<R>(handles: Arc<Vec<PluginHandle>>, input: R) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("click-listener".to_string())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if let Some(event) = parse_click_line(&line) {
                    route(&handles, event);
                }
            }
            tracing::debug!("click input closed");
        })
}

fn route(handles: &[PluginHandle], event: ClickEvent) {
    let Some(handle) = handles.get(event.instance) else {
        tracing::debug!(instance = event.instance, "click for unknown plugin id");
        return;
    };
    if !handle.click_events() {
        tracing::debug!(plugin = %handle.name(), "click for plugin without click events");
        return;
    }
    handle.send_click_event(convert::click_to_ffi(&event, handle.name()));
}
