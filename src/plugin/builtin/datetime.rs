//! Built-in clock plugin.
//!
//! Publishes the local time once per second. Clicking the block toggles
//! an alternate format (a date view by default). Config keys:
//! `format`, `format_alt` (strftime syntax).

use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use abi_stable::std_types::{RBox, RHashMap, RResult, RString};
use chrono::Local;

use barkeep_plugin_interface::{
    FfiBlock, FfiBlockState, FfiClickEvent, FfiConfigValue, FfiPluginInfo, PluginApi_TO,
    StatusPlugin,
};

const DEFAULT_FORMAT: &str = "%a %d %b %H:%M:%S";
const DEFAULT_ALT_FORMAT: &str = "%Y-%m-%d";

struct State {
    api: Option<PluginApi_TO<'static, RBox<()>>>,
    format: String,
    alt_format: String,
    show_alt: bool,
    stop: bool,
}

pub struct DateTime {
    state: Mutex<State>,
    wake: Condvar,
}

impl DateTime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                api: None,
                format: DEFAULT_FORMAT.to_string(),
                alt_format: DEFAULT_ALT_FORMAT.to_string(),
                show_alt: false,
                stop: false,
            }),
            wake: Condvar::new(),
        }
    }
}

impl Default for DateTime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateTime").finish_non_exhaustive()
    }
}

fn render(state: &State) -> FfiBlock {
    let format = if state.show_alt {
        &state.alt_format
    } else {
        &state.format
    };
    FfiBlock::new(
        Local::now().format(format).to_string(),
        FfiBlockState::Idle,
    )
}

/// Sleep just long enough to wake at the next wall-clock second.
fn until_next_second() -> Duration {
    let subsec = u64::from(Local::now().timestamp_subsec_millis());
    Duration::from_millis(1000u64.saturating_sub(subsec).max(1))
}

fn config_string(
    config: &RHashMap<RString, FfiConfigValue>,
    key: &str,
) -> Result<Option<String>, RString> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| format!("config key '{}' must be a string", key).into()),
    }
}

impl StatusPlugin for DateTime {
    fn init(
        &self,
        api: PluginApi_TO<'static, RBox<()>>,
        config: RHashMap<RString, FfiConfigValue>,
    ) -> RResult<FfiPluginInfo, RString> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match config_string(&config, "format") {
            Ok(Some(format)) => state.format = format,
            Ok(None) => {}
            Err(e) => return RResult::RErr(e),
        }
        match config_string(&config, "format_alt") {
            Ok(Some(format)) => state.alt_format = format,
            Ok(None) => {}
            Err(e) => return RResult::RErr(e),
        }
        state.api = Some(api);
        // Render both formats once so a broken strftime string fails at
        // startup instead of on the bar.
        let _ = render(&state);
        state.show_alt = true;
        let _ = render(&state);
        state.show_alt = false;
        RResult::ROk(FfiPluginInfo {
            name: "datetime".into(),
            click_events: true,
        })
    }

    fn run(&self) -> RResult<(), RString> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while !state.stop {
            let block = render(&state);
            let Some(api) = state.api.as_ref() else {
                return RResult::RErr("run called before init".into());
            };
            if !api.put_block(block) {
                break;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(state, until_next_second())
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
        RResult::ROk(())
    }

    fn term(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.stop = true;
        self.wake.notify_all();
    }

    fn on_click_event(&self, _event: FfiClickEvent) -> RResult<(), RString> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.show_alt = !state.show_alt;
        let block = render(&state);
        if let Some(api) = state.api.as_ref() {
            api.put_block(block);
        }
        RResult::ROk(())
    }
}
