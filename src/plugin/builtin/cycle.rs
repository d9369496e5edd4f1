//! Built-in test plugin cycling through the semantic states.
//!
//! Useful for theme tuning and for poking at the bar protocol without
//! real data sources. Config keys: `label` (block text prefix),
//! `interval_ms` (tick length). Left click advances the state
//! immediately; middle click hides the block until the next tick.

use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use abi_stable::std_types::{RBox, RHashMap, RResult, RString};

use barkeep_plugin_interface::{
    FfiBlock, FfiBlockState, FfiClickEvent, FfiConfigValue, FfiPluginInfo, PluginApi_TO,
    StatusPlugin,
};

const DEFAULT_LABEL: &str = "cycle";
const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);
const MIN_INTERVAL: Duration = Duration::from_millis(50);

const STATES: [FfiBlockState; 6] = [
    FfiBlockState::Idle,
    FfiBlockState::Info,
    FfiBlockState::Good,
    FfiBlockState::Warning,
    FfiBlockState::Critical,
    FfiBlockState::Error,
];

fn state_name(state: FfiBlockState) -> &'static str {
    match state {
        FfiBlockState::Idle => "idle",
        FfiBlockState::Info => "info",
        FfiBlockState::Good => "good",
        FfiBlockState::Warning => "warning",
        FfiBlockState::Critical => "critical",
        FfiBlockState::Error => "error",
    }
}

struct State {
    api: Option<PluginApi_TO<'static, RBox<()>>>,
    label: String,
    interval: Duration,
    index: usize,
    stop: bool,
}

impl State {
    fn publish_current(&self) -> bool {
        let state = STATES[self.index % STATES.len()];
        let text = format!("{}: {}", self.label, state_name(state));
        match self.api.as_ref() {
            Some(api) => api.put_block(FfiBlock::new(text, state)),
            None => false,
        }
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % STATES.len();
    }
}

pub struct Cycle {
    state: Mutex<State>,
    wake: Condvar,
}

impl Cycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                api: None,
                label: DEFAULT_LABEL.to_string(),
                interval: DEFAULT_INTERVAL,
                index: 0,
                stop: false,
            }),
            wake: Condvar::new(),
        }
    }
}

impl Default for Cycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cycle").finish_non_exhaustive()
    }
}

impl StatusPlugin for Cycle {
    fn init(
        &self,
        api: PluginApi_TO<'static, RBox<()>>,
        config: RHashMap<RString, FfiConfigValue>,
    ) -> RResult<FfiPluginInfo, RString> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = config.get("label") {
            match value.as_str() {
                Some(label) => state.label = label.to_string(),
                None => return RResult::RErr("config key 'label' must be a string".into()),
            }
        }
        if let Some(value) = config.get("interval_ms") {
            match value.as_integer() {
                Some(ms) if ms > 0 => {
                    state.interval = Duration::from_millis(ms as u64).max(MIN_INTERVAL);
                }
                _ => {
                    return RResult::RErr(
                        "config key 'interval_ms' must be a positive integer".into(),
                    );
                }
            }
        }
        state.api = Some(api);
        RResult::ROk(FfiPluginInfo {
            name: "cycle".into(),
            click_events: true,
        })
    }

    fn run(&self) -> RResult<(), RString> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while !state.stop {
            if !state.publish_current() {
                break;
            }
            state.advance();
            let interval = state.interval;
            let (guard, _) = self
                .wake
                .wait_timeout(state, interval)
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

    fn on_click_event(&self, event: FfiClickEvent) -> RResult<(), RString> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if event.button == 2 {
            if let Some(api) = state.api.as_ref() {
                api.hide();
            }
            return RResult::ROk(());
        }
        state.advance();
        state.publish_current();
        RResult::ROk(())
    }
}
