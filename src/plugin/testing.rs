//! Test doubles for the plugin layer.
//!
//! `StubPlugin` implements the full plugin contract in-process with
//! scriptable behavior, so handle/dispatch tests can exercise the real
//! channel, queue and FFI wrappers without loading a library.

use std::fmt;
use std::sync::{Condvar, Mutex};

use abi_stable::sabi_trait::prelude::TD_Opaque;
use abi_stable::std_types::{RBox, RHashMap, RResult, RString};

use barkeep_plugin_interface::{
    FfiBlock, FfiBlockState, FfiClickEvent, FfiConfigValue, FfiPluginInfo, PluginApi_TO,
    StatusPlugin, StatusPlugin_TO,
};

/// What the stub's `run` does after init.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunMode {
    /// Publish nothing; sleep until term.
    IdleUntilTerm,
    /// Publish one block, then sleep until term.
    PublishThenWait(&'static str),
    /// Fail immediately with this message.
    Fail(&'static str),
    /// Panic immediately with this message.
    Panic(&'static str),
}

/// How the stub's `init` behaves.
#[derive(Clone, Copy, Debug, PartialEq)]
enum InitMode {
    Succeed,
    Fail(&'static str),
    Panic(&'static str),
}

struct StubState {
    api: Option<PluginApi_TO<'static, RBox<()>>>,
    stop: bool,
    clicks: u32,
}

pub struct StubPlugin {
    name: &'static str,
    click_events: bool,
    init_mode: InitMode,
    run_mode: RunMode,
    fail_clicks: Option<&'static str>,
    state: Mutex<StubState>,
    wake: Condvar,
}

impl StubPlugin {
    fn base(name: &'static str) -> Self {
        Self {
            name,
            click_events: true,
            init_mode: InitMode::Succeed,
            run_mode: RunMode::IdleUntilTerm,
            fail_clicks: None,
            state: Mutex::new(StubState {
                api: None,
                stop: false,
                clicks: 0,
            }),
            wake: Condvar::new(),
        }
    }

    /// A well-behaved stub with the given display name.
    pub fn named(name: &'static str) -> Self {
        Self::base(name)
    }

    /// Publishes `text` once at the start of its run loop.
    pub fn publishing(text: &'static str) -> Self {
        Self {
            run_mode: RunMode::PublishThenWait(text),
            ..Self::base("stub")
        }
    }

    /// `run` fails with `message`.
    pub fn failing_run(message: &'static str) -> Self {
        Self {
            run_mode: RunMode::Fail(message),
            ..Self::base("stub")
        }
    }

    /// `run` panics with `message`.
    pub fn panicking_run(message: &'static str) -> Self {
        Self {
            run_mode: RunMode::Panic(message),
            ..Self::base("stub")
        }
    }

    /// `init` fails with `message`.
    pub fn failing_init(message: &'static str) -> Self {
        Self {
            init_mode: InitMode::Fail(message),
            ..Self::base("stub")
        }
    }

    /// `init` panics with `message`.
    pub fn panicking_init(message: &'static str) -> Self {
        Self {
            init_mode: InitMode::Panic(message),
            ..Self::base("stub")
        }
    }

    /// The click handler fails with `message`.
    pub fn failing_clicks(message: &'static str) -> Self {
        Self {
            fail_clicks: Some(message),
            ..Self::base("stub")
        }
    }
}

impl fmt::Debug for StubPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubPlugin")
            .field("name", &self.name)
            .field("run_mode", &self.run_mode)
            .finish_non_exhaustive()
    }
}

impl StatusPlugin for StubPlugin {
    fn init(
        &self,
        api: PluginApi_TO<'static, RBox<()>>,
        _config: RHashMap<RString, FfiConfigValue>,
    ) -> RResult<FfiPluginInfo, RString> {
        match self.init_mode {
            InitMode::Fail(message) => return RResult::RErr(message.into()),
            InitMode::Panic(message) => panic!("{}", message),
            InitMode::Succeed => {}
        }
        let mut state = self.state.lock().unwrap();
        state.api = Some(api);
        RResult::ROk(FfiPluginInfo {
            name: self.name.into(),
            click_events: self.click_events,
        })
    }

    fn run(&self) -> RResult<(), RString> {
        match self.run_mode {
            RunMode::Fail(message) => return RResult::RErr(message.into()),
            RunMode::Panic(message) => panic!("{}", message),
            RunMode::PublishThenWait(text) => {
                let state = self.state.lock().unwrap();
                if let Some(api) = state.api.as_ref() {
                    api.put_block(FfiBlock::new(text, FfiBlockState::Info));
                }
            }
            RunMode::IdleUntilTerm => {}
        }
        let mut state = self.state.lock().unwrap();
        while !state.stop {
            state = self.wake.wait(state).unwrap();
        }
        RResult::ROk(())
    }

    fn term(&self) {
        let mut state = self.state.lock().unwrap();
        state.stop = true;
        self.wake.notify_all();
    }

    fn on_click_event(&self, event: FfiClickEvent) -> RResult<(), RString> {
        if let Some(message) = self.fail_clicks {
            return RResult::RErr(message.into());
        }
        let mut state = self.state.lock().unwrap();
        if event.button == 2 {
            if let Some(api) = state.api.as_ref() {
                api.hide();
            }
            return RResult::ROk(());
        }
        state.clicks += 1;
        let text = format!("clicks={}", state.clicks);
        if let Some(api) = state.api.as_ref() {
            api.put_block(FfiBlock::new(text, FfiBlockState::Info));
        }
        RResult::ROk(())
    }
}

/// Erase a stub into the same trait object a loaded library would yield.
pub fn stub_to(stub: StubPlugin) -> StatusPlugin_TO<'static, RBox<()>> {
    StatusPlugin_TO::from_value(stub, TD_Opaque)
}

/// A minimal click event addressed at `instance` with the given button.
pub fn stub_click_event(instance: u32, button: u32) -> FfiClickEvent {
    FfiClickEvent {
        name: "stub".into(),
        instance,
        button,
        modifiers: 0,
        x: 0,
        y: 0,
        relative_x: 0,
        relative_y: 0,
        output_x: 0,
        output_y: 0,
        width: 0,
        height: 0,
    }
}
