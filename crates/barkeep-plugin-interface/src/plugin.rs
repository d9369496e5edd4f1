//! Plugin trait definition for the FFI-safe plugin interface.
//!
//! This module defines the core StatusPlugin trait using `#[sabi_trait]`
//! from abi_stable, which generates the necessary FFI-safe trait object
//! types, plus panic-catching call wrappers used by the host.

use abi_stable::sabi_trait;
use abi_stable::std_types::{RBox, RHashMap, RResult, RString};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::api::PluginApi_TO;
use crate::config::FfiConfigValue;
use crate::types::{FfiClickEvent, FfiPluginInfo};

/// The main trait all status plugins implement.
///
/// The `#[sabi_trait]` attribute generates `StatusPlugin_TO`, a
/// type-erased FFI-safe trait object that can be safely passed across
/// dynamic library boundaries. Built-in plugins are wrapped into the same
/// trait object with `StatusPlugin_TO::from_value`, so the host never
/// distinguishes the two past load time.
///
/// All methods take `&self`: `on_click_event` is delivered from the
/// host's listener thread concurrently with `run`, so plugins keep their
/// mutable state behind a `Mutex` (or equivalent) internally.
///
/// # Example (for plugin implementors)
///
/// ```ignore
/// use barkeep_plugin_interface::{
///     FfiClickEvent, FfiConfigValue, FfiPluginInfo, PluginApi_TO, StatusPlugin,
/// };
/// use abi_stable::std_types::{RBox, RHashMap, RResult, RString};
///
/// #[derive(Debug)]
/// struct Uptime { /* Mutex-guarded state */ }
///
/// impl StatusPlugin for Uptime {
///     fn init(
///         &self,
///         api: PluginApi_TO<'static, RBox<()>>,
///         _config: RHashMap<RString, FfiConfigValue>,
///     ) -> RResult<FfiPluginInfo, RString> {
///         // store api, return identity
///         RResult::ROk(FfiPluginInfo { name: "uptime".into(), click_events: false })
///     }
///
///     fn run(&self) -> RResult<(), RString> {
///         // loop: api.put_block(...); sleep until term() wakes us
///         RResult::ROk(())
///     }
///
///     fn term(&self) { /* set stop flag, wake run() */ }
///
///     fn on_click_event(&self, _event: FfiClickEvent) -> RResult<(), RString> {
///         RResult::ROk(())
///     }
/// }
/// ```
#[sabi_trait]
pub trait StatusPlugin: Send + Sync + Debug {
    /// Negotiate identity and receive the output channel.
    ///
    /// Called exactly once, synchronously on the host's startup thread,
    /// before `run`. The plugin must store `api` for later use and return
    /// its display name plus whether it wants click events.
    ///
    /// Returning `RErr` (or panicking) aborts startup.
    fn init(
        &self,
        api: PluginApi_TO<'static, RBox<()>>,
        config: RHashMap<RString, FfiConfigValue>,
    ) -> RResult<FfiPluginInfo, RString>;

    /// The plugin's worker loop, called on a dedicated host-owned thread.
    ///
    /// Expected to block (sleep, wait on I/O) between updates and to
    /// return promptly once `term` has been called. An `RErr` return is
    /// treated as an unrecoverable plugin failure.
    fn run(&self) -> RResult<(), RString>;

    /// Cooperative termination signal.
    ///
    /// Called synchronously from the host while `run` may still be
    /// executing; must cause `run` to return soon (typically by setting a
    /// flag and waking a condition variable the run loop sleeps on).
    fn term(&self);

    /// Handle a click event routed to this plugin.
    ///
    /// Called synchronously on the host's click-listener thread,
    /// concurrently with `run`. An `RErr` return is treated as an
    /// unrecoverable plugin failure.
    #[sabi(last_prefix_field)]
    fn on_click_event(&self, event: FfiClickEvent) -> RResult<(), RString>;
}

/// Extract a printable message from a caught panic payload.
fn panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Call `plugin.init()` safely, catching panics.
///
/// Panics must not cross the FFI boundary (undefined behavior), so every
/// host-side call into a plugin goes through one of these wrappers.
pub fn call_plugin_init(
    plugin: &StatusPlugin_TO<'static, RBox<()>>,
    api: PluginApi_TO<'static, RBox<()>>,
    config: RHashMap<RString, FfiConfigValue>,
) -> Result<FfiPluginInfo, String> {
    let result = catch_unwind(AssertUnwindSafe(|| plugin.init(api, config)));

    match result {
        Ok(RResult::ROk(info)) => Ok(info),
        Ok(RResult::RErr(msg)) => Err(msg.into_string()),
        Err(panic_info) => Err(format!("init panicked: {}", panic_message(panic_info))),
    }
}

/// Call `plugin.run()` safely, catching panics.
pub fn call_plugin_run(plugin: &StatusPlugin_TO<'static, RBox<()>>) -> Result<(), String> {
    let result = catch_unwind(AssertUnwindSafe(|| plugin.run()));

    match result {
        Ok(RResult::ROk(())) => Ok(()),
        Ok(RResult::RErr(msg)) => Err(msg.into_string()),
        Err(panic_info) => Err(format!("run panicked: {}", panic_message(panic_info))),
    }
}

/// Call `plugin.term()` safely, catching panics.
pub fn call_plugin_term(plugin: &StatusPlugin_TO<'static, RBox<()>>) -> Result<(), String> {
    let result = catch_unwind(AssertUnwindSafe(|| plugin.term()));

    match result {
        Ok(()) => Ok(()),
        Err(panic_info) => Err(format!("term panicked: {}", panic_message(panic_info))),
    }
}

/// Call `plugin.on_click_event()` safely, catching panics.
pub fn call_plugin_on_click_event(
    plugin: &StatusPlugin_TO<'static, RBox<()>>,
    event: FfiClickEvent,
) -> Result<(), String> {
    let result = catch_unwind(AssertUnwindSafe(|| plugin.on_click_event(event)));

    match result {
        Ok(RResult::ROk(())) => Ok(()),
        Ok(RResult::RErr(msg)) => Err(msg.into_string()),
        Err(panic_info) => Err(format!(
            "click handler panicked: {}",
            panic_message(panic_info)
        )),
    }
}
