//! Owning wrapper around a loaded plugin, its worker thread, and its
//! output channel.
//!
//! Every call into the plugin goes through a panic-catching wrapper; a
//! plugin failing in `run`, `term` or its click handler never unwinds
//! into a host thread. Failures are instead injected into the plugin's
//! own channel through a producer handle the plugin itself never sees,
//! so the dispatcher observes them in order, like any other output.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use abi_stable::sabi_trait::prelude::TD_Opaque;
use abi_stable::std_types::RBox;
use anyhow::{bail, Result};

use barkeep_plugin_interface::{
    call_plugin_init, call_plugin_on_click_event, call_plugin_run, call_plugin_term,
    FfiClickEvent, PluginApi_TO, StatusPlugin_TO,
};

use crate::bar::protocol::BlockContent;
use crate::plugin::convert;
use crate::plugin::host_impl::PluginApiImpl;
use crate::plugin::loader::{self, PluginErrorKind, PluginLoadError, PluginSource};
use crate::sync::rendezvous::{self, Consumer, Producer};

/// What travels through a plugin's channel: a new block, or `None` to
/// hide the plugin until its next block.
pub type BlockUpdate = Option<BlockContent>;

/// Runtime failure of one plugin, as observed by the dispatcher.
#[derive(Debug, Clone)]
pub struct PluginError {
    /// Dispatch id of the failed plugin.
    pub id: usize,
    /// Display name negotiated at init.
    pub name: String,
    /// Rendered source descriptor (path or builtin name).
    pub source: String,
    /// The inner failure message.
    pub message: String,
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plugin {} '{}' ({}) failed: {}",
            self.id, self.name, self.source, self.message
        )
    }
}

impl std::error::Error for PluginError {}

/// Owning wrapper around one loaded plugin.
///
/// Holds the plugin instance, the consumer half of its output channel,
/// a retained producer for synthetic error injection, and (once `run`
/// has been called) the worker thread. Dropping the handle signals the
/// plugin with `term()` and then joins the worker; that order is
/// mandatory, since the worker may be blocked inside the plugin's run
/// loop until `term` wakes it.
pub struct PluginHandle {
    id: usize,
    source: PluginSource,
    name: String,
    click_events: bool,
    plugin: Arc<StatusPlugin_TO<'static, RBox<()>>>,
    producer: Producer<BlockUpdate, String>,
    consumer: Consumer<BlockUpdate, String>,
    worker: Option<JoinHandle<()>>,
}

impl PluginHandle {
    /// Load a plugin from its source and initialize it.
    ///
    /// `init` runs synchronously on the calling thread; the worker
    /// thread is not started until [`run`](Self::run).
    pub fn new(
        id: usize,
        source: PluginSource,
        config: Option<&toml::Table>,
    ) -> Result<Self, PluginLoadError> {
        let plugin = loader::load(id, &source)?;
        Self::with_plugin(id, source, plugin, config)
    }

    /// Initialize an already-instantiated plugin.
    pub(crate) fn with_plugin(
        id: usize,
        source: PluginSource,
        plugin: StatusPlugin_TO<'static, RBox<()>>,
        config: Option<&toml::Table>,
    ) -> Result<Self, PluginLoadError> {
        let (producer, consumer) = rendezvous::channel();
        let api = PluginApi_TO::from_value(PluginApiImpl::new(producer.clone()), TD_Opaque);
        let ffi_config = convert::config_to_ffi(config);

        let info = call_plugin_init(&plugin, api, ffi_config).map_err(|message| {
            PluginLoadError::new(
                id,
                &source,
                PluginErrorKind::InitFailed,
                format!("init failed: {}", message),
            )
        })?;

        let name = info.name.into_string();
        if name.is_empty() {
            return Err(PluginLoadError::new(
                id,
                &source,
                PluginErrorKind::InvalidName,
                "init returned an empty display name",
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(PluginLoadError::new(
                id,
                &source,
                PluginErrorKind::InvalidName,
                format!(
                    "display name '{}' contains characters outside [A-Za-z0-9_-]",
                    name
                ),
            ));
        }

        tracing::info!(plugin = %name, source = %source, id, "plugin initialized");
        Ok(Self {
            id,
            source,
            name,
            click_events: info.click_events,
            plugin: Arc::new(plugin),
            producer,
            consumer,
            worker: None,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &PluginSource {
        &self.source
    }

    pub fn click_events(&self) -> bool {
        self.click_events
    }

    /// Consumer half of this plugin's channel, for callback wiring and
    /// state inspection.
    pub fn comm(&self) -> &Consumer<BlockUpdate, String> {
        &self.consumer
    }

    /// Start the worker thread running the plugin's `run` loop.
    ///
    /// An error or panic escaping the plugin is captured on the worker
    /// thread and latched into the channel; it never unwinds further.
    pub fn run(&mut self) -> Result<()> {
        if self.worker.is_some() {
            bail!("plugin '{}' is already running", self.name);
        }

        let plugin = Arc::clone(&self.plugin);
        let producer = self.producer.clone();
        let name = self.name.clone();
        let worker = thread::Builder::new()
            .name(format!("plugin-{}", self.name))
            .spawn(move || {
                tracing::debug!(plugin = %name, "worker thread started");
                match call_plugin_run(&plugin) {
                    Ok(()) => tracing::debug!(plugin = %name, "run returned"),
                    Err(message) => {
                        tracing::warn!(plugin = %name, "run failed: {}", message);
                        producer.put_error(message);
                    }
                }
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Deliver a click event to the plugin, synchronously on the calling
    /// (listener) thread.
    pub fn send_click_event(&self, event: FfiClickEvent) {
        if let Err(message) = call_plugin_on_click_event(&self.plugin, event) {
            tracing::warn!(plugin = %self.name, "click handler failed: {}", message);
            self.producer.put_error(message);
        }
    }

    /// Fetch the plugin's latest output, blocking until one is present.
    ///
    /// A latched channel error comes back wrapped with this plugin's
    /// identity.
    pub fn latest(&self) -> Result<BlockUpdate, PluginError> {
        self.consumer.get().map_err(|message| PluginError {
            id: self.id,
            name: self.name.clone(),
            source: self.source.to_string(),
            message,
        })
    }
}

impl Drop for PluginHandle {
    fn drop(&mut self) {
        // Signal first: the worker may be asleep inside run() until
        // term() wakes it. Joining before signalling would deadlock.
        if let Err(message) = call_plugin_term(&self.plugin) {
            tracing::warn!(plugin = %self.name, "term failed: {}", message);
            self.producer.put_error(message);
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!(plugin = %self.name, "worker thread panicked outside the plugin call");
        }
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("source", &self.source)
            .field("click_events", &self.click_events)
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::testing::{stub_click_event, stub_to, StubPlugin};
    use std::time::Duration;

    fn stub_source() -> PluginSource {
        PluginSource::Builtin("stub".to_string())
    }

    fn make_handle(id: usize, stub: StubPlugin) -> Result<PluginHandle, PluginLoadError> {
        PluginHandle::with_plugin(id, stub_source(), stub_to(stub), None)
    }

    #[test]
    fn test_init_negotiates_identity() {
        let handle = make_handle(0, StubPlugin::named("stub-a")).unwrap();
        assert_eq!(handle.id(), 0);
        assert_eq!(handle.name(), "stub-a");
        assert!(handle.click_events());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = make_handle(1, StubPlugin::named("")).unwrap_err();
        assert!(matches!(err.kind, PluginErrorKind::InvalidName));
        // The diagnostic must mention where the plugin came from.
        assert!(err.to_string().contains("builtin:stub"));
    }

    #[test]
    fn test_name_with_invalid_characters_rejected() {
        let err = make_handle(1, StubPlugin::named("bad name!")).unwrap_err();
        assert!(matches!(err.kind, PluginErrorKind::InvalidName));
        assert!(err.message.contains("bad name!"));
    }

    #[test]
    fn test_init_error_is_startup_fatal() {
        let err = make_handle(2, StubPlugin::failing_init("no such device")).unwrap_err();
        assert!(matches!(err.kind, PluginErrorKind::InitFailed));
        assert!(err.message.contains("no such device"));
    }

    #[test]
    fn test_init_panic_is_captured() {
        let err = make_handle(2, StubPlugin::panicking_init("config exploded")).unwrap_err();
        assert!(matches!(err.kind, PluginErrorKind::InitFailed));
        assert!(err.message.contains("config exploded"));
    }

    #[test]
    fn test_run_publishes_through_channel() {
        let mut handle = make_handle(0, StubPlugin::publishing("ready")).unwrap();
        handle.run().unwrap();
        let update = handle.latest().unwrap();
        assert_eq!(update.unwrap().full_text, "ready");
    }

    #[test]
    fn test_run_twice_is_an_error() {
        let mut handle = make_handle(0, StubPlugin::named("stub")).unwrap();
        handle.run().unwrap();
        assert!(handle.run().is_err());
    }

    #[test]
    fn test_run_failure_latches_qualified_error() {
        let mut handle = make_handle(3, StubPlugin::failing_run("device vanished")).unwrap();
        handle.run().unwrap();
        let err = handle.latest().unwrap_err();
        assert_eq!(err.id, 3);
        assert_eq!(err.name, "stub");
        assert!(err.message.contains("device vanished"));
        assert!(err.to_string().contains("builtin:stub"));
    }

    #[test]
    fn test_run_panic_latches_error() {
        let mut handle = make_handle(0, StubPlugin::panicking_run("segfault-adjacent")).unwrap();
        handle.run().unwrap();
        let err = handle.latest().unwrap_err();
        assert!(err.message.contains("segfault-adjacent"));
    }

    #[test]
    fn test_click_event_reaches_plugin() {
        let handle = make_handle(0, StubPlugin::named("stub")).unwrap();
        handle.send_click_event(stub_click_event(0, 1));
        let update = handle.latest().unwrap();
        assert_eq!(update.unwrap().full_text, "clicks=1");
    }

    #[test]
    fn test_click_handler_failure_latches_error() {
        let handle = make_handle(0, StubPlugin::failing_clicks("click bug")).unwrap();
        handle.send_click_event(stub_click_event(0, 1));
        let err = handle.latest().unwrap_err();
        assert!(err.message.contains("click bug"));
    }

    #[test]
    fn test_teardown_wakes_sleeping_worker() {
        // The stub's run loop sleeps on a condvar until term() fires;
        // dropping the handle must come back instead of deadlocking.
        let mut handle = make_handle(0, StubPlugin::named("sleeper")).unwrap();
        handle.run().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        drop(handle);
    }

    #[test]
    fn test_teardown_without_run_is_clean() {
        let handle = make_handle(0, StubPlugin::named("stub")).unwrap();
        drop(handle);
    }
}
