//! The restricted host API handed to plugins at init time.
//!
//! A plugin only ever sees the producer half of its own output channel,
//! wrapped behind this trait object. It cannot read its own output back,
//! inject errors into other plugins, or reach any other host state.

use abi_stable::sabi_trait;
use abi_stable::std_types::RString;

use crate::types::FfiBlock;

/// Producer-side view of a plugin's output channel.
///
/// The `#[sabi_trait]` attribute generates `PluginApi_TO`, a type-erased
/// FFI-safe trait object the host passes to `init`. Plugins keep it for
/// the lifetime of their `run` loop and call it from any of their threads.
///
/// All three operations return `false` once the channel is latched to an
/// error state; a plugin seeing `false` should wind down its `run` loop.
#[sabi_trait]
pub trait PluginApi: Send + Sync {
    /// Publish a new block, replacing any unconsumed previous one.
    fn put_block(&self, block: FfiBlock) -> bool;

    /// Report an unrecoverable plugin failure.
    ///
    /// Latches the channel; no further output from this plugin will be
    /// accepted.
    fn put_error(&self, message: RString) -> bool;

    /// Remove this plugin's block from the bar until the next `put_block`.
    #[sabi(last_prefix_field)]
    fn hide(&self) -> bool;
}
