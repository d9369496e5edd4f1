//! Host-side implementation of the restricted plugin API.
//!
//! This is the only capability a plugin receives from the host: the
//! producer half of its own output channel. Everything else (identity,
//! theming, other plugins) stays out of reach.

use abi_stable::std_types::RString;

use barkeep_plugin_interface::{FfiBlock, PluginApi};

use crate::bar::protocol::BlockContent;
use crate::plugin::handle::BlockUpdate;
use crate::sync::rendezvous::Producer;

/// Producer-side capability handed to a plugin at init.
pub struct PluginApiImpl {
    producer: Producer<BlockUpdate, String>,
}

impl PluginApiImpl {
    pub fn new(producer: Producer<BlockUpdate, String>) -> Self {
        Self { producer }
    }
}

impl PluginApi for PluginApiImpl {
    fn put_block(&self, block: FfiBlock) -> bool {
        self.producer.put_value(Some(BlockContent::from(block)))
    }

    fn put_error(&self, message: RString) -> bool {
        self.producer.put_error(message.into_string())
    }

    fn hide(&self) -> bool {
        self.producer.put_value(None)
    }
}
