//! FFI-safe types for the barkeep plugin interface.
//!
//! This crate provides stable ABI types that can be safely passed across
//! dynamic library boundaries between the bar host and status plugins.

// Allow non-local definitions from abi_stable's sabi_trait macro.
// This is a known issue with the macro that generates impl blocks in a const.
// See: https://github.com/rust-lang/rust/issues/59629
#![allow(non_local_definitions)]

pub mod api;
pub mod config;
pub mod plugin;
pub mod types;
pub mod version;

pub use api::{PluginApi, PluginApi_TO};
pub use config::FfiConfigValue;
pub use plugin::{
    call_plugin_init, call_plugin_on_click_event, call_plugin_run, call_plugin_term, StatusPlugin,
    StatusPlugin_TO,
};
pub use types::{modifiers, FfiBlock, FfiBlockState, FfiClickEvent, FfiPluginInfo};
pub use version::{is_version_compatible, PluginModule, PluginModule_Ref, INTERFACE_VERSION};
