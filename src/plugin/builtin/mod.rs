//! Built-in plugins, behind the same trait object as dynamically loaded
//! ones.
//!
//! The registry is a match over a closed set of names; past this point
//! the host cannot tell a built-in from a library plugin.

pub mod cycle;
pub mod datetime;

use abi_stable::sabi_trait::prelude::TD_Opaque;
use abi_stable::std_types::RBox;

use barkeep_plugin_interface::StatusPlugin_TO;

/// Names accepted by [`create`], for diagnostics.
pub const NAMES: &[&str] = &["cycle", "datetime"];

/// Instantiate a built-in plugin by name.
pub fn create(name: &str) -> Option<StatusPlugin_TO<'static, RBox<()>>> {
    match name {
        "cycle" => Some(StatusPlugin_TO::from_value(
            cycle::Cycle::new(),
            TD_Opaque,
        )),
        "datetime" => Some(StatusPlugin_TO::from_value(
            datetime::DateTime::new(),
            TD_Opaque,
        )),
        _ => None,
    }
}
