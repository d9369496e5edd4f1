//! Version protocol and plugin module definition.
//!
//! This module provides the RootModule-based entry point for dynamically
//! loaded plugins and version compatibility checking between plugins and
//! the bar host.

// abi_stable uses underscore naming convention for generated types
#![allow(non_camel_case_types)]

use abi_stable::{
    library::RootModule,
    package_version_strings,
    sabi_types::VersionStrings,
    std_types::{RBox, RString},
    StableAbi,
};
use semver::Version;

use crate::plugin::StatusPlugin_TO;

/// Current interface crate version.
///
/// Dylib plugins are compiled against some version of this crate; the
/// host checks theirs against this constant at load time.
pub const INTERFACE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin library module - loaded from .so/.dylib/.dll.
///
/// This struct is the entry point of a dynamically loaded plugin. The
/// host resolves it with `PluginModule_Ref::load_from()` and calls
/// `create_plugin()` to instantiate the plugin. Dropping the returned
/// trait object destroys the instance; the library itself is leaked by
/// abi_stable so plugin code outlives every instance.
///
/// # Example (for plugin implementors)
///
/// ```ignore
/// use barkeep_plugin_interface::{PluginModule, PluginModule_Ref, StatusPlugin_TO};
/// use abi_stable::{export_root_module, prefix_type::PrefixTypeTrait, std_types::RBox};
///
/// #[export_root_module]
/// fn get_library() -> PluginModule_Ref {
///     PluginModule {
///         min_interface_version,
///         create_plugin,
///     }.leak_into_prefix()
/// }
///
/// extern "C" fn min_interface_version() -> RString {
///     barkeep_plugin_interface::INTERFACE_VERSION.into()
/// }
///
/// extern "C" fn create_plugin() -> StatusPlugin_TO<'static, RBox<()>> {
///     StatusPlugin_TO::from_value(MyPlugin::new(), abi_stable::type_level::TD_Opaque)
/// }
/// ```
#[repr(C)]
#[derive(StableAbi)]
#[sabi(kind(Prefix(prefix_ref = PluginModule_Ref)))]
pub struct PluginModule {
    /// Minimum interface version the plugin requires of the host.
    pub min_interface_version: extern "C" fn() -> RString,
    /// Factory function creating one plugin instance.
    #[sabi(last_prefix_field)]
    pub create_plugin: extern "C" fn() -> StatusPlugin_TO<'static, RBox<()>>,
}

impl RootModule for PluginModule_Ref {
    abi_stable::declare_root_module_statics! {PluginModule_Ref}

    const BASE_NAME: &'static str = "barkeep_plugin";
    const NAME: &'static str = "barkeep plugin interface";
    const VERSION_STRINGS: VersionStrings = package_version_strings!();
}

/// Check whether a plugin's minimum interface version is compatible with
/// the host's.
///
/// Compatibility follows semver: the major versions must match and the
/// host must be at least as new as the plugin's declared minimum. A
/// plugin built against 0.1.0 works with host 0.1.5, but not with host
/// 0.0.9 (host older) or host 1.0.0 (different major).
///
/// # Example
///
/// ```
/// use barkeep_plugin_interface::is_version_compatible;
///
/// assert!(is_version_compatible("0.1.0", "0.1.0").unwrap());
/// assert!(is_version_compatible("0.1.0", "0.2.0").unwrap());
/// assert!(!is_version_compatible("0.2.0", "0.1.0").unwrap());
/// assert!(!is_version_compatible("1.0.0", "0.9.0").unwrap());
/// ```
pub fn is_version_compatible(plugin_min_version: &str, host_version: &str) -> Result<bool, String> {
    let plugin_min = Version::parse(plugin_min_version)
        .map_err(|e| format!("invalid plugin version '{}': {}", plugin_min_version, e))?;
    let host = Version::parse(host_version)
        .map_err(|e| format!("invalid host version '{}': {}", host_version, e))?;

    Ok(host.major == plugin_min.major && host >= plugin_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_version_compatible() {
        assert!(is_version_compatible("0.2.0", "0.2.0").unwrap());
    }

    #[test]
    fn test_newer_host_same_major_compatible() {
        assert!(is_version_compatible("0.1.0", "0.2.0").unwrap());
        assert!(is_version_compatible("0.2.0", "0.2.3").unwrap());
    }

    #[test]
    fn test_older_host_incompatible() {
        assert!(!is_version_compatible("0.2.0", "0.1.0").unwrap());
    }

    #[test]
    fn test_major_mismatch_incompatible() {
        assert!(!is_version_compatible("1.0.0", "0.9.0").unwrap());
        assert!(!is_version_compatible("0.2.0", "1.0.0").unwrap());
    }

    #[test]
    fn test_garbage_version_is_error() {
        assert!(is_version_compatible("not-a-version", "0.2.0").is_err());
        assert!(is_version_compatible("0.2.0", "").is_err());
    }

    #[test]
    fn test_interface_version_parses() {
        Version::parse(INTERFACE_VERSION).expect("INTERFACE_VERSION should be valid semver");
    }
}
