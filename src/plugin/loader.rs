//! Plugin loader resolving plugin sources to trait objects.
//!
//! Native plugins (.so/.dylib/.dll) are loaded with abi_stable, which
//! verifies the interface layout and intentionally leaks the library so
//! plugin code outlives every instance. Built-in plugins come from a
//! closed registry and end up behind the exact same trait object, so the
//! rest of the host never knows how a plugin was loaded.

use abi_stable::{
    library::{LibraryError, LibraryPath, RootModule},
    std_types::RBox,
};
use std::fmt;
use std::path::PathBuf;

use barkeep_plugin_interface::{
    is_version_compatible, PluginModule_Ref, StatusPlugin_TO, INTERFACE_VERSION,
};

use crate::plugin::builtin;

/// Where a plugin comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// A native library on disk.
    Path(PathBuf),
    /// A compiled-in plugin, looked up by name.
    Builtin(String),
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSource::Path(path) => write!(f, "{}", path.display()),
            PluginSource::Builtin(name) => write!(f, "builtin:{}", name),
        }
    }
}

/// Kinds of plugin loading/startup errors.
#[derive(Debug, Clone)]
pub enum PluginErrorKind {
    /// Library file is missing, corrupted or cannot be opened.
    LibraryCorrupted,
    /// Required symbol is missing from the library.
    SymbolMissing,
    /// Plugin requires a different interface version than the host provides.
    VersionMismatch { required: String, actual: String },
    /// No built-in plugin with the requested name.
    UnknownBuiltin,
    /// `init` returned an error or panicked.
    InitFailed,
    /// `init` returned an empty or ill-formed display name.
    InvalidName,
    /// Other error (catch-all).
    Other(String),
}

/// Error when loading or initializing a plugin, fatal at startup.
///
/// Carries everything needed for a qualified diagnostic: the plugin's
/// dispatch id, its source descriptor, and the inner message.
#[derive(Debug, Clone)]
pub struct PluginLoadError {
    /// Dispatch id of the plugin that failed.
    pub id: usize,
    /// Rendered source descriptor (path or builtin name).
    pub source: String,
    /// Category of the error.
    pub kind: PluginErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl PluginLoadError {
    pub fn new(
        id: usize,
        source: &PluginSource,
        kind: PluginErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source: source.to_string(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PluginLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin {} ({}): {}", self.id, self.source, self.message)
    }
}

impl std::error::Error for PluginLoadError {}

/// Resolve a plugin source to a loaded plugin instance.
pub fn load(
    id: usize,
    source: &PluginSource,
) -> Result<StatusPlugin_TO<'static, RBox<()>>, PluginLoadError> {
    match source {
        PluginSource::Path(path) => load_dylib(id, source, path),
        PluginSource::Builtin(name) => builtin::create(name).ok_or_else(|| {
            PluginLoadError::new(
                id,
                source,
                PluginErrorKind::UnknownBuiltin,
                format!(
                    "no built-in plugin named '{}' (available: {})",
                    name,
                    builtin::NAMES.join(", ")
                ),
            )
        }),
    }
}

/// Load a native plugin library and instantiate its plugin.
///
/// The library is leaked (never unloaded); abi_stable guarantees layout
/// compatibility, and the module's declared minimum interface version is
/// checked against the host's on top of that.
fn load_dylib(
    id: usize,
    source: &PluginSource,
    path: &std::path::Path,
) -> Result<StatusPlugin_TO<'static, RBox<()>>, PluginLoadError> {
    let module = PluginModule_Ref::load_from(LibraryPath::FullPath(path))
        .map_err(|lib_err| map_library_error(id, source, &lib_err))?;

    let plugin_min = module.min_interface_version()().into_string();
    match is_version_compatible(&plugin_min, INTERFACE_VERSION) {
        Ok(true) => {}
        Ok(false) => {
            return Err(PluginLoadError::new(
                id,
                source,
                PluginErrorKind::VersionMismatch {
                    required: plugin_min.clone(),
                    actual: INTERFACE_VERSION.to_string(),
                },
                format!(
                    "plugin requires interface {}+, host provides {}",
                    plugin_min, INTERFACE_VERSION
                ),
            ));
        }
        Err(e) => {
            return Err(PluginLoadError::new(
                id,
                source,
                PluginErrorKind::Other(e.clone()),
                format!("interface version check failed: {}", e),
            ));
        }
    }

    tracing::debug!(path = %path.display(), "loaded plugin library");
    Ok((module.create_plugin())())
}

/// Map an abi_stable LibraryError to our PluginLoadError.
fn map_library_error(id: usize, source: &PluginSource, lib_err: &LibraryError) -> PluginLoadError {
    let detail = format!("{:?}", lib_err);

    match lib_err {
        LibraryError::OpenError { .. } => PluginLoadError::new(
            id,
            source,
            PluginErrorKind::LibraryCorrupted,
            format!("failed to open library: {}", detail),
        ),
        LibraryError::GetSymbolError { .. } => PluginLoadError::new(
            id,
            source,
            PluginErrorKind::SymbolMissing,
            format!("missing required symbol: {}", detail),
        ),
        LibraryError::IncompatibleVersionNumber {
            expected_version,
            actual_version,
            ..
        } => PluginLoadError::new(
            id,
            source,
            PluginErrorKind::VersionMismatch {
                required: expected_version.to_string(),
                actual: actual_version.to_string(),
            },
            format!(
                "library built against interface {}, host provides {}",
                expected_version, actual_version
            ),
        ),
        _ => PluginLoadError::new(
            id,
            source,
            PluginErrorKind::Other(detail.clone()),
            format!("failed to load library: {}", detail),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_display() {
        let path = PluginSource::Path(PathBuf::from("/usr/lib/barkeep/net.so"));
        assert_eq!(path.to_string(), "/usr/lib/barkeep/net.so");
        let builtin = PluginSource::Builtin("datetime".to_string());
        assert_eq!(builtin.to_string(), "builtin:datetime");
    }

    #[test]
    fn test_unknown_builtin_rejected() {
        let source = PluginSource::Builtin("nonexistent".to_string());
        let err = load(0, &source).unwrap_err();
        assert!(matches!(err.kind, PluginErrorKind::UnknownBuiltin));
        assert!(err.message.contains("nonexistent"));
    }

    #[test]
    fn test_known_builtin_loads() {
        let source = PluginSource::Builtin("datetime".to_string());
        assert!(load(0, &source).is_ok());
    }

    #[test]
    fn test_load_error_display_is_qualified() {
        let source = PluginSource::Path(PathBuf::from("/tmp/broken.so"));
        let err = PluginLoadError::new(
            3,
            &source,
            PluginErrorKind::LibraryCorrupted,
            "failed to open library",
        );
        let rendered = err.to_string();
        assert!(rendered.contains('3'));
        assert!(rendered.contains("/tmp/broken.so"));
        assert!(rendered.contains("failed to open library"));
    }

    #[test]
    fn test_missing_library_fails_to_open() {
        let source = PluginSource::Path(PathBuf::from("/nonexistent/plugin.so"));
        let err = load(7, &source).unwrap_err();
        assert!(matches!(
            err.kind,
            PluginErrorKind::LibraryCorrupted | PluginErrorKind::Other(_)
        ));
        assert_eq!(err.id, 7);
    }
}
