//! FFI-safe configuration values for plugin configuration.
//!
//! The host parses each plugin's config subtree from the bar config file
//! and passes it to `init` as a map of typed values. Nested tables are
//! flattened into dotted keys by the host ("colors.low" etc.), keeping
//! the value enum non-recursive and trivially FFI-safe.

use abi_stable::std_types::{RString, RVec};
use abi_stable::StableAbi;

/// FFI-safe config value.
#[repr(C)]
#[derive(StableAbi, Clone, Debug, PartialEq)]
pub enum FfiConfigValue {
    /// A string value
    String(RString),
    /// A 64-bit signed integer
    Integer(i64),
    /// A 64-bit float
    Float(f64),
    /// A boolean value
    Boolean(bool),
    /// An array of strings
    StringArray(RVec<RString>),
}

impl FfiConfigValue {
    /// Borrow the string payload, if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FfiConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Return the integer payload, if this is an `Integer` value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FfiConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Return the boolean payload, if this is a `Boolean` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FfiConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        let v = FfiConfigValue::String("fmt".into());
        assert_eq!(v.as_str(), Some("fmt"));
        assert_eq!(FfiConfigValue::Integer(3).as_str(), None);
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(FfiConfigValue::Integer(42).as_integer(), Some(42));
        assert_eq!(FfiConfigValue::Boolean(true).as_integer(), None);
    }

    #[test]
    fn test_as_bool() {
        assert_eq!(FfiConfigValue::Boolean(false).as_bool(), Some(false));
        assert_eq!(FfiConfigValue::String("no".into()).as_bool(), None);
    }
}
