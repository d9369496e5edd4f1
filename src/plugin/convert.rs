//! Conversions between FFI types and host types at the plugin boundary.

use abi_stable::std_types::{RHashMap, RString, RVec};

use barkeep_plugin_interface::{modifiers, FfiBlock, FfiClickEvent, FfiConfigValue};

use crate::bar::click_listener::ClickEvent;
use crate::bar::protocol::BlockContent;

impl From<FfiBlock> for BlockContent {
    fn from(block: FfiBlock) -> Self {
        Self {
            full_text: block.full_text.into_string(),
            short_text: block.short_text.into_option().map(RString::into_string),
            state: block.state.into(),
            urgent: block.urgent,
        }
    }
}

/// Flatten a plugin's TOML config subtree into the FFI map.
///
/// Nested tables become dotted keys ("colors.low"). Arrays are passed
/// through when every element is a string and skipped with a warning
/// otherwise.
pub fn config_to_ffi(table: Option<&toml::Table>) -> RHashMap<RString, FfiConfigValue> {
    let mut map = RHashMap::new();
    if let Some(table) = table {
        flatten_into(&mut map, "", table);
    }
    map
}

fn flatten_into(map: &mut RHashMap<RString, FfiConfigValue>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            toml::Value::String(s) => {
                map.insert(key.into(), FfiConfigValue::String(s.as_str().into()));
            }
            toml::Value::Integer(i) => {
                map.insert(key.into(), FfiConfigValue::Integer(*i));
            }
            toml::Value::Float(f) => {
                map.insert(key.into(), FfiConfigValue::Float(*f));
            }
            toml::Value::Boolean(b) => {
                map.insert(key.into(), FfiConfigValue::Boolean(*b));
            }
            toml::Value::Datetime(dt) => {
                map.insert(key.into(), FfiConfigValue::String(dt.to_string().into()));
            }
            toml::Value::Array(items) => {
                let strings: Option<RVec<RString>> = items
                    .iter()
                    .map(|item| item.as_str().map(RString::from))
                    .collect();
                match strings {
                    Some(strings) => {
                        map.insert(key.into(), FfiConfigValue::StringArray(strings));
                    }
                    None => {
                        tracing::warn!(key = %key, "skipping config array with non-string elements");
                    }
                }
            }
            toml::Value::Table(nested) => flatten_into(map, &key, nested),
        }
    }
}

/// Convert a parsed click event for delivery to a plugin.
pub fn click_to_ffi(event: &ClickEvent, name: &str) -> FfiClickEvent {
    FfiClickEvent {
        name: name.into(),
        instance: event.instance as u32,
        button: event.button,
        modifiers: modifier_bits(&event.modifiers),
        x: event.x,
        y: event.y,
        relative_x: event.relative_x,
        relative_y: event.relative_y,
        output_x: event.output_x,
        output_y: event.output_y,
        width: event.width,
        height: event.height,
    }
}

fn modifier_bits(names: &[String]) -> u32 {
    names.iter().fold(0, |bits, name| {
        bits | match name.as_str() {
            "Shift" => modifiers::SHIFT,
            "Control" => modifiers::CONTROL,
            "Lock" => modifiers::LOCK,
            "Mod1" => modifiers::MOD1,
            "Mod2" => modifiers::MOD2,
            "Mod3" => modifiers::MOD3,
            "Mod4" => modifiers::MOD4,
            "Mod5" => modifiers::MOD5,
            other => {
                tracing::debug!(modifier = other, "ignoring unknown modifier");
                0
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(source: &str) -> toml::Table {
        toml::from_str(source).unwrap()
    }

    #[test]
    fn test_scalar_config_values() {
        let table = table(
            r#"
            format = "%H:%M"
            interval_ms = 500
            enabled = true
            scale = 1.5
            "#,
        );
        let map = config_to_ffi(Some(&table));
        assert_eq!(
            map.get("format"),
            Some(&FfiConfigValue::String("%H:%M".into()))
        );
        assert_eq!(map.get("interval_ms"), Some(&FfiConfigValue::Integer(500)));
        assert_eq!(map.get("enabled"), Some(&FfiConfigValue::Boolean(true)));
        assert_eq!(map.get("scale"), Some(&FfiConfigValue::Float(1.5)));
    }

    #[test]
    fn test_nested_tables_become_dotted_keys() {
        let table = table(
            r##"
            [colors]
            low = "#00ff00"

            [colors.alerts]
            high = "#ff0000"
            "##,
        );
        let map = config_to_ffi(Some(&table));
        assert_eq!(
            map.get("colors.low"),
            Some(&FfiConfigValue::String("#00ff00".into()))
        );
        assert_eq!(
            map.get("colors.alerts.high"),
            Some(&FfiConfigValue::String("#ff0000".into()))
        );
    }

    #[test]
    fn test_string_arrays_pass_mixed_arrays_skip() {
        let table = table(
            r#"
            mounts = ["/", "/home"]
            mixed = ["/", 3]
            "#,
        );
        let map = config_to_ffi(Some(&table));
        assert_eq!(
            map.get("mounts"),
            Some(&FfiConfigValue::StringArray(
                vec![RString::from("/"), RString::from("/home")].into()
            ))
        );
        assert_eq!(map.get("mixed"), None);
    }

    #[test]
    fn test_no_config_is_empty_map() {
        assert_eq!(config_to_ffi(None).len(), 0);
    }

    #[test]
    fn test_modifier_bits() {
        let names = vec![
            "Shift".to_string(),
            "Mod4".to_string(),
            "Hyper".to_string(),
        ];
        assert_eq!(modifier_bits(&names), modifiers::SHIFT | modifiers::MOD4);
        assert_eq!(modifier_bits(&[]), 0);
    }

    #[test]
    fn test_click_to_ffi_carries_geometry() {
        let event = ClickEvent {
            name: Some("cpu".to_string()),
            instance: 4,
            button: 3,
            modifiers: vec!["Control".to_string()],
            x: 1910,
            y: 12,
            relative_x: 10,
            relative_y: 12,
            output_x: 1910,
            output_y: 12,
            width: 80,
            height: 24,
        };
        let ffi = click_to_ffi(&event, "cpu");
        assert_eq!(ffi.name.as_str(), "cpu");
        assert_eq!(ffi.instance, 4);
        assert_eq!(ffi.button, 3);
        assert_eq!(ffi.modifiers, modifiers::CONTROL);
        assert_eq!(ffi.x, 1910);
        assert_eq!(ffi.width, 80);
    }
}
