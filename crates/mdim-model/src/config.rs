//! Free-form configuration fragments.
//!
//! View configs, display settings and common override rules are nested
//! key/value trees. They are kept as a closed value type rather than raw
//! `serde_json::Value` so that merge code can tell a scalar leaf apart from a
//! mapping it has to recurse into.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;

/// A nested mapping fragment. Keys are sorted, which keeps merges and exports
/// deterministic.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

impl ConfigValue {
    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, ConfigValue::Map(_))
    }

    /// Everything that is not a mapping counts as a leaf: lists are replaced
    /// wholesale on merge, never concatenated.
    pub fn is_leaf(&self) -> bool {
        !self.is_map()
    }

    /// Whether the value carries no information (null, empty string/list/map).
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValue::Null => true,
            ConfigValue::String(s) => s.is_empty(),
            ConfigValue::List(l) => l.is_empty(),
            ConfigValue::Map(m) => m.is_empty(),
            ConfigValue::Bool(_) | ConfigValue::Number(_) => false,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "null"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Number(n) => write!(f, "{n}"),
            ConfigValue::String(s) => write!(f, "{s:?}"),
            ConfigValue::List(_) | ConfigValue::Map(_) => {
                let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Number(value.into())
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(ConfigValue::Number)
            .unwrap_or(ConfigValue::Null)
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(value: ConfigMap) -> Self {
        ConfigValue::Map(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(value: Vec<T>) -> Self {
        ConfigValue::List(value.into_iter().map(Into::into).collect())
    }
}

/// Deep-merge `overlay` into `base`: mappings merge key by key, anything else
/// at the same path is replaced by the overlay value.
pub fn merge_override(base: &mut ConfigMap, overlay: &ConfigMap) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(ConfigValue::Map(existing)), ConfigValue::Map(incoming)) => {
                merge_override(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Build a [`ConfigMap`] from `key => value` pairs.
#[macro_export]
macro_rules! config_map {
    () => { $crate::ConfigMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::ConfigMap::new();
        $( map.insert(($key).to_string(), $crate::ConfigValue::from($value)); )+
        map
    }};
}
