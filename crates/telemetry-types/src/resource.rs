use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// A resource amount in canonical units.
///
/// CPU is carried as nanocores (`unit == "n"`); memory, storage and plain
/// counts are carried as bytes/count (`unit == ""`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Quantity {
    pub amount: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
}

impl Quantity {
    /// Nanocore CPU quantity.
    pub fn nano(amount: i64) -> Self {
        Self {
            amount,
            unit: "n".to_string(),
        }
    }

    /// Byte (or unit-less count) quantity.
    pub fn bytes(amount: i64) -> Self {
        Self {
            amount,
            unit: String::new(),
        }
    }
}

/// Normalized requests/limits of a container or a whole pod, keyed by the
/// Kubernetes resource name ("cpu", "memory", "pods", "storage", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Resource {
    pub requests: BTreeMap<String, Quantity>,
    pub limits: BTreeMap<String, Quantity>,
}
