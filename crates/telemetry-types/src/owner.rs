use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// The resolved top-level controller of a pod, or the pod itself when it has
/// no controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub uid: String,
    pub kind: String,
    pub name: String,
    pub replicas: i32,
    pub labels: BTreeMap<String, String>,
}

/// Minimal key needed to re-fetch an unknown-kind owner through the dynamic
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadReference {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

/// A workload resolved through the dynamic (CRD) path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub uid: String,
    pub kind: String,
    pub name: String,
    pub replicas: i32,
    pub labels: BTreeMap<String, String>,
}

impl Workload {
    /// Fully degraded workload carrying only the identity of the owner
    /// reference it was resolved from.
    pub fn from_reference(reference: &WorkloadReference) -> Self {
        Self {
            uid: reference.uid.clone(),
            kind: reference.kind.clone(),
            name: reference.name.clone(),
            replicas: 1,
            labels: BTreeMap::new(),
        }
    }
}

impl From<Workload> for Owner {
    fn from(workload: Workload) -> Self {
        Self {
            uid: workload.uid,
            kind: workload.kind,
            name: workload.name,
            replicas: workload.replicas,
            labels: workload.labels,
        }
    }
}
