//! Watch-session orchestration
//!
//! One session per cluster identity: created idempotently from a cluster
//! config, owning the watchers/fetchers/resolver/dedup state as a unit,
//! destroyed as a unit.

mod backend;
mod identity;
mod registry;

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

pub use backend::KubeSessionBackend;
pub use backend::SessionBackend;
pub use backend::SessionHandles;
pub use identity::resolve_cluster_identity;
pub use identity::watch_id;
pub use registry::WatchSessionRegistry;

/// Connection parameters for one logical watch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cloud_provider_id: String,
    pub cluster_id: String,
    pub cluster_name: String,
    /// Namespace to watch pods in; empty watches all namespaces.
    #[serde(default)]
    pub namespace: String,
    /// Explicit kubeconfig; `None` uses the in-cluster/default chain.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
}
