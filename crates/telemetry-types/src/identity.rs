use serde::Deserialize;
use serde::Serialize;

/// Stable correlation identity of one watched cluster.
///
/// Built once per watch session from the caller-supplied identifiers plus the
/// UID of the cluster's `kube-system` namespace, which survives node churn
/// and API server restarts and therefore fingerprints the cluster itself.
/// Attached to every emitted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    pub cluster_id: String,
    pub cluster_name: String,
    pub cloud_provider_id: String,
    pub kube_system_uid: String,
}
