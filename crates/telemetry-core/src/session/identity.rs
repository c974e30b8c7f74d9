use error_stack::Report;
use k8s_openapi::api::core::v1::Namespace;
use kube::Api;
use kube::Client;
use sha2::Digest;
use sha2::Sha256;
use telemetry_types::ClusterIdentity;

use crate::error::TelemetryError;
use crate::session::ClusterConfig;

/// Deterministic watch id for a cluster config.
///
/// Hashes the normalized connection identity (cloud provider id, cluster id,
/// namespace) so re-issuing the same logical watch request maps to the same
/// session.
pub fn watch_id(config: &ClusterConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.cloud_provider_id.as_bytes());
    hasher.update(b"/");
    hasher.update(config.cluster_id.as_bytes());
    hasher.update(b"/");
    hasher.update(config.namespace.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolve the cluster's identity from its `kube-system` namespace UID.
///
/// # Errors
///
/// - [`TelemetryError::IdentityResolutionFailed`] if the namespace cannot be
///   read; session creation must fail loudly rather than register a session
///   with an unverified identity
pub async fn resolve_cluster_identity(
    client: &Client,
    config: &ClusterConfig,
) -> Result<ClusterIdentity, Report<TelemetryError>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let kube_system = api.get("kube-system").await.map_err(|error| {
        Report::new(TelemetryError::IdentityResolutionFailed {
            message: format!("failed to read kube-system namespace: {error}"),
        })
    })?;

    Ok(ClusterIdentity {
        cluster_id: config.cluster_id.clone(),
        cluster_name: config.cluster_name.clone(),
        cloud_provider_id: config.cloud_provider_id.clone(),
        kube_system_uid: kube_system.metadata.uid.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(namespace: &str) -> ClusterConfig {
        ClusterConfig {
            cloud_provider_id: "gcp-account".to_string(),
            cluster_id: "cluster-1".to_string(),
            cluster_name: "prod-east".to_string(),
            namespace: namespace.to_string(),
            kubeconfig: None,
        }
    }

    #[test]
    fn watch_id_is_deterministic() {
        assert_eq!(watch_id(&config("")), watch_id(&config("")));
    }

    #[test]
    fn watch_id_depends_on_identity_fields() {
        assert_ne!(watch_id(&config("")), watch_id(&config("shop")));

        let mut other_cluster = config("");
        other_cluster.cluster_id = "cluster-2".to_string();
        assert_ne!(watch_id(&config("")), watch_id(&other_cluster));
    }

    #[test]
    fn watch_id_ignores_non_identity_fields() {
        let mut renamed = config("");
        renamed.cluster_name = "renamed".to_string();
        assert_eq!(watch_id(&config("")), watch_id(&renamed));
    }
}
