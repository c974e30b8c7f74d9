use async_trait::async_trait;
use dashmap::DashMap;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::Api;
use kube::Client;
use tracing::debug;
use tracing::warn;

use crate::quantity;

/// What pod enrichment needs to know about a bound claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimInfo {
    /// Requested storage in bytes (the `storage` resource request).
    pub capacity_bytes: Option<i64>,
    /// Name of the bound persistent volume, once bound.
    pub volume_name: Option<String>,
}

/// Persistent-volume-claim lookup used for pod volume enrichment.
#[async_trait]
pub trait PvcLookup: Send + Sync {
    async fn claim(&self, namespace: &str, name: &str) -> Option<ClaimInfo>;
}

/// Read-through cache over PVC GETs, keyed by (namespace, name).
pub struct PvcCache {
    client: Client,
    cache: DashMap<(String, String), ClaimInfo>,
}

impl PvcCache {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl PvcLookup for PvcCache {
    async fn claim(&self, namespace: &str, name: &str) -> Option<ClaimInfo> {
        let key = (namespace.to_string(), name.to_string());
        if let Some(info) = self.cache.get(&key) {
            return Some(info.clone());
        }

        debug!(namespace, name, "claim not in cache, fetching");
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let claim = match api.get_opt(name).await {
            Ok(Some(claim)) => claim,
            Ok(None) => return None,
            Err(error) => {
                warn!(namespace, name, %error, "claim lookup failed");
                return None;
            }
        };

        let capacity_bytes = claim
            .spec
            .as_ref()
            .and_then(|spec| spec.resources.as_ref())
            .and_then(|resources| resources.requests.as_ref())
            .and_then(|requests| requests.get("storage"))
            .map(quantity::memory_byte_quantity);
        let info = ClaimInfo {
            capacity_bytes,
            volume_name: claim.spec.and_then(|spec| spec.volume_name),
        };

        self.cache.insert(key, info.clone());
        Some(info)
    }
}
