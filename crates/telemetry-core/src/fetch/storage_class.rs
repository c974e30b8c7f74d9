use async_trait::async_trait;
use dashmap::DashMap;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::Api;
use kube::Client;
use tracing::warn;

/// Storage type reported when the class cannot be resolved (absent class,
/// 403 on the GET).
pub const DEFAULT_STORAGE_TYPE: &str = "default";

/// Storage-class type lookup used for persistent-volume enrichment.
#[async_trait]
pub trait StorageClassLookup: Send + Sync {
    /// The class's `type` parameter, falling back to its provisioner, then
    /// to [`DEFAULT_STORAGE_TYPE`].
    async fn class_type(&self, name: &str) -> String;
}

/// Read-through cache over StorageClass GETs.
pub struct StorageClassTypeCache {
    client: Client,
    cache: DashMap<String, String>,
}

impl StorageClassTypeCache {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl StorageClassLookup for StorageClassTypeCache {
    async fn class_type(&self, name: &str) -> String {
        if let Some(class_type) = self.cache.get(name) {
            return class_type.clone();
        }

        let api: Api<StorageClass> = Api::all(self.client.clone());
        let class_type = match api.get_opt(name).await {
            Ok(Some(class)) => class
                .parameters
                .as_ref()
                .and_then(|parameters| parameters.get("type").cloned())
                .unwrap_or(class.provisioner),
            Ok(None) => DEFAULT_STORAGE_TYPE.to_string(),
            Err(error) => {
                warn!(name, %error, "storage class lookup failed");
                return DEFAULT_STORAGE_TYPE.to_string();
            }
        };

        self.cache.insert(name.to_string(), class_type.clone());
        class_type
    }
}
