use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use k8s_openapi::api::core::v1::Namespace;
use kube::Api;
use kube::Client;
use tracing::debug;
use tracing::warn;

/// Namespace label lookup used for pod enrichment.
#[async_trait]
pub trait NamespaceLabelLookup: Send + Sync {
    /// Labels of the namespace; empty when it cannot be resolved.
    async fn labels(&self, namespace: &str) -> BTreeMap<String, String>;
}

/// Read-through cache over namespace GETs.
pub struct NamespaceLabelCache {
    client: Client,
    cache: DashMap<String, BTreeMap<String, String>>,
}

impl NamespaceLabelCache {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl NamespaceLabelLookup for NamespaceLabelCache {
    async fn labels(&self, namespace: &str) -> BTreeMap<String, String> {
        if let Some(labels) = self.cache.get(namespace) {
            return labels.clone();
        }

        debug!(namespace, "namespace labels not in cache, fetching");
        let api: Api<Namespace> = Api::all(self.client.clone());
        let labels = match api.get_opt(namespace).await {
            Ok(Some(ns)) => ns.metadata.labels.unwrap_or_default(),
            Ok(None) => BTreeMap::new(),
            Err(error) => {
                warn!(namespace, %error, "namespace lookup failed");
                return BTreeMap::new();
            }
        };

        self.cache.insert(namespace.to_string(), labels.clone());
        labels
    }
}
