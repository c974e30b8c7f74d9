use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::NamespaceResourceScope;
use kube::Api;
use kube::Client;
use kube::Resource;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::warn;

/// What ownership resolution needs to know about a controller object.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInfo {
    pub uid: String,
    pub kind: String,
    pub name: String,
    pub replicas: Option<i32>,
    pub labels: BTreeMap<String, String>,
    /// The controller's own `controller=true` owner reference, if any
    /// (e.g. a ReplicaSet pointing at its Deployment).
    pub controller_owner: Option<OwnerReference>,
}

/// Keyed controller lookup, `namespace/name` -> controller.
#[async_trait]
pub trait ControllerStore: Send + Sync {
    async fn get_by_key(&self, namespace: &str, name: &str) -> Option<ControllerInfo>;
}

/// Controller types a store can be built for.
pub trait HasReplicas {
    fn replicas(&self) -> Option<i32>;
}

impl HasReplicas for ReplicaSet {
    fn replicas(&self) -> Option<i32> {
        self.spec.as_ref().and_then(|spec| spec.replicas)
    }
}

impl HasReplicas for Deployment {
    fn replicas(&self) -> Option<i32> {
        self.spec.as_ref().and_then(|spec| spec.replicas)
    }
}

/// Read-through controller store backed by API GETs, generic over the
/// controller type.
pub struct ApiControllerStore<K> {
    client: Client,
    cache: DashMap<(String, String), ControllerInfo>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> ApiControllerStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: DashMap::new(),
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K> ControllerStore for ApiControllerStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + HasReplicas
        + Clone
        + std::fmt::Debug
        + DeserializeOwned
        + Send
        + Sync,
{
    async fn get_by_key(&self, namespace: &str, name: &str) -> Option<ControllerInfo> {
        let key = (namespace.to_string(), name.to_string());
        if let Some(info) = self.cache.get(&key) {
            return Some(info.clone());
        }

        let kind = K::kind(&()).to_string();
        debug!(%kind, namespace, name, "controller not in store, fetching");
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let object = match api.get_opt(name).await {
            Ok(Some(object)) => object,
            Ok(None) => return None,
            Err(error) => {
                warn!(%kind, namespace, name, %error, "controller lookup failed");
                return None;
            }
        };

        let info = ControllerInfo {
            uid: object.uid().unwrap_or_default(),
            kind,
            name: name.to_string(),
            replicas: object.replicas(),
            labels: object.labels().clone(),
            controller_owner: object
                .owner_references()
                .iter()
                .find(|reference| reference.controller == Some(true))
                .cloned(),
        };

        self.cache.insert(key, info.clone());
        Some(info)
    }
}

pub fn replica_set_store(client: Client) -> Arc<dyn ControllerStore> {
    Arc::new(ApiControllerStore::<ReplicaSet>::new(client))
}

pub fn deployment_store(client: Client) -> Arc<dyn ControllerStore> {
    Arc::new(ApiControllerStore::<Deployment>::new(client))
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    // ControllerInfo must stay comparable with the owner reference present;
    // OwnerReference only offers PartialEq.
    #[test]
    fn controller_info_compares_with_owner_reference() {
        let info = ControllerInfo {
            uid: "rs-uid".to_string(),
            kind: "ReplicaSet".to_string(),
            name: "web-abc".to_string(),
            replicas: Some(3),
            labels: BTreeMap::new(),
            controller_owner: Some(OwnerReference {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
                name: "web".to_string(),
                uid: "deploy-uid".to_string(),
                controller: Some(true),
                ..Default::default()
            }),
        };

        assert_eq!(info.clone(), info);
    }
}
