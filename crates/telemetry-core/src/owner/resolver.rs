use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Client;
use kube::ResourceExt;
use telemetry_types::Owner;
use telemetry_types::WorkloadReference;

use crate::fetch::deployment_store;
use crate::fetch::replica_set_store;
use crate::fetch::ControllerInfo;
use crate::fetch::ControllerStore;
use crate::owner::WorkloadResolver;

/// Real ownership chains are shallow (ReplicaSet -> Deployment); the cap
/// guards against reference graphs that are deeper or cyclic.
const MAX_OWNER_HOPS: usize = 3;

/// Resolves a pod to its top-level controller.
///
/// Kind dispatch is a registry: statically known controller kinds map to
/// [`ControllerStore`]s, anything else routes to the dynamic resolver.
pub struct OwnerResolver {
    stores: HashMap<String, Arc<dyn ControllerStore>>,
    dynamic: Arc<dyn WorkloadResolver>,
}

impl OwnerResolver {
    pub fn new(
        stores: HashMap<String, Arc<dyn ControllerStore>>,
        dynamic: Arc<dyn WorkloadResolver>,
    ) -> Self {
        Self { stores, dynamic }
    }

    /// Resolver with the standard store registry (ReplicaSet, Deployment).
    pub fn with_default_stores(client: Client, dynamic: Arc<dyn WorkloadResolver>) -> Self {
        let stores = HashMap::from([
            (
                "ReplicaSet".to_string(),
                replica_set_store(client.clone()),
            ),
            ("Deployment".to_string(), deployment_store(client)),
        ]);
        Self::new(stores, dynamic)
    }

    /// The top-level owner of the pod, or the pod itself when nothing
    /// controls it. Always terminates with some owner.
    pub async fn top_level_owner(&self, pod: &Pod) -> Owner {
        let controller = pod
            .owner_references()
            .iter()
            .find(|reference| reference.controller == Some(true));

        let Some(reference) = controller else {
            return Owner {
                uid: pod.uid().unwrap_or_default(),
                kind: "Pod".to_string(),
                name: pod.name_any(),
                replicas: 1,
                labels: pod.labels().clone(),
            };
        };

        let namespace = pod.namespace().unwrap_or_default();
        self.resolve(&namespace, reference.clone()).await
    }

    async fn resolve(&self, namespace: &str, mut reference: OwnerReference) -> Owner {
        let mut hops = 0;
        loop {
            let Some(store) = self.stores.get(&reference.kind) else {
                let workload = self
                    .dynamic
                    .workload(&WorkloadReference {
                        api_version: reference.api_version.clone(),
                        kind: reference.kind.clone(),
                        namespace: namespace.to_string(),
                        name: reference.name.clone(),
                        uid: reference.uid.clone(),
                    })
                    .await;
                return workload.into();
            };

            let Some(info) = store.get_by_key(namespace, &reference.name).await else {
                // Store miss: the reference's own identity is the best we have.
                return owner_from_reference(&reference);
            };

            match info.controller_owner.clone() {
                Some(next) if hops < MAX_OWNER_HOPS => {
                    hops += 1;
                    reference = next;
                }
                // Top of the chain, or depth exceeded: the last resolved
                // controller wins.
                _ => return owner_from_controller(info),
            }
        }
    }
}

fn owner_from_controller(info: ControllerInfo) -> Owner {
    Owner {
        uid: info.uid,
        kind: info.kind,
        name: info.name,
        replicas: info.replicas.unwrap_or(1),
        labels: info.labels,
    }
}

fn owner_from_reference(reference: &OwnerReference) -> Owner {
    Owner {
        uid: reference.uid.clone(),
        kind: reference.kind.clone(),
        name: reference.name.clone(),
        replicas: 1,
        labels: BTreeMap::new(),
    }
}
