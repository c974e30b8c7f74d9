use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::DynamicObject;
use kube::api::ListParams;
use kube::core::ApiResource;
use kube::core::GroupVersionKind;
use kube::Api;
use kube::Client;
use kube::ResourceExt;
use telemetry_types::Workload;
use telemetry_types::WorkloadReference;
use tracing::debug;
use tracing::warn;

/// Resolves an unknown-kind owner reference to a workload.
#[async_trait]
pub trait WorkloadResolver: Send + Sync {
    /// Must always terminate with some workload; degraded results carry the
    /// reference identity with empty labels and replicas = 1.
    async fn workload(&self, reference: &WorkloadReference) -> Workload;
}

/// Workload resolution through CRD discovery and a dynamic object GET.
///
/// The only component making speculative, permission-sensitive API calls:
/// one CRD list, then one GET, each tier falling through on failure. A 403
/// on the CRD list falls back to naive pluralization of the kind; a failed
/// GET falls back to the reference's own identity.
pub struct CrdWorkloadResolver {
    client: Client,
}

impl CrdWorkloadResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Plural resource name from the CRD whose kind matches, if listable.
    async fn crd_plural(&self, group: &str, kind: &str) -> Option<String> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        match api.list(&ListParams::default()).await {
            Ok(list) => list
                .items
                .into_iter()
                .find(|crd| crd.spec.group == group && crd.spec.names.kind == kind)
                .map(|crd| crd.spec.names.plural),
            Err(error) => {
                // Typically a 403; assume the plural instead of retrying.
                warn!(group, kind, %error, "CRD list failed, assuming plural name");
                None
            }
        }
    }
}

#[async_trait]
impl WorkloadResolver for CrdWorkloadResolver {
    async fn workload(&self, reference: &WorkloadReference) -> Workload {
        let (group, version) = group_version(&reference.api_version);
        let plural = self
            .crd_plural(group, &reference.kind)
            .await
            .unwrap_or_else(|| naive_plural(&reference.kind));

        let gvk = GroupVersionKind::gvk(group, version, &reference.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, &plural);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &reference.namespace, &resource);

        match api.get_opt(&reference.name).await {
            Ok(Some(object)) => {
                let uid = object.uid().unwrap_or_else(|| reference.uid.clone());
                // Labels are only trustworthy if this is the same object the
                // owner reference pointed at.
                let labels = if uid == reference.uid {
                    object.labels().clone()
                } else {
                    BTreeMap::new()
                };
                let replicas = object
                    .data
                    .pointer("/spec/replicas")
                    .and_then(serde_json::Value::as_i64)
                    .and_then(|replicas| i32::try_from(replicas).ok())
                    .unwrap_or(1);
                Workload {
                    uid,
                    kind: reference.kind.clone(),
                    name: reference.name.clone(),
                    replicas,
                    labels,
                }
            }
            Ok(None) => {
                debug!(
                    kind = %reference.kind,
                    name = %reference.name,
                    "dynamic workload not found, using reference identity"
                );
                Workload::from_reference(reference)
            }
            Err(error) => {
                warn!(
                    kind = %reference.kind,
                    name = %reference.name,
                    %error,
                    "dynamic workload fetch failed, using reference identity"
                );
                Workload::from_reference(reference)
            }
        }
    }
}

/// Split "group/version"; bare versions belong to the core group.
fn group_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Assumed plural resource name when the CRD cannot be consulted:
/// lower-cased, trailing "y" -> "ies", else append "s".
fn naive_plural(kind: &str) -> String {
    let lower = kind.to_lowercase();
    match lower.strip_suffix('y') {
        Some(stem) => format!("{stem}ies"),
        None => format!("{lower}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_plural_rules() {
        assert_eq!(naive_plural("Rollout"), "rollouts");
        assert_eq!(naive_plural("TaskQueue"), "taskqueues");
        assert_eq!(naive_plural("Canary"), "canaries");
        assert_eq!(naive_plural("StatefulSet"), "statefulsets");
    }

    #[test]
    fn group_version_split() {
        assert_eq!(group_version("argoproj.io/v1alpha1"), ("argoproj.io", "v1alpha1"));
        assert_eq!(group_version("v1"), ("", "v1"));
    }

    #[test]
    fn degraded_workload_keeps_reference_identity() {
        let reference = WorkloadReference {
            api_version: "argoproj.io/v1alpha1".to_string(),
            kind: "Rollout".to_string(),
            namespace: "shop".to_string(),
            name: "checkout".to_string(),
            uid: "uid-7".to_string(),
        };

        let workload = Workload::from_reference(&reference);

        assert_eq!(workload.uid, "uid-7");
        assert_eq!(workload.name, "checkout");
        assert_eq!(workload.replicas, 1);
        assert!(workload.labels.is_empty());
    }
}
