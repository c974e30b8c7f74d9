use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::core::v1::PodSpec;
use kube::ResourceExt;
use telemetry_types::ClusterIdentity;
use telemetry_types::PodEvent;
use telemetry_types::PodInfo;
use telemetry_types::PodTransition;
use telemetry_types::Quantity;
use telemetry_types::Resource;
use telemetry_types::TelemetryMessage;
use telemetry_types::VolumeClaim;

use crate::fetch::NamespaceLabelLookup;
use crate::fetch::PvcLookup;
use crate::owner::OwnerResolver;
use crate::publisher::message_attributes;
use crate::publisher::EventPublisher;
use crate::quantity::resource_from_requirements;
use crate::watch::DeltaHandler;
use crate::watch::LastSeenTracker;
use crate::watch::Transition;
use crate::watch::WatcherKind;

/// Pod lifecycle watcher.
///
/// Emits `PodInfo` exactly once per UID, `PodEvent{Scheduled}` once the
/// `PodScheduled=True` condition appears, and `PodEvent{Terminated}` once a
/// deletion timestamp shows up. A single delivery may therefore emit 0, 1 or
/// 2 messages; re-delivery of unchanged state emits 0.
pub(crate) struct PodWatcher {
    identity: ClusterIdentity,
    publisher: Arc<dyn EventPublisher>,
    last_seen: Arc<LastSeenTracker>,
    owners: Arc<OwnerResolver>,
    namespaces: Arc<dyn NamespaceLabelLookup>,
    claims: Arc<dyn PvcLookup>,
}

impl PodWatcher {
    pub(crate) fn new(
        identity: ClusterIdentity,
        publisher: Arc<dyn EventPublisher>,
        last_seen: Arc<LastSeenTracker>,
        owners: Arc<OwnerResolver>,
        namespaces: Arc<dyn NamespaceLabelLookup>,
        claims: Arc<dyn PvcLookup>,
    ) -> Self {
        Self {
            identity,
            publisher,
            last_seen,
            owners,
            namespaces,
            claims,
        }
    }

    async fn observe(&self, pod: Pod, deleted: bool) {
        let Some(uid) = pod.uid() else {
            return;
        };
        let now = Utc::now();

        if self
            .last_seen
            .should_emit(WatcherKind::Pod, &uid, Transition::Info, now)
        {
            let info = self.compose_info(&pod, &uid).await;
            self.publisher.publish(
                TelemetryMessage::PodInfo(info),
                now,
                message_attributes(&self.identity, &uid),
            );
        }

        if let Some(scheduled_at) = scheduled_timestamp(&pod) {
            if self
                .last_seen
                .should_emit(WatcherKind::Pod, &uid, Transition::Scheduled, scheduled_at)
            {
                self.publish_event(&uid, PodTransition::Scheduled, scheduled_at);
            }
        }

        let deletion_timestamp = pod.metadata.deletion_timestamp.as_ref().map(|t| t.0);
        if deleted || deletion_timestamp.is_some() {
            let terminated_at = deletion_timestamp.unwrap_or(now);
            if self.last_seen.should_emit(
                WatcherKind::Pod,
                &uid,
                Transition::Terminated,
                terminated_at,
            ) {
                self.publish_event(&uid, PodTransition::Terminated, terminated_at);
            }
        }
    }

    fn publish_event(&self, uid: &str, transition: PodTransition, timestamp: DateTime<Utc>) {
        self.publisher.publish(
            TelemetryMessage::PodEvent(PodEvent {
                identity: self.identity.clone(),
                uid: uid.to_string(),
                transition,
                timestamp,
            }),
            timestamp,
            message_attributes(&self.identity, uid),
        );
    }

    async fn compose_info(&self, pod: &Pod, uid: &str) -> PodInfo {
        let namespace = pod.namespace().unwrap_or_default();
        let owner = self.owners.top_level_owner(pod).await;
        let namespace_labels = self.namespaces.labels(&namespace).await;

        let spec = pod.spec.as_ref();
        let containers = spec
            .map(|spec| {
                spec.containers
                    .iter()
                    .map(|container| {
                        (
                            container.name.clone(),
                            container
                                .resources
                                .as_ref()
                                .map(resource_from_requirements)
                                .unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        let total_resource = spec.map(total_resource).unwrap_or_default();
        let volumes = match spec {
            Some(spec) => self.volume_claims(&namespace, spec).await,
            None => Vec::new(),
        };

        PodInfo {
            identity: self.identity.clone(),
            uid: uid.to_string(),
            name: pod.name_any(),
            namespace,
            node_name: spec.and_then(|spec| spec.node_name.clone()),
            qos_class: pod
                .status
                .as_ref()
                .and_then(|status| status.qos_class.clone()),
            labels: pod.labels().clone(),
            namespace_labels,
            annotations: pod.annotations().clone(),
            owner,
            containers,
            total_resource,
            volumes,
            created_at: pod.creation_timestamp().map(|t| t.0),
        }
    }

    async fn volume_claims(&self, namespace: &str, spec: &PodSpec) -> Vec<VolumeClaim> {
        let Some(volumes) = &spec.volumes else {
            return Vec::new();
        };

        let mut claims = Vec::new();
        for volume in volumes {
            let Some(source) = &volume.persistent_volume_claim else {
                continue;
            };
            let info = self.claims.claim(namespace, &source.claim_name).await;
            claims.push(VolumeClaim {
                volume_name: volume.name.clone(),
                claim_name: source.claim_name.clone(),
                capacity_bytes: info.and_then(|info| info.capacity_bytes),
            });
        }
        claims
    }
}

#[async_trait]
impl DeltaHandler<Pod> for PodWatcher {
    async fn applied(&self, pod: Pod) {
        self.observe(pod, false).await;
    }

    async fn deleted(&self, pod: Pod) {
        self.observe(pod, true).await;
    }
}

fn scheduled_timestamp(pod: &Pod) -> Option<DateTime<Utc>> {
    let conditions = pod.status.as_ref()?.conditions.as_ref()?;
    let condition = conditions
        .iter()
        .find(|condition| condition.type_ == "PodScheduled" && condition.status == "True")?;
    Some(
        condition
            .last_transition_time
            .as_ref()
            .map(|t| t.0)
            .unwrap_or_else(Utc::now),
    )
}

/// Effective pod resource: per key, max(sum of regular containers, max of
/// init containers). Init containers run to completion before the regular
/// ones start, so the pod never needs both at once.
fn total_resource(spec: &PodSpec) -> Resource {
    let main: Vec<Resource> = spec
        .containers
        .iter()
        .filter_map(|container| container.resources.as_ref())
        .map(resource_from_requirements)
        .collect();
    let init: Vec<Resource> = spec
        .init_containers
        .iter()
        .flatten()
        .filter_map(|container| container.resources.as_ref())
        .map(resource_from_requirements)
        .collect();

    Resource {
        requests: combine(
            main.iter().map(|resource| &resource.requests),
            init.iter().map(|resource| &resource.requests),
        ),
        limits: combine(
            main.iter().map(|resource| &resource.limits),
            init.iter().map(|resource| &resource.limits),
        ),
    }
}

fn combine<'a>(
    main: impl Iterator<Item = &'a BTreeMap<String, Quantity>>,
    init: impl Iterator<Item = &'a BTreeMap<String, Quantity>>,
) -> BTreeMap<String, Quantity> {
    let mut totals: BTreeMap<String, Quantity> = BTreeMap::new();
    for map in main {
        for (key, quantity) in map {
            let entry = totals.entry(key.clone()).or_insert_with(|| Quantity {
                amount: 0,
                unit: quantity.unit.clone(),
            });
            entry.amount = entry.amount.saturating_add(quantity.amount);
        }
    }
    for map in init {
        for (key, quantity) in map {
            let entry = totals.entry(key.clone()).or_insert_with(|| Quantity {
                amount: 0,
                unit: quantity.unit.clone(),
            });
            entry.amount = entry.amount.max(quantity.amount);
        }
    }
    totals
}
