use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;
use k8s_openapi::api::core::v1::PersistentVolume;
use k8s_openapi::api::core::v1::PersistentVolumeSpec;
use kube::ResourceExt;
use telemetry_types::ClusterIdentity;
use telemetry_types::PvEvent;
use telemetry_types::PvInfo;
use telemetry_types::PvTransition;
use telemetry_types::TelemetryMessage;

use crate::fetch::StorageClassLookup;
use crate::fetch::DEFAULT_STORAGE_TYPE;
use crate::publisher::message_attributes;
use crate::publisher::EventPublisher;
use crate::quantity;
use crate::watch::DeltaHandler;
use crate::watch::LastSeenTracker;
use crate::watch::Transition;
use crate::watch::WatcherKind;

/// Persistent-volume lifecycle watcher.
///
/// First sight of a UID emits `PvInfo`; later deliveries with a strictly
/// larger capacity emit `PvEvent{Expansion}` (capacity comparison, not
/// last-seen, so repeated real expansions each emit while resyncs do not);
/// deletion emits `PvEvent{Stop}` once. A shrunk capacity only updates the
/// marker.
pub(crate) struct PvWatcher {
    identity: ClusterIdentity,
    publisher: Arc<dyn EventPublisher>,
    last_seen: Arc<LastSeenTracker>,
    storage_classes: Arc<dyn StorageClassLookup>,
    /// Last observed capacity in bytes per PV UID.
    capacities: DashMap<String, i64>,
}

impl PvWatcher {
    pub(crate) fn new(
        identity: ClusterIdentity,
        publisher: Arc<dyn EventPublisher>,
        last_seen: Arc<LastSeenTracker>,
        storage_classes: Arc<dyn StorageClassLookup>,
    ) -> Self {
        Self {
            identity,
            publisher,
            last_seen,
            storage_classes,
            capacities: DashMap::new(),
        }
    }

    async fn observe(&self, volume: PersistentVolume, deleted: bool) {
        let Some(uid) = volume.uid() else {
            return;
        };
        let now = Utc::now();

        if deleted {
            let stopped_at = volume
                .metadata
                .deletion_timestamp
                .as_ref()
                .map(|t| t.0)
                .unwrap_or(now);
            if self.last_seen.should_emit(
                WatcherKind::PersistentVolume,
                &uid,
                Transition::Stop,
                stopped_at,
            ) {
                self.publish_event(&uid, PvTransition::Stop, stopped_at, None);
            }
            return;
        }

        let capacity_bytes = capacity_bytes(volume.spec.as_ref());

        if self.last_seen.should_emit(
            WatcherKind::PersistentVolume,
            &uid,
            Transition::Info,
            now,
        ) {
            let info = self.compose_info(&volume, &uid, capacity_bytes).await;
            self.capacities.insert(uid.clone(), capacity_bytes);
            self.publisher.publish(
                TelemetryMessage::PvInfo(info),
                now,
                message_attributes(&self.identity, &uid),
            );
            return;
        }

        let previous = self.capacities.get(&uid).map(|entry| *entry);
        match previous {
            Some(previous) if capacity_bytes > previous => {
                self.capacities.insert(uid.clone(), capacity_bytes);
                self.publish_event(&uid, PvTransition::Expansion, now, Some(capacity_bytes));
            }
            _ => {
                // Unchanged or shrunk: track the value, emit nothing.
                self.capacities.insert(uid.clone(), capacity_bytes);
            }
        }
    }

    async fn compose_info(
        &self,
        volume: &PersistentVolume,
        uid: &str,
        capacity_bytes: i64,
    ) -> PvInfo {
        let spec = volume.spec.as_ref();
        let claim = spec.and_then(|spec| spec.claim_ref.as_ref());
        let storage_class_type = match spec.and_then(|spec| spec.storage_class_name.as_ref()) {
            Some(class_name) => self.storage_classes.class_type(class_name).await,
            None => DEFAULT_STORAGE_TYPE.to_string(),
        };

        PvInfo {
            identity: self.identity.clone(),
            uid: uid.to_string(),
            name: volume.name_any(),
            claim_namespace: claim.and_then(|claim| claim.namespace.clone()),
            claim_name: claim.and_then(|claim| claim.name.clone()),
            pv_type: spec.map(volume_source_type).unwrap_or("Unknown").to_string(),
            storage_class_type,
            capacity_bytes,
            created_at: volume.creation_timestamp().map(|t| t.0),
        }
    }

    fn publish_event(
        &self,
        uid: &str,
        transition: PvTransition,
        timestamp: DateTime<Utc>,
        capacity_bytes: Option<i64>,
    ) {
        self.publisher.publish(
            TelemetryMessage::PvEvent(PvEvent {
                identity: self.identity.clone(),
                uid: uid.to_string(),
                transition,
                timestamp,
                capacity_bytes,
            }),
            timestamp,
            message_attributes(&self.identity, uid),
        );
    }
}

#[async_trait]
impl DeltaHandler<PersistentVolume> for PvWatcher {
    async fn applied(&self, volume: PersistentVolume) {
        self.observe(volume, false).await;
    }

    async fn deleted(&self, volume: PersistentVolume) {
        self.observe(volume, true).await;
    }
}

fn capacity_bytes(spec: Option<&PersistentVolumeSpec>) -> i64 {
    spec.and_then(|spec| spec.capacity.as_ref())
        .and_then(|capacity| capacity.get("storage"))
        .map(quantity::memory_byte_quantity)
        .unwrap_or(0)
}

/// Volume backend, derived from which volume-source field is populated.
fn volume_source_type(spec: &PersistentVolumeSpec) -> &'static str {
    if spec.gce_persistent_disk.is_some() {
        "GcePersistentDisk"
    } else if spec.aws_elastic_block_store.is_some() {
        "AwsElasticBlockStore"
    } else if spec.azure_disk.is_some() {
        "AzureDisk"
    } else if spec.azure_file.is_some() {
        "AzureFile"
    } else if spec.csi.is_some() {
        "Csi"
    } else if spec.nfs.is_some() {
        "Nfs"
    } else if spec.host_path.is_some() {
        "HostPath"
    } else if spec.local.is_some() {
        "Local"
    } else {
        "Unknown"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::GCEPersistentDiskVolumeSource;
    use k8s_openapi::api::core::v1::ObjectReference;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity as RawQuantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    use super::*;
    use crate::publisher::testing::RecordingPublisher;

    struct FixedType;

    #[async_trait]
    impl StorageClassLookup for FixedType {
        async fn class_type(&self, _name: &str) -> String {
            "pd-ssd".to_string()
        }
    }

    fn watcher_with_publisher() -> (PvWatcher, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let identity = ClusterIdentity {
            cluster_id: "cluster-1".to_string(),
            cluster_name: "prod-east".to_string(),
            cloud_provider_id: "gcp-account".to_string(),
            kube_system_uid: "ks-uid".to_string(),
        };
        let watcher = PvWatcher::new(
            identity,
            publisher.clone(),
            Arc::new(LastSeenTracker::new()),
            Arc::new(FixedType),
        );
        (watcher, publisher)
    }

    fn volume(capacity: &str) -> PersistentVolume {
        PersistentVolume {
            metadata: ObjectMeta {
                name: Some("pv-1".to_string()),
                uid: Some("pv-uid".to_string()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeSpec {
                capacity: Some(BTreeMap::from([(
                    "storage".to_string(),
                    RawQuantity(capacity.to_string()),
                )])),
                claim_ref: Some(ObjectReference {
                    namespace: Some("shop".to_string()),
                    name: Some("data-claim".to_string()),
                    ..Default::default()
                }),
                storage_class_name: Some("ssd".to_string()),
                gce_persistent_disk: Some(GCEPersistentDiskVolumeSource {
                    pd_name: "disk-1".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            status: None,
        }
    }

    #[tokio::test]
    async fn expansion_emits_one_event_and_no_second_info() {
        let (watcher, publisher) = watcher_with_publisher();

        watcher.observe(volume("9Ki"), false).await;
        watcher.observe(volume("10Ki"), false).await;

        let messages = publisher.messages();
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            TelemetryMessage::PvInfo(info) => {
                assert_eq!(info.capacity_bytes, 9 * 1024);
                assert_eq!(info.claim_namespace.as_deref(), Some("shop"));
                assert_eq!(info.claim_name.as_deref(), Some("data-claim"));
                assert_eq!(info.pv_type, "GcePersistentDisk");
                assert_eq!(info.storage_class_type, "pd-ssd");
            }
            other => panic!("expected PvInfo, got {other:?}"),
        }
        match &messages[1] {
            TelemetryMessage::PvEvent(event) => {
                assert_eq!(event.transition, PvTransition::Expansion);
                assert_eq!(event.capacity_bytes, Some(10 * 1024));
            }
            other => panic!("expected Expansion event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unchanged_and_shrunk_capacity_emit_nothing() {
        let (watcher, publisher) = watcher_with_publisher();

        watcher.observe(volume("10Ki"), false).await;
        watcher.observe(volume("10Ki"), false).await;
        watcher.observe(volume("9Ki"), false).await;

        assert_eq!(publisher.count(), 1); // PvInfo only
    }

    #[tokio::test]
    async fn regrowth_past_a_shrunk_marker_emits_again() {
        let (watcher, publisher) = watcher_with_publisher();

        watcher.observe(volume("10Ki"), false).await;
        watcher.observe(volume("9Ki"), false).await;
        watcher.observe(volume("12Ki"), false).await;

        let messages = publisher.messages();
        assert_eq!(messages.len(), 2);
        match &messages[1] {
            TelemetryMessage::PvEvent(event) => {
                assert_eq!(event.transition, PvTransition::Expansion);
                assert_eq!(event.capacity_bytes, Some(12 * 1024));
            }
            other => panic!("expected Expansion event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_emits_stop_once() {
        let (watcher, publisher) = watcher_with_publisher();
        let deleted_at = Utc::now();
        let mut deleted_volume = volume("10Ki");
        deleted_volume.metadata.deletion_timestamp = Some(Time(deleted_at));

        watcher.observe(volume("10Ki"), false).await;
        watcher.observe(deleted_volume.clone(), true).await;
        watcher.observe(deleted_volume, true).await;

        let messages = publisher.messages();
        assert_eq!(messages.len(), 2);
        match &messages[1] {
            TelemetryMessage::PvEvent(event) => {
                assert_eq!(event.transition, PvTransition::Stop);
                assert_eq!(event.timestamp, deleted_at);
            }
            other => panic!("expected Stop event, got {other:?}"),
        }
    }
}
