use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use telemetry_types::ClusterIdentity;
use telemetry_types::NodeEvent;
use telemetry_types::NodeInfo;
use telemetry_types::NodeTransition;
use telemetry_types::TelemetryMessage;

use crate::publisher::message_attributes;
use crate::publisher::EventPublisher;
use crate::quantity::normalize_resource_map;
use crate::watch::DeltaHandler;
use crate::watch::LastSeenTracker;
use crate::watch::Transition;
use crate::watch::WatcherKind;

/// Node lifecycle watcher.
///
/// First sight of a UID emits `NodeInfo` and `NodeEvent{Start}`, gated
/// independently; deletion emits `NodeEvent{Stop}` once.
pub(crate) struct NodeWatcher {
    identity: ClusterIdentity,
    publisher: Arc<dyn EventPublisher>,
    last_seen: Arc<LastSeenTracker>,
}

impl NodeWatcher {
    pub(crate) fn new(
        identity: ClusterIdentity,
        publisher: Arc<dyn EventPublisher>,
        last_seen: Arc<LastSeenTracker>,
    ) -> Self {
        Self {
            identity,
            publisher,
            last_seen,
        }
    }

    async fn observe(&self, node: Node, deleted: bool) {
        let Some(uid) = node.uid() else {
            return;
        };
        let now = Utc::now();

        if deleted {
            let stopped_at = node
                .metadata
                .deletion_timestamp
                .as_ref()
                .map(|t| t.0)
                .unwrap_or(now);
            if self
                .last_seen
                .should_emit(WatcherKind::Node, &uid, Transition::Stop, stopped_at)
            {
                self.publish_event(&uid, NodeTransition::Stop, stopped_at);
            }
            return;
        }

        let created_at = node.creation_timestamp().map(|t| t.0);

        if self
            .last_seen
            .should_emit(WatcherKind::Node, &uid, Transition::Info, now)
        {
            let status = node.status.as_ref();
            self.publisher.publish(
                TelemetryMessage::NodeInfo(NodeInfo {
                    identity: self.identity.clone(),
                    uid: uid.clone(),
                    name: node.name_any(),
                    labels: node.labels().clone(),
                    allocatable: status
                        .and_then(|status| status.allocatable.as_ref())
                        .map(normalize_resource_map)
                        .unwrap_or_default(),
                    capacity: status
                        .and_then(|status| status.capacity.as_ref())
                        .map(normalize_resource_map)
                        .unwrap_or_default(),
                    created_at,
                }),
                now,
                message_attributes(&self.identity, &uid),
            );
        }

        let started_at = created_at.unwrap_or(now);
        if self
            .last_seen
            .should_emit(WatcherKind::Node, &uid, Transition::Start, started_at)
        {
            self.publish_event(&uid, NodeTransition::Start, started_at);
        }
    }

    fn publish_event(&self, uid: &str, transition: NodeTransition, timestamp: DateTime<Utc>) {
        self.publisher.publish(
            TelemetryMessage::NodeEvent(NodeEvent {
                identity: self.identity.clone(),
                uid: uid.to_string(),
                transition,
                timestamp,
            }),
            timestamp,
            message_attributes(&self.identity, uid),
        );
    }
}

#[async_trait]
impl DeltaHandler<Node> for NodeWatcher {
    async fn applied(&self, node: Node) {
        self.observe(node, false).await;
    }

    async fn deleted(&self, node: Node) {
        self.observe(node, true).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::NodeStatus;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity as RawQuantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use telemetry_types::Quantity;

    use super::*;
    use crate::publisher::testing::RecordingPublisher;

    fn watcher_with_publisher() -> (NodeWatcher, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let identity = ClusterIdentity {
            cluster_id: "cluster-1".to_string(),
            cluster_name: "prod-east".to_string(),
            cloud_provider_id: "gcp-account".to_string(),
            kube_system_uid: "ks-uid".to_string(),
        };
        let watcher = NodeWatcher::new(identity, publisher.clone(), Arc::new(LastSeenTracker::new()));
        (watcher, publisher)
    }

    fn node() -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some("node-a".to_string()),
                uid: Some("node-uid".to_string()),
                creation_timestamp: Some(Time(Utc::now())),
                labels: Some(BTreeMap::from([(
                    "topology.kubernetes.io/zone".to_string(),
                    "us-east1-b".to_string(),
                )])),
                ..Default::default()
            },
            status: Some(NodeStatus {
                allocatable: Some(BTreeMap::from([
                    ("cpu".to_string(), RawQuantity("3920m".to_string())),
                    ("memory".to_string(), RawQuantity("12Gi".to_string())),
                    ("pods".to_string(), RawQuantity("110".to_string())),
                ])),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_sight_emits_info_then_start_once() {
        let (watcher, publisher) = watcher_with_publisher();

        watcher.observe(node(), false).await;
        watcher.observe(node(), false).await;

        let messages = publisher.messages();
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            TelemetryMessage::NodeInfo(info) => {
                assert_eq!(info.name, "node-a");
                assert_eq!(info.allocatable["cpu"], Quantity::nano(3_920_000_000));
                assert_eq!(info.allocatable["memory"], Quantity::bytes(12 << 30));
                assert_eq!(info.allocatable["pods"], Quantity::bytes(110));
            }
            other => panic!("expected NodeInfo, got {other:?}"),
        }
        match &messages[1] {
            TelemetryMessage::NodeEvent(event) => {
                assert_eq!(event.transition, NodeTransition::Start);
            }
            other => panic!("expected Start event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_emits_stop_once_with_deletion_timestamp() {
        let (watcher, publisher) = watcher_with_publisher();
        let deleted_at = Utc::now();
        let mut deleted_node = node();
        deleted_node.metadata.deletion_timestamp = Some(Time(deleted_at));

        watcher.observe(node(), false).await;
        watcher.observe(deleted_node.clone(), true).await;
        watcher.observe(deleted_node, true).await;

        let messages = publisher.messages();
        assert_eq!(messages.len(), 3);
        match &messages[2] {
            TelemetryMessage::NodeEvent(event) => {
                assert_eq!(event.transition, NodeTransition::Stop);
                assert_eq!(event.timestamp, deleted_at);
            }
            other => panic!("expected Stop event, got {other:?}"),
        }
    }
}
