use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identity::ClusterIdentity;
use crate::owner::Owner;
use crate::resource::Quantity;
use crate::resource::Resource;

/// One message emitted to the event publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TelemetryMessage {
    PodInfo(PodInfo),
    PodEvent(PodEvent),
    NodeInfo(NodeInfo),
    NodeEvent(NodeEvent),
    PvInfo(PvInfo),
    PvEvent(PvEvent),
}

/// One-time description of a pod, emitted on first sight of its UID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodInfo {
    pub identity: ClusterIdentity,
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub node_name: Option<String>,
    pub qos_class: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub namespace_labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub owner: Owner,
    /// Per-container normalized requests/limits, keyed by container name.
    pub containers: BTreeMap<String, Resource>,
    /// Pod-level effective resource: per key, max(sum of containers, max of
    /// init containers).
    pub total_resource: Resource,
    pub volumes: Vec<VolumeClaim>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A persistent-volume claim mounted by a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeClaim {
    /// Volume name inside the pod spec.
    pub volume_name: String,
    pub claim_name: String,
    /// Claimed capacity in bytes, when the claim could be fetched.
    pub capacity_bytes: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodTransition {
    Scheduled,
    Terminated,
}

/// A pod lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodEvent {
    pub identity: ClusterIdentity,
    pub uid: String,
    pub transition: PodTransition,
    pub timestamp: DateTime<Utc>,
}

/// One-time description of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub identity: ClusterIdentity,
    pub uid: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub allocatable: BTreeMap<String, Quantity>,
    pub capacity: BTreeMap<String, Quantity>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeTransition {
    Start,
    Stop,
}

/// A node lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    pub identity: ClusterIdentity,
    pub uid: String,
    pub transition: NodeTransition,
    pub timestamp: DateTime<Utc>,
}

/// One-time description of a persistent volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvInfo {
    pub identity: ClusterIdentity,
    pub uid: String,
    pub name: String,
    pub claim_namespace: Option<String>,
    pub claim_name: Option<String>,
    /// Volume backend derived from the populated volume-source field.
    pub pv_type: String,
    pub storage_class_type: String,
    pub capacity_bytes: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PvTransition {
    Expansion,
    Stop,
}

/// A persistent-volume lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvEvent {
    pub identity: ClusterIdentity,
    pub uid: String,
    pub transition: PvTransition,
    pub timestamp: DateTime<Utc>,
    /// Present on expansion: the new capacity in bytes.
    pub capacity_bytes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_tagged_by_type() {
        let message = TelemetryMessage::NodeEvent(NodeEvent {
            identity: ClusterIdentity {
                cluster_id: "cluster-1".to_string(),
                cluster_name: "prod-east".to_string(),
                cloud_provider_id: "gcp-account".to_string(),
                kube_system_uid: "ks-uid".to_string(),
            },
            uid: "node-uid".to_string(),
            transition: NodeTransition::Start,
            timestamp: Utc::now(),
        });

        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "NodeEvent");
        assert_eq!(value["transition"], "Start");
        assert_eq!(value["identity"]["cluster_id"], "cluster-1");
    }
}
