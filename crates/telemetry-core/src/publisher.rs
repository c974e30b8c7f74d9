use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;
use telemetry_types::ClusterIdentity;
use telemetry_types::TelemetryMessage;

/// Attribute key carrying the cluster correlation id on every message.
pub const ATTR_CLUSTER_ID: &str = "clusterId";
/// Attribute key carrying the UID of the resource a message refers to.
pub const ATTR_UID: &str = "uid";

/// Downstream sink for emitted telemetry messages.
///
/// Fire-and-forget: the core guarantees at-most-once intent through the
/// last-seen tracker; delivery semantics beyond that belong to the
/// implementation.
pub trait EventPublisher: Send + Sync {
    fn publish(
        &self,
        message: TelemetryMessage,
        occurred_at: DateTime<Utc>,
        attributes: HashMap<String, String>,
    );
}

/// Minimum attribute set required by the publisher contract.
pub(crate) fn message_attributes(identity: &ClusterIdentity, uid: &str) -> HashMap<String, String> {
    HashMap::from([
        (ATTR_CLUSTER_ID.to_string(), identity.cluster_id.clone()),
        (ATTR_UID.to_string(), uid.to_string()),
    ])
}
