//! Shared telemetry type definitions
//!
//! This crate contains the data model shared between the cluster-telemetry
//! core and its consumers: cluster correlation identity, resolved workload
//! ownership, canonical resource quantities, and the messages emitted to the
//! event publisher.

mod identity;
mod message;
mod owner;
mod resource;

pub use identity::ClusterIdentity;
pub use message::NodeEvent;
pub use message::NodeInfo;
pub use message::NodeTransition;
pub use message::PodEvent;
pub use message::PodInfo;
pub use message::PodTransition;
pub use message::PvEvent;
pub use message::PvInfo;
pub use message::PvTransition;
pub use message::TelemetryMessage;
pub use message::VolumeClaim;
pub use owner::Owner;
pub use owner::Workload;
pub use owner::WorkloadReference;
pub use resource::Quantity;
pub use resource::Resource;
