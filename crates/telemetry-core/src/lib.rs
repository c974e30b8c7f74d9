//! Cluster-telemetry core
//!
//! Watches the lifecycle of pods, nodes and persistent volumes in a live
//! Kubernetes cluster and publishes normalized lifecycle messages for a
//! downstream cost/usage pipeline. One watch session per cluster owns its
//! watchers, read-through fetchers, ownership resolver and dedup state; the
//! session registry creates and destroys sessions as one unit.

mod error;
mod fetch;
mod kube_client;
mod owner;
mod publisher;
mod quantity;
mod session;
mod watch;

pub mod logging;

pub use error::TelemetryError;
pub use fetch::ClaimInfo;
pub use fetch::ControllerInfo;
pub use fetch::ControllerStore;
pub use fetch::NamespaceLabelLookup;
pub use fetch::PvcLookup;
pub use fetch::StorageClassLookup;
pub use fetch::DEFAULT_STORAGE_TYPE;
pub use kube_client::init_kube_client;
pub use owner::CrdWorkloadResolver;
pub use owner::OwnerResolver;
pub use owner::WorkloadResolver;
pub use publisher::EventPublisher;
pub use publisher::ATTR_CLUSTER_ID;
pub use publisher::ATTR_UID;
pub use quantity::cpu_cores;
pub use quantity::cpu_nano;
pub use quantity::cpu_nano_quantity;
pub use quantity::memory_byte;
pub use quantity::memory_byte_quantity;
pub use quantity::memory_byte_scaled;
pub use quantity::normalize_resource_map;
pub use quantity::resource_from_requirements;
pub use quantity::SuffixFormat;
pub use session::resolve_cluster_identity;
pub use session::watch_id;
pub use session::ClusterConfig;
pub use session::KubeSessionBackend;
pub use session::SessionBackend;
pub use session::SessionHandles;
pub use session::WatchSessionRegistry;
pub use watch::LastSeenTracker;
pub use watch::Transition;
pub use watch::WatcherKind;
