//! Read-through caches used to enrich events
//!
//! Each fetcher checks a concurrency-safe local map first and falls back to
//! one API GET per miss. Lookup failures (permissions, absence) degrade to
//! `None`/defaults and are logged; they never propagate into a watch loop.

mod controller_store;
mod namespace;
mod pvc;
mod storage_class;

pub use controller_store::deployment_store;
pub use controller_store::replica_set_store;
pub use controller_store::ControllerInfo;
pub use controller_store::ControllerStore;
pub use namespace::NamespaceLabelCache;
pub use namespace::NamespaceLabelLookup;
pub use pvc::ClaimInfo;
pub use pvc::PvcCache;
pub use pvc::PvcLookup;
pub use storage_class::StorageClassLookup;
pub use storage_class::StorageClassTypeCache;
pub use storage_class::DEFAULT_STORAGE_TYPE;
