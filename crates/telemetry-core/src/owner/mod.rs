//! Pod ownership resolution
//!
//! Walks `controller=true` owner references up to the top-level controller.
//! Statically known controller kinds resolve through registered stores;
//! everything else goes through the dynamic (CRD) resolver, which degrades
//! to a bare-identity workload rather than failing.

mod dynamic;
mod resolver;

pub use dynamic::CrdWorkloadResolver;
pub use dynamic::WorkloadResolver;
pub use resolver::OwnerResolver;
