//! Resource watchers
//!
//! One independent watch loop per (session, resource kind). Each loop
//! consumes raw watch events, hands owned objects to its kind handler and
//! restarts the stream after errors; the kind handlers compose messages and
//! gate every transition through the session's last-seen tracker.

mod last_seen;
mod node;
mod pod;
mod pv;

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use kube::runtime::watcher::watcher;
use kube::runtime::watcher::Config;
use kube::runtime::watcher::Event;
use kube::Api;
use kube::Resource;
use serde::de::DeserializeOwned;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

pub use last_seen::LastSeenTracker;
pub use last_seen::Transition;
pub use last_seen::WatcherKind;
pub(crate) use node::NodeWatcher;
pub(crate) use pod::PodWatcher;
pub(crate) use pv::PvWatcher;

/// Per-kind handler of watch deliveries.
///
/// Called from a single task, one object at a time, in stream order; the
/// watch protocol is at-least-once, so handlers must tolerate re-delivery.
#[async_trait]
pub(crate) trait DeltaHandler<K>: Send + Sync {
    async fn applied(&self, object: K);
    async fn deleted(&self, object: K);
}

/// Run a list-then-watch loop until cancelled, restarting the stream after
/// errors with a short pause.
pub(crate) async fn watch_resource<K, H>(api: Api<K>, cancel: CancellationToken, handler: Arc<H>)
where
    K: Resource + Clone + Debug + DeserializeOwned + Send + 'static,
    K::DynamicType: Default + Hash + Eq + Clone,
    H: DeltaHandler<K>,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();
    info!(%kind, "starting resource watcher");

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!(%kind, "resource watcher shutdown requested");
                break;
            }
            result = watch_stream(&api, handler.as_ref()) => {
                match result {
                    Ok(()) => {
                        warn!(%kind, "watch stream ended unexpectedly, restarting");
                    }
                    Err(error) => {
                        error!(%kind, %error, "watch stream failed");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }
}

async fn watch_stream<K, H>(
    api: &Api<K>,
    handler: &H,
) -> Result<(), kube::runtime::watcher::Error>
where
    K: Resource + Clone + Debug + DeserializeOwned + Send + 'static,
    K::DynamicType: Default + Hash + Eq + Clone,
    H: DeltaHandler<K>,
{
    let mut stream = watcher(api.clone(), Config::default()).boxed();

    while let Some(event) = stream.next().await {
        match event? {
            Event::Applied(object) => handler.applied(object).await,
            Event::Deleted(object) => handler.deleted(object).await,
            // Relist after a watch expiry; dedup makes re-delivery harmless.
            Event::Restarted(objects) => {
                for object in objects {
                    handler.applied(object).await;
                }
            }
        }
    }

    Ok(())
}
