use std::sync::Arc;

use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::PersistentVolume;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use telemetry_types::ClusterIdentity;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::TelemetryError;
use crate::fetch::NamespaceLabelCache;
use crate::fetch::PvcCache;
use crate::fetch::StorageClassTypeCache;
use crate::kube_client::init_kube_client;
use crate::owner::CrdWorkloadResolver;
use crate::owner::OwnerResolver;
use crate::publisher::EventPublisher;
use crate::session::identity::resolve_cluster_identity;
use crate::session::ClusterConfig;
use crate::watch::watch_resource;
use crate::watch::LastSeenTracker;
use crate::watch::NodeWatcher;
use crate::watch::PodWatcher;
use crate::watch::PvWatcher;

/// Running parts of one session, returned by the backend as a unit.
pub struct SessionHandles {
    pub identity: ClusterIdentity,
    pub cancel: CancellationToken,
    pub tasks: Vec<JoinHandle<()>>,
}

impl SessionHandles {
    /// Stop every child watch loop. In-flight fetches die with their task;
    /// nothing they produce can be published afterwards.
    pub fn stop(&self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Builds and starts the full component set of one watch session.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Never registers anything on failure; the caller owns the handles.
    async fn start(
        &self,
        config: &ClusterConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<SessionHandles, Report<TelemetryError>>;
}

/// Production backend: real cluster client, shared resolver/fetchers, one
/// spawned watch loop per kind.
#[derive(Default)]
pub struct KubeSessionBackend;

impl KubeSessionBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionBackend for KubeSessionBackend {
    async fn start(
        &self,
        config: &ClusterConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<SessionHandles, Report<TelemetryError>> {
        let client = init_kube_client(config.kubeconfig.clone()).await?;
        let identity = resolve_cluster_identity(&client, config).await?;
        info!(
            cluster_id = %identity.cluster_id,
            kube_system_uid = %identity.kube_system_uid,
            "resolved cluster identity"
        );

        let last_seen = Arc::new(LastSeenTracker::new());
        let dynamic = Arc::new(CrdWorkloadResolver::new(client.clone()));
        let owners = Arc::new(OwnerResolver::with_default_stores(client.clone(), dynamic));
        let namespaces = Arc::new(NamespaceLabelCache::new(client.clone()));
        let claims = Arc::new(PvcCache::new(client.clone()));
        let storage_classes = Arc::new(StorageClassTypeCache::new(client.clone()));

        let pod_api: Api<Pod> = if config.namespace.is_empty() {
            Api::all(client.clone())
        } else {
            Api::namespaced(client.clone(), &config.namespace)
        };
        let node_api: Api<Node> = Api::all(client.clone());
        let pv_api: Api<PersistentVolume> = Api::all(client);

        let pod_watcher = Arc::new(PodWatcher::new(
            identity.clone(),
            publisher.clone(),
            last_seen.clone(),
            owners,
            namespaces,
            claims,
        ));
        let node_watcher = Arc::new(NodeWatcher::new(
            identity.clone(),
            publisher.clone(),
            last_seen.clone(),
        ));
        let pv_watcher = Arc::new(PvWatcher::new(
            identity.clone(),
            publisher,
            last_seen,
            storage_classes,
        ));

        let cancel = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(watch_resource(pod_api, cancel.child_token(), pod_watcher)),
            tokio::spawn(watch_resource(node_api, cancel.child_token(), node_watcher)),
            tokio::spawn(watch_resource(pv_api, cancel.child_token(), pv_watcher)),
        ];

        Ok(SessionHandles {
            identity,
            cancel,
            tasks,
        })
    }
}
