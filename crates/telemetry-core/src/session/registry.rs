use std::sync::Arc;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;
use error_stack::Report;
use telemetry_types::ClusterIdentity;
use tracing::debug;
use tracing::info;

use crate::error::TelemetryError;
use crate::publisher::EventPublisher;
use crate::session::backend::SessionBackend;
use crate::session::backend::SessionHandles;
use crate::session::identity::watch_id;
use crate::session::ClusterConfig;

/// Per-cluster watch-session orchestrator.
///
/// `create` is idempotent on the deterministic watch id; `delete` tears a
/// session down as one unit and is a no-op for unknown ids.
pub struct WatchSessionRegistry {
    backend: Arc<dyn SessionBackend>,
    publisher: Arc<dyn EventPublisher>,
    sessions: DashMap<String, WatchSession>,
}

struct WatchSession {
    handles: SessionHandles,
    last_refreshed: Mutex<DateTime<Utc>>,
}

impl WatchSession {
    fn new(handles: SessionHandles) -> Self {
        Self {
            handles,
            last_refreshed: Mutex::new(Utc::now()),
        }
    }

    fn touch(&self) {
        *self.last_refreshed.lock().expect("liveness marker") = Utc::now();
    }
}

impl WatchSessionRegistry {
    pub fn new(backend: Arc<dyn SessionBackend>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            backend,
            publisher,
            sessions: DashMap::new(),
        }
    }

    /// Create (or re-acknowledge) the session for this cluster config.
    ///
    /// An existing session for the same identity is refreshed and returned;
    /// no second set of watchers is started.
    ///
    /// # Errors
    ///
    /// - [`TelemetryError::ConnectionFailed`] /
    ///   [`TelemetryError::IdentityResolutionFailed`] from the backend; in
    ///   that case no session is registered at all
    pub async fn create(&self, config: &ClusterConfig) -> Result<String, Report<TelemetryError>> {
        let watch_id = watch_id(config);

        if let Some(session) = self.sessions.get(&watch_id) {
            session.touch();
            debug!(%watch_id, "watch session already active, refreshed");
            return Ok(watch_id);
        }

        let handles = self.backend.start(config, Arc::clone(&self.publisher)).await?;

        match self.sessions.entry(watch_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                // Lost a create race; the session that won stays.
                handles.stop();
                existing.get().touch();
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                info!(
                    %watch_id,
                    cluster_id = %handles.identity.cluster_id,
                    "watch session created"
                );
                vacant.insert(WatchSession::new(handles));
            }
        }

        Ok(watch_id)
    }

    /// Stop and remove the session. Unknown ids are a no-op.
    pub fn delete(&self, watch_id: &str) {
        match self.sessions.remove(watch_id) {
            Some((_, session)) => {
                session.handles.stop();
                info!(watch_id, "watch session deleted");
            }
            None => debug!(watch_id, "delete for unknown watch session ignored"),
        }
    }

    /// Ids of all running sessions, for desired-vs-running reconciliation.
    pub fn list_active(&self) -> Vec<String> {
        self.sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Identity of a running session, if any.
    pub fn identity(&self, watch_id: &str) -> Option<ClusterIdentity> {
        self.sessions
            .get(watch_id)
            .map(|session| session.handles.identity.clone())
    }
}
