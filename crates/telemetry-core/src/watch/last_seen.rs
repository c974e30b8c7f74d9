use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;

/// Which watcher observed a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatcherKind {
    Pod,
    Node,
    PersistentVolume,
}

/// A lifecycle transition that must be emitted at most once per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Info,
    Scheduled,
    Terminated,
    Start,
    Stop,
}

/// Dedup guard shared by all watchers of one session.
///
/// At most one entry ever exists per (watcher kind, resource UID,
/// transition); its presence is proof the corresponding message was already
/// emitted and suppresses re-emission across informer resyncs. Entries are
/// never removed; the tracker lives and dies with its session.
#[derive(Default)]
pub struct LastSeenTracker {
    entries: DashMap<(WatcherKind, String, Transition), DateTime<Utc>>,
}

impl LastSeenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the transition if unseen. Returns true exactly once per
    /// (kind, uid, transition) tuple.
    pub fn should_emit(
        &self,
        kind: WatcherKind,
        uid: &str,
        transition: Transition,
        timestamp: DateTime<Utc>,
    ) -> bool {
        match self.entries.entry((kind, uid.to_string(), transition)) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(timestamp);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_emission_only() {
        let tracker = LastSeenTracker::new();
        let now = Utc::now();

        assert!(tracker.should_emit(WatcherKind::Pod, "uid-1", Transition::Info, now));
        assert!(!tracker.should_emit(WatcherKind::Pod, "uid-1", Transition::Info, now));
        assert!(!tracker.should_emit(WatcherKind::Pod, "uid-1", Transition::Info, Utc::now()));
    }

    #[test]
    fn tuples_are_independent() {
        let tracker = LastSeenTracker::new();
        let now = Utc::now();

        assert!(tracker.should_emit(WatcherKind::Pod, "uid-1", Transition::Info, now));
        assert!(tracker.should_emit(WatcherKind::Pod, "uid-1", Transition::Scheduled, now));
        assert!(tracker.should_emit(WatcherKind::Pod, "uid-2", Transition::Info, now));
        assert!(tracker.should_emit(WatcherKind::Node, "uid-1", Transition::Info, now));
    }
}
