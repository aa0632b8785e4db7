// ── Reactive keyed collection ──
//
// Concurrent storage with O(1) lookups and push-based change notification
// via `watch` channels. Snapshots are ordered by key.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

pub(crate) type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// Every mutation rebuilds the snapshot that subscribers receive. Readers only ever get `Arc` clones.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: String, entity: Arc<T>) -> bool {
        let is_new = self.by_key.insert(key, entity).is_none();
        self.publish();
        is_new
    }

    /// Insert many entities with a single snapshot rebuild.
    pub(crate) fn extend(&self, entries: impl IntoIterator<Item = (String, Arc<T>)>) {
        for (key, entity) in entries {
            self.by_key.insert(key, entity);
        }
        self.publish();
    }

    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn clear(&self) {
        self.by_key.clear();
        self.publish();
    }

    fn publish(&self) {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values = entries.into_iter().map(|(_, v)| v).collect();

        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_new_keys() {
        let col: EntityCollection<String> = EntityCollection::new();
        assert!(col.upsert("a".into(), Arc::new("one".into())));
        assert!(!col.upsert("a".into(), Arc::new("two".into())));
        assert_eq!(*col.get("a").unwrap(), "two");
        assert_eq!(col.snapshot().len(), 1);
    }

    #[test]
    fn snapshot_is_sorted_by_key() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert("b".into(), Arc::new("B".into()));
        col.upsert("a".into(), Arc::new("A".into()));
        col.upsert("c".into(), Arc::new("C".into()));

        let snap: Vec<String> = col.snapshot().iter().map(|s| (**s).clone()).collect();
        assert_eq!(snap, vec!["A", "B", "C"]);
    }

    #[test]
    fn remove_of_missing_key_does_not_publish() {
        let col: EntityCollection<String> = EntityCollection::new();
        col.upsert("a".into(), Arc::new("A".into()));
        let mut rx = col.subscribe();

        assert!(col.remove("zzz").is_none());
        assert!(!rx.has_changed().unwrap());

        assert!(col.remove("a").is_some());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn subscribers_see_updates() {
        let col: EntityCollection<String> = EntityCollection::new();
        let mut rx = col.subscribe();
        col.extend([("x".to_string(), Arc::new("X".to_string()))]);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
