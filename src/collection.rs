//! Observable object collections and the views derived from them.
//!
//! A subscription yields an [`ObjectCollection`]: a `watch` channel of
//! immutable snapshots. A [`View`] is a pure function of the latest snapshot,
//! recomputed at most once per snapshot, so a read after a change never sees
//! stale data and repeated reads of the same snapshot are free.

use std::sync::{Arc, Mutex};

use chatcore::types::RawObject;
use tokio::sync::watch;

pub type Snapshot = Arc<Vec<RawObject>>;

/// A live, continuously-updated collection of raw objects.
#[derive(Debug, Clone)]
pub struct ObjectCollection {
    rx: watch::Receiver<Snapshot>,
}

impl ObjectCollection {
    pub fn new(rx: watch::Receiver<Snapshot>) -> Self {
        Self { rx }
    }

    /// A collection that never changes.
    pub fn fixed(objects: Vec<RawObject>) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(objects));
        Self { rx }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot. Returns `false` once the source is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Derives a view that recomputes `compute` whenever the collection changes.
    pub fn view<T, F>(&self, compute: F) -> View<T>
    where
        T: Clone,
        F: Fn(&[RawObject]) -> T + Send + Sync + 'static,
    {
        View {
            rx: self.rx.clone(),
            compute: Arc::new(compute),
            memo: Arc::new(Mutex::new(None)),
        }
    }
}

type Compute<T> = Arc<dyn Fn(&[RawObject]) -> T + Send + Sync>;

/// A derived value over an [`ObjectCollection`].
pub struct View<T> {
    rx: watch::Receiver<Snapshot>,
    compute: Compute<T>,
    memo: Arc<Mutex<Option<(Snapshot, T)>>>,
}

impl<T: Clone> Clone for View<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            compute: self.compute.clone(),
            memo: self.memo.clone(),
        }
    }
}

impl<T: Clone> View<T> {
    /// The value for the latest snapshot.
    pub fn get(&self) -> T {
        let snapshot = self.rx.borrow().clone();
        let mut memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((seen, value)) = memo.as_ref()
            && Arc::ptr_eq(seen, &snapshot)
        {
            return value.clone();
        }
        let value = (self.compute)(&snapshot);
        *memo = Some((snapshot, value.clone()));
        value
    }

    /// Waits for the underlying collection to change, then returns the new
    /// value. Returns `None` once the source is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.get())
    }

    /// Derives a further view from this one.
    pub fn map<U, F>(&self, f: F) -> View<U>
    where
        T: Send + Sync + 'static,
        U: Clone + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.compute.clone();
        View {
            rx: self.rx.clone(),
            compute: Arc::new(move |objects: &[RawObject]| f(inner(objects))),
            memo: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> std::fmt::Debug for View<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("objects", &self.rx.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn note(content: &str) -> RawObject {
        RawObject::from_value(json!({"type": "Note", "content": content})).unwrap()
    }

    #[tokio::test]
    async fn test_view_tracks_latest_snapshot() {
        let (tx, rx) = watch::channel(Arc::new(vec![note("a")]));
        let mut view = ObjectCollection::new(rx).view(|objects| objects.len());
        assert_eq!(view.get(), 1);

        tx.send_replace(Arc::new(vec![note("a"), note("b")]));
        assert_eq!(view.get(), 2);

        tx.send_replace(Arc::new(vec![]));
        assert_eq!(view.next().await, Some(0));

        drop(tx);
        assert_eq!(view.next().await, None);
    }

    #[test]
    fn test_view_computes_once_per_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let view = ObjectCollection::fixed(vec![note("a")]).view(move |objects| {
            counter.fetch_add(1, Ordering::SeqCst);
            objects.len()
        });

        assert_eq!(view.get(), 1);
        assert_eq!(view.clone().get(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_map_derives_from_parent() {
        let view = ObjectCollection::fixed(vec![note("a"), note("b")])
            .view(|objects| objects.len())
            .map(|n| n * 10);
        assert_eq!(view.get(), 20);
    }
}
