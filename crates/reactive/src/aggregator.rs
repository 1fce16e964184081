//! Test and inspection helper that records a change-set stream.

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use ripple_core::{ChangeSet, ChangeSummary, Error};
use ripple_incremental::ChangeAwareCache;
use std::hash::Hash;
use std::sync::Arc;

struct AggregatorState<T, K> {
    data: ChangeAwareCache<T, K>,
    messages: Vec<ChangeSet<T, K>>,
    summary: ChangeSummary,
    error: Option<Error>,
    completed: bool,
}

struct Recorder<T, K> {
    state: Arc<Mutex<AggregatorState<T, K>>>,
}

impl<T, K> Observer<ChangeSet<T, K>> for Recorder<T, K>
where
    T: Clone + Send,
    K: Clone + Eq + Hash + Send,
{
    fn on_next(&self, changes: ChangeSet<T, K>) {
        let mut state = self.state.lock();
        state.data.clone_changes(&changes);
        state.data.capture_changes();
        let count = state.data.len();
        state.summary.record(&changes, count);
        state.messages.push(changes);
    }

    fn on_error(&self, error: Error) {
        self.state.lock().error = Some(error);
    }

    fn on_completed(&self) {
        self.state.lock().completed = true;
    }
}

/// Subscribes to a change-set stream and keeps everything it delivers.
///
/// Besides the raw messages, the aggregator materializes the stream into a
/// keyed collection and keeps running [`ChangeSummary`] statistics. Dropping
/// the aggregator disposes its subscription.
pub struct ChangeSetAggregator<T, K> {
    state: Arc<Mutex<AggregatorState<T, K>>>,
    subscription: Subscription,
}

impl<T, K> ChangeSetAggregator<T, K>
where
    T: Clone + Send + 'static,
    K: Clone + Eq + Hash + Send + 'static,
{
    /// Subscribes to `source`.
    pub fn new<O>(source: &O) -> Self
    where
        O: Observable<ChangeSet<T, K>> + ?Sized,
    {
        let state = Arc::new(Mutex::new(AggregatorState {
            data: ChangeAwareCache::new(),
            messages: Vec::new(),
            summary: ChangeSummary::new(),
            error: None,
            completed: false,
        }));
        let subscription = source.subscribe(Arc::new(Recorder {
            state: state.clone(),
        }));
        Self { state, subscription }
    }

    /// Returns every change set received so far.
    pub fn messages(&self) -> Vec<ChangeSet<T, K>> {
        self.state.lock().messages.clone()
    }

    /// Returns the number of change sets received so far.
    pub fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Returns the size of the materialized collection.
    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Returns true if the materialized collection is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    /// Returns the materialized item under `key`.
    pub fn get(&self, key: &K) -> Option<T> {
        self.state.lock().data.get(key).cloned()
    }

    /// Returns true if the materialized collection holds `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.state.lock().data.contains_key(key)
    }

    /// Returns the materialized items, in no particular order.
    pub fn items(&self) -> Vec<T> {
        self.state.lock().data.items().cloned().collect()
    }

    /// Returns the error the stream failed with.
    pub fn error(&self) -> Option<Error> {
        self.state.lock().error.clone()
    }

    /// Returns true once the stream completed successfully.
    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// Returns the statistics of the latest change set and of the stream so far.
    pub fn summary(&self) -> ChangeSummary {
        self.state.lock().summary
    }

    /// Stops recording.
    pub fn dispose(&self) {
        self.subscription.dispose();
    }
}
