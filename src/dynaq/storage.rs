//! Storage for learned values, the transition model and the planning queue.
//!
//! Every solver instance owns one of each; nothing here is shared between
//! instances, so no locking is involved. Keys are structural `(State,
//! Action)` pairs in `FxHashMap`s rather than encoded strings.

use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

/// Learned action-value estimates keyed by `(state, action)`.
///
/// Absent keys read as 0.0; the table only ever grows.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable<S, A>
where
    S: Eq + Hash,
    A: Eq + Hash,
{
    values: FxHashMap<(S, A), f64>,
}

impl<S, A> Default for ValueTable<S, A>
where
    S: Eq + Hash,
    A: Eq + Hash,
{
    fn default() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }
}

impl<S, A> ValueTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current estimate for a pair, 0.0 when unseen.
    pub fn get(&self, state: &S, action: &A) -> f64 {
        self.values
            .get(&(state.clone(), action.clone()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Like [`get`](Self::get) for an already-built key.
    pub fn get_key(&self, key: &(S, A)) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Store an estimate.
    pub fn set(&mut self, state: S, action: A, value: f64) {
        self.values.insert((state, action), value);
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been learned yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all stored pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&(S, A), &f64)> {
        self.values.iter()
    }

    /// Merge replica tables by per-key arithmetic mean over the union of
    /// keys; a key absent from a replica contributes 0.0.
    pub fn merged(tables: &[Self]) -> Self {
        let mut merged = Self::new();
        if tables.is_empty() {
            return merged;
        }
        let mut keys: FxHashSet<&(S, A)> = FxHashSet::default();
        for table in tables {
            keys.extend(table.values.keys());
        }
        let n = tables.len() as f64;
        for key in keys {
            let sum: f64 = tables
                .iter()
                .map(|t| t.values.get(key).copied().unwrap_or(0.0))
                .sum();
            merged.values.insert(key.clone(), sum / n);
        }
        merged
    }
}

/// One observed `(next_state, reward)` sample per `(state, action)` pair.
///
/// The environments this solver targets are deterministic given their
/// input, so a single sample fully describes a transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionModel<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    entries: FxHashMap<(S, A), (S, f64)>,
}

impl<S, A> TransitionModel<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Record (or overwrite) the observed outcome of a pair.
    pub fn record(&mut self, state: S, action: A, next: S, reward: f64) {
        self.entries.insert((state, action), (next, reward));
    }

    /// Modeled outcome of a pair, if observed.
    pub fn get(&self, key: &(S, A)) -> Option<&(S, f64)> {
        self.entries.get(key)
    }

    /// Number of modeled pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Reverse transition index: which `(state, action)` pairs have been seen
/// to lead into a given state.
#[derive(Debug, Clone, Default)]
pub struct PredecessorIndex<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    entries: FxHashMap<S, FxHashSet<(S, A)>>,
}

impl<S, A> PredecessorIndex<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Register `(state, action)` as a predecessor of `next`.
    pub fn register(&mut self, next: S, state: S, action: A) {
        self.entries
            .entry(next)
            .or_default()
            .insert((state, action));
    }

    /// Pairs known to transition into `state`.
    pub fn get(&self, state: &S) -> Option<&FxHashSet<(S, A)>> {
        self.entries.get(state)
    }
}

/// De-duplicated max-priority queue over arbitrary keys.
///
/// An indexed binary heap: `push` on an existing key replaces its
/// priority in O(log n) instead of inserting a duplicate, so a key can
/// be scheduled at most once at a time.
#[derive(Debug, Clone)]
pub struct PriorityQueue<K> {
    heap: Vec<(K, f64)>,
    index: FxHashMap<K, usize>,
}

impl<K> Default for PriorityQueue<K> {
    fn default() -> Self {
        Self {
            heap: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<K> PriorityQueue<K>
where
    K: Clone + Eq + Hash,
{
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued keys.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Queue a key, or replace the priority of an already-queued key.
    pub fn push(&mut self, key: K, priority: f64) {
        if let Some(&i) = self.index.get(&key) {
            let old = self.heap[i].1;
            self.heap[i].1 = priority;
            if priority > old {
                self.sift_up(i);
            } else {
                self.sift_down(i);
            }
        } else {
            self.heap.push((key, priority));
            self.sift_up(self.heap.len() - 1);
        }
    }

    /// Remove and return the highest-priority key.
    pub fn pop(&mut self) -> Option<(K, f64)> {
        let last = self.heap.len().checked_sub(1)?;
        self.heap.swap(0, last);
        let (key, priority) = self.heap.pop()?;
        self.index.remove(&key);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((key, priority))
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i].1 <= self.heap[parent].1 {
                break;
            }
            self.heap.swap(i, parent);
            self.reindex(i);
            i = parent;
        }
        self.reindex(i);
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut largest = i;
            if left < self.heap.len() && self.heap[left].1 > self.heap[largest].1 {
                largest = left;
            }
            if right < self.heap.len() && self.heap[right].1 > self.heap[largest].1 {
                largest = right;
            }
            if largest == i {
                break;
            }
            self.heap.swap(i, largest);
            self.reindex(i);
            i = largest;
        }
        self.reindex(i);
    }

    fn reindex(&mut self, i: usize) {
        let key = self.heap[i].0.clone();
        self.index.insert(key, i);
    }
}
