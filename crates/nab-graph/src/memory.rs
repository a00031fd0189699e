//! In-memory graph store implementing [`GraphScope`].
//!
//! Nodes are field maps; member sets are ordered, duplicate-free lists of
//! souls. Every mutation is published on the invalidation channel.

use async_trait::async_trait;
use nab_kernel::{GraphScope, Node, QueryError, QueryResult, Soul};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use tokio::sync::broadcast;

const INVALIDATION_CAPACITY: usize = 1024;

/// Errors raised while loading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Portable JSON form of the store.
///
/// ```json
/// { "nodes": { "<soul>": { "field": "value" } },
///   "sets":  { "<soul>": ["<member soul>", "..."] } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: BTreeMap<Soul, Node>,
    #[serde(default)]
    pub sets: BTreeMap<Soul, Vec<Soul>>,
}

#[derive(Debug, Clone, Default)]
struct MemberSet {
    order: Vec<Soul>,
    index: HashSet<Soul>,
}

impl MemberSet {
    fn insert(&mut self, soul: Soul) -> bool {
        if self.index.insert(soul.clone()) {
            self.order.push(soul);
            true
        } else {
            false
        }
    }

    fn remove(&mut self, soul: &Soul) -> bool {
        if self.index.remove(soul) {
            self.order.retain(|member| member != soul);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<Soul, Node>,
    sets: BTreeMap<Soul, MemberSet>,
}

/// Canonical in-memory graph.
#[derive(Debug)]
pub struct MemoryScope {
    state: RwLock<State>,
    changes: broadcast::Sender<Soul>,
}

impl Default for MemoryScope {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScope {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            state: RwLock::new(State::default()),
            changes,
        }
    }

    /// Build a store from a materialized snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let scope = Self::new();
        {
            let mut state = scope
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.nodes = snapshot.nodes;
            for (soul, members) in snapshot.sets {
                let set = state.sets.entry(soul).or_default();
                for member in members {
                    set.insert(member);
                }
            }
        }
        scope
    }

    /// Load a snapshot from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Materialize the current state.
    pub fn snapshot(&self) -> QueryResult<Snapshot> {
        let state = self.read()?;
        Ok(Snapshot {
            nodes: state.nodes.clone(),
            sets: state
                .sets
                .iter()
                .map(|(soul, set)| (soul.clone(), set.order.clone()))
                .collect(),
        })
    }

    /// Insert or replace a node. Returns the previous value.
    pub fn put(&self, soul: Soul, node: Node) -> QueryResult<Option<Node>> {
        let previous = self.write()?.nodes.insert(soul.clone(), node);
        self.publish(soul);
        Ok(previous)
    }

    /// Add `member` to the set at `set`. Returns whether it was new.
    pub fn link(&self, set: Soul, member: Soul) -> QueryResult<bool> {
        let added = self.write()?.sets.entry(set.clone()).or_default().insert(member);
        if added {
            self.publish(set);
        }
        Ok(added)
    }

    /// Remove `member` from the set at `set`. Returns whether it was present.
    pub fn unlink(&self, set: &Soul, member: &Soul) -> QueryResult<bool> {
        let removed = self
            .write()?
            .sets
            .get_mut(set)
            .is_some_and(|members| members.remove(member));
        if removed {
            self.publish(set.clone());
        }
        Ok(removed)
    }

    fn publish(&self, soul: Soul) {
        // No subscribers is the common case.
        let _ = self.changes.send(soul);
    }

    fn read(&self) -> QueryResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| QueryError::upstream("memory graph lock poisoned"))
    }

    fn write(&self) -> QueryResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| QueryError::upstream("memory graph lock poisoned"))
    }
}

#[async_trait]
impl GraphScope for MemoryScope {
    async fn get(&self, soul: &Soul) -> QueryResult<Option<Node>> {
        Ok(self.read()?.nodes.get(soul).cloned())
    }

    async fn souls(&self, soul: &Soul) -> QueryResult<Vec<Soul>> {
        Ok(self
            .read()?
            .sets
            .get(soul)
            .map(|set| set.order.clone())
            .unwrap_or_default())
    }

    async fn count(&self, soul: &Soul) -> QueryResult<u64> {
        Ok(self
            .read()?
            .sets
            .get(soul)
            .map(|set| set.order.len() as u64)
            .unwrap_or(0))
    }

    fn subscribe(&self) -> broadcast::Receiver<Soul> {
        self.changes.subscribe()
    }
}
