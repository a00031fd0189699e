//! Result cache with in-flight coalescing.
//!
//! Each key holds either a pending run, shared by every caller that asks
//! while it is in flight, or a completed value with an expiry. Lookups and
//! insertions happen under one lock with no suspension in between, so two
//! callers can never both start a run for the same key. Failures are never
//! retained.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use nab_kernel::{QueryError, QueryResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A not-yet-started execution.
pub type Run<V> = BoxFuture<'static, QueryResult<V>>;

/// Cache identity: the route that answered and the normalized path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub route: String,
    pub path: String,
}

impl CacheKey {
    pub fn new(route: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            path: path.into(),
        }
    }
}

enum Slot<V> {
    Pending {
        generation: u64,
        run: Shared<Run<V>>,
    },
    Ready {
        value: V,
        expires: Instant,
    },
}

struct Entries<V> {
    slots: HashMap<CacheKey, Slot<V>>,
    next_generation: u64,
}

enum Lookup<V> {
    Hit(V),
    Join(u64, Shared<Run<V>>),
    Miss,
}

pub struct ResultCache<V> {
    entries: Mutex<Entries<V>>,
    capacity: Option<usize>,
}

impl<V: Clone + Send + Sync + 'static> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<V: Clone + Send + Sync + 'static> ResultCache<V> {
    /// `capacity` bounds retained values; pending runs are not counted.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                slots: HashMap::new(),
                next_generation: 0,
            }),
            capacity,
        }
    }

    fn lock(&self) -> QueryResult<MutexGuard<'_, Entries<V>>> {
        self.entries
            .lock()
            .map_err(|_| QueryError::invariant("result cache lock poisoned"))
    }

    /// Return the retained value for `key`, join its in-flight run, or start
    /// `start()` and share it.
    ///
    /// A successful result is kept for `ttl`; with no TTL only the in-flight
    /// run is shared.
    pub async fn get_or_run<F>(&self, key: CacheKey, ttl: Option<Duration>, start: F) -> QueryResult<V>
    where
        F: FnOnce() -> Run<V>,
    {
        let (generation, run) = {
            let mut entries = self.lock()?;
            let now = Instant::now();
            let lookup = match entries.slots.get(&key) {
                Some(Slot::Ready { value, expires }) if *expires > now => {
                    Lookup::Hit(value.clone())
                }
                Some(Slot::Pending { generation, run }) => Lookup::Join(*generation, run.clone()),
                _ => Lookup::Miss,
            };
            match lookup {
                Lookup::Hit(value) => {
                    tracing::debug!(route = %key.route, path = %key.path, "cache hit");
                    return Ok(value);
                }
                Lookup::Join(generation, run) => {
                    tracing::debug!(route = %key.route, path = %key.path, "joining in-flight run");
                    (generation, run)
                }
                Lookup::Miss => {
                    let swept = drop_expired(&mut entries.slots, now);
                    if swept > 0 {
                        tracing::debug!(swept, "dropped expired results");
                    }
                    let generation = entries.next_generation;
                    entries.next_generation += 1;
                    let run = start().shared();
                    entries.slots.insert(
                        key.clone(),
                        Slot::Pending {
                            generation,
                            run: run.clone(),
                        },
                    );
                    (generation, run)
                }
            }
        };

        let result = run.await;
        self.settle(&key, generation, &result, ttl)?;
        result
    }

    /// Replace the pending slot of `generation` with its outcome. Any waiter
    /// may settle; later ones find the slot already replaced.
    fn settle(
        &self,
        key: &CacheKey,
        generation: u64,
        result: &QueryResult<V>,
        ttl: Option<Duration>,
    ) -> QueryResult<()> {
        let mut entries = self.lock()?;
        let current = matches!(
            entries.slots.get(key),
            Some(Slot::Pending { generation: pending, .. }) if *pending == generation
        );
        if !current {
            return Ok(());
        }

        match (result, ttl) {
            (Ok(value), Some(ttl)) => {
                entries.slots.insert(
                    key.clone(),
                    Slot::Ready {
                        value: value.clone(),
                        expires: Instant::now() + ttl,
                    },
                );
                tracing::debug!(route = %key.route, path = %key.path, ?ttl, "retained result");
                self.evict(&mut entries);
            }
            (Ok(_), None) => {
                entries.slots.remove(key);
            }
            (Err(err), _) => {
                entries.slots.remove(key);
                tracing::debug!(route = %key.route, path = %key.path, %err, "failure not retained");
            }
        }
        Ok(())
    }

    /// Drop retained values closest to expiry until within capacity.
    fn evict(&self, entries: &mut Entries<V>) {
        let Some(capacity) = self.capacity else {
            return;
        };
        let mut ready: Vec<(Instant, CacheKey)> = entries
            .slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Ready { expires, .. } => Some((*expires, key.clone())),
                Slot::Pending { .. } => None,
            })
            .collect();
        if ready.len() <= capacity {
            return;
        }
        ready.sort();
        let excess = ready.len() - capacity;
        for (_, key) in ready.into_iter().take(excess) {
            tracing::debug!(route = %key.route, path = %key.path, "evicted");
            entries.slots.remove(&key);
        }
    }

    /// Drop every entry for `path`, under any route. Returns how many went.
    pub fn invalidate(&self, path: &str) -> QueryResult<usize> {
        let mut entries = self.lock()?;
        let before = entries.slots.len();
        entries.slots.retain(|key, _| key.path != path);
        Ok(before - entries.slots.len())
    }

    pub fn clear(&self) -> QueryResult<()> {
        self.lock()?.slots.clear();
        Ok(())
    }

    /// Drop expired values. Returns how many went. Every run that misses
    /// does the same sweep.
    pub fn purge_expired(&self) -> QueryResult<usize> {
        let mut entries = self.lock()?;
        Ok(drop_expired(&mut entries.slots, Instant::now()))
    }

    /// Pending plus retained entries.
    pub fn len(&self) -> QueryResult<usize> {
        Ok(self.lock()?.slots.len())
    }

    pub fn is_empty(&self) -> QueryResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn drop_expired<V>(slots: &mut HashMap<CacheKey, Slot<V>>, now: Instant) -> usize {
    let before = slots.len();
    slots.retain(|_, slot| !matches!(slot, Slot::Ready { expires, .. } if *expires <= now));
    before - slots.len()
}
