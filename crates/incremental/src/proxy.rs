//! Filter proxies for reactive filtering.
//!
//! Every tracked item gets a [`FilterProxy`] in a key-keyed side table. The
//! proxy caches the latest boolean observed from the item's own event
//! source, whether the item is currently part of the downstream view, and
//! the handle of the subscription feeding it. The handle type is generic so
//! this table knows nothing about how subscriptions are implemented.
//!
//! Every (re)subscription gets a fresh generation number; observations
//! tagged with an older generation are stale and ignored.

use crate::refresh::RefreshAware;
use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::HashMap;
use ripple_core::Change;

/// Per-item filter state.
#[derive(Debug)]
pub struct FilterProxy<T, H> {
    item: T,
    /// Latest boolean observed from the item's source
    passes: bool,
    /// Whether the downstream view currently holds the item
    included: bool,
    generation: u64,
    handle: Option<H>,
}

impl<T, H> FilterProxy<T, H> {
    /// Returns the tracked item.
    #[inline]
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Returns the latest observed boolean.
    #[inline]
    pub fn passes(&self) -> bool {
        self.passes
    }

    /// Returns whether the downstream view holds the item.
    #[inline]
    pub fn is_included(&self) -> bool {
        self.included
    }

    /// Returns the generation of the current subscription.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of inserting or replacing a proxy.
#[derive(Debug)]
pub struct Upserted<T, H> {
    /// Generation the new subscription must be tagged with
    pub generation: u64,
    /// The replaced item, when the key was already tracked
    pub previous: Option<T>,
    /// Whether the downstream view held the replaced item
    pub was_included: bool,
    /// Handle of the replaced subscription; the caller releases it
    pub handle: Option<H>,
}

/// Key-keyed side table of filter proxies.
#[derive(Debug)]
pub struct ProxyTable<T, K, H> {
    proxies: HashMap<K, FilterProxy<T, H>>,
    next_generation: u64,
}

impl<T, K, H> Default for ProxyTable<T, K, H>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K, H> ProxyTable<T, K, H>
where
    K: Eq + Hash,
{
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            proxies: HashMap::new(),
            next_generation: 1,
        }
    }

    /// Returns the number of tracked items.
    #[inline]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns true if nothing is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Returns the proxy for `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&FilterProxy<T, H>> {
        self.proxies.get(key)
    }

    /// Returns the number of items the downstream view holds.
    pub fn included_count(&self) -> usize {
        self.proxies.values().filter(|p| p.included).count()
    }

    /// Starts tracking `item`, or replaces the item already tracked under `key`.
    ///
    /// The cached boolean is reset: a new subscription must be attached and
    /// only its values count from now on.
    pub fn upsert(&mut self, key: K, item: T) -> Upserted<T, H> {
        let generation = self.next_generation;
        self.next_generation += 1;

        match self.proxies.get_mut(&key) {
            Some(proxy) => {
                let previous = core::mem::replace(&mut proxy.item, item);
                proxy.passes = false;
                proxy.generation = generation;
                Upserted {
                    generation,
                    previous: Some(previous),
                    was_included: proxy.included,
                    handle: proxy.handle.take(),
                }
            }
            None => {
                self.proxies.insert(
                    key,
                    FilterProxy {
                        item,
                        passes: false,
                        included: false,
                        generation,
                        handle: None,
                    },
                );
                Upserted {
                    generation,
                    previous: None,
                    was_included: false,
                    handle: None,
                }
            }
        }
    }

    /// Attaches the subscription handle for `generation`.
    ///
    /// Hands the handle back when the proxy is gone or was superseded, so
    /// the caller can release it.
    pub fn attach(&mut self, key: &K, generation: u64, handle: H) -> core::result::Result<(), H> {
        match self.proxies.get_mut(key) {
            Some(proxy) if proxy.generation == generation => {
                proxy.handle = Some(handle);
                Ok(())
            }
            _ => Err(handle),
        }
    }

    /// Records a boolean observed from the subscription tagged `generation`.
    ///
    /// Returns false if the observation is stale.
    pub fn observe(&mut self, key: &K, generation: u64, passes: bool) -> bool {
        match self.proxies.get_mut(key) {
            Some(proxy) if proxy.generation == generation => {
                proxy.passes = passes;
                true
            }
            _ => false,
        }
    }

    /// Drops every proxy, returning their subscription handles.
    pub fn drain_handles(&mut self) -> Vec<H> {
        self.proxies
            .drain()
            .filter_map(|(_, proxy)| proxy.handle)
            .collect()
    }
}

impl<T, K, H> ProxyTable<T, K, H>
where
    T: Clone,
    K: Eq + Hash + Clone,
{
    /// Reconciles the downstream view with the cached boolean of `key`.
    ///
    /// Emits Add when the item newly passes, Remove when it newly fails and
    /// nothing when membership is unchanged.
    pub fn reevaluate(&mut self, key: &K) -> Option<Change<T, K>> {
        let proxy = self.proxies.get_mut(key)?;
        match (proxy.passes, proxy.included) {
            (true, false) => {
                proxy.included = true;
                Some(Change::add(key.clone(), proxy.item.clone()))
            }
            (false, true) => {
                proxy.included = false;
                Some(Change::remove(key.clone(), proxy.item.clone()))
            }
            _ => None,
        }
    }

    /// Reconciles the downstream view after the item of `key` was replaced.
    ///
    /// `upserted` is what [`ProxyTable::upsert`] returned for the replacement.
    /// An item that still passes is reported as an Update from the previous
    /// item; one that newly fails is removed as the item the view holds.
    pub fn reevaluate_replaced(
        &mut self,
        key: &K,
        upserted: &Upserted<T, H>,
    ) -> Option<Change<T, K>> {
        let previous = match (&upserted.previous, upserted.was_included) {
            (Some(previous), true) => previous,
            _ => return self.reevaluate(key),
        };
        let proxy = self.proxies.get_mut(key)?;
        if proxy.passes {
            proxy.included = true;
            Some(Change::update(key.clone(), proxy.item.clone(), previous.clone()))
        } else {
            proxy.included = false;
            Some(Change::remove(key.clone(), previous.clone()))
        }
    }

    /// Stops tracking `key`.
    ///
    /// Returns the Remove the downstream view needs (if it held the item)
    /// and the subscription handle to release.
    pub fn remove(&mut self, key: &K) -> (Option<Change<T, K>>, Option<H>) {
        match self.proxies.remove(key) {
            Some(proxy) => {
                let change = proxy
                    .included
                    .then(|| Change::remove(key.clone(), proxy.item.clone()));
                (change, proxy.handle)
            }
            None => (None, None),
        }
    }
}

impl<T, K, H> RefreshAware<T, K> for ProxyTable<T, K, H>
where
    T: Clone,
    K: Eq + Hash + Clone,
{
    type Output = T;

    fn on_refresh(&mut self, key: &K, current: &T) -> Option<Change<T, K>> {
        if let Some(proxy) = self.proxies.get_mut(key) {
            proxy.item = current.clone();
        }
        match self.reevaluate(key) {
            Some(change) => Some(change),
            None => {
                let proxy = self.proxies.get(key)?;
                proxy
                    .included
                    .then(|| Change::refresh(key.clone(), proxy.item.clone()))
            }
        }
    }
}
