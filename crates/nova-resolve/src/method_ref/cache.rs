//! Per-site resolution cache.
//!
//! Each site owns a slot holding one state per `allow_incomplete` flag. A slot moves from
//! `Uncomputed` to `InFlight` while one thread computes, then to `Cached`. Other threads asking
//! for the same site and version wait on the slot until the value is published; requests for
//! other sites only touch the map lock long enough to find their slot.
//!
//! Only requests that hold no slot of their own may wait. A nested request that finds another
//! thread's computation in flight computes its own unpublished copy instead, so two threads whose
//! sites depend on each other cannot block one another.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, RwLock};

use super::error::Cancelled;
use super::site::SiteId;
use super::MethodRefResolution;

/// How the computation handed to [`MethodRefCache::get_or_compute`] is being run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ComputeMode {
    /// The result will be published to the cache.
    Publish,
    /// The requesting site is older than what the cache already holds; the result is not stored.
    Stale,
    /// The current thread is already computing this site further up the stack.
    Reentrant,
    /// Another thread is computing this site and the caller may not wait for it; the result is
    /// not stored.
    Contended,
}

/// Result of one computation handed back to the cache.
#[derive(Debug)]
pub(crate) struct Computed {
    pub value: MethodRefResolution,
    /// `false` when the value depends on the request it was computed in (a broken cycle or a
    /// provisional target) and must not be shared.
    pub cacheable: bool,
}

impl From<MethodRefResolution> for Computed {
    fn from(value: MethodRefResolution) -> Self {
        Self {
            value,
            cacheable: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
enum SlotState {
    #[default]
    Uncomputed,
    InFlight {
        version: u64,
        owner: ThreadId,
    },
    Cached {
        version: u64,
        value: Arc<MethodRefResolution>,
    },
}

#[derive(Debug, Default)]
struct SiteSlot {
    /// Indexed by `allow_incomplete as usize`.
    states: Mutex<[SlotState; 2]>,
    published: Condvar,
}

/// Cache of method reference resolutions keyed by site, version and `allow_incomplete`.
#[derive(Debug, Default)]
pub struct MethodRefCache {
    slots: RwLock<HashMap<SiteId, Arc<SiteSlot>>>,
}

impl MethodRefCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached resolution of `site` at `version`, if any.
    pub fn get(
        &self,
        site: SiteId,
        version: u64,
        allow_incomplete: bool,
    ) -> Option<Arc<MethodRefResolution>> {
        let slot = self.slots.read().get(&site).cloned()?;
        let states = slot.states.lock();
        match &states[allow_incomplete as usize] {
            SlotState::Cached { version: v, value } if *v == version => Some(value.clone()),
            _ => None,
        }
    }

    /// Forget the cached resolutions of `site`; the next request recomputes.
    ///
    /// An in-flight computation is left alone; its result is still published.
    pub fn invalidate(&self, site: SiteId) {
        let Some(slot) = self.slots.read().get(&site).cloned() else {
            return;
        };
        let mut states = slot.states.lock();
        for state in states.iter_mut() {
            if matches!(state, SlotState::Cached { .. }) {
                *state = SlotState::Uncomputed;
            }
        }
    }

    /// Drop the slot of a site whose node no longer exists.
    pub fn remove(&self, site: SiteId) {
        if let Some(slot) = self.slots.write().remove(&site) {
            slot.published.notify_all();
        }
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .map(|slot| {
                slot.states
                    .lock()
                    .iter()
                    .filter(|state| matches!(state, SlotState::Cached { .. }))
                    .count()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.write().clear();
    }

    fn slot(&self, site: SiteId) -> Arc<SiteSlot> {
        if let Some(slot) = self.slots.read().get(&site) {
            return slot.clone();
        }
        self.slots.write().entry(site).or_default().clone()
    }

    /// Return the cached resolution of `site` at `version`, computing and publishing it if needed.
    ///
    /// Concurrent callers for the same key share one computation when `may_block` is set.
    /// `compute` is told whether its result will be stored; a cancelled or non-cacheable
    /// computation stores nothing and wakes any waiters so one of them can take over.
    pub(crate) fn get_or_compute<F>(
        &self,
        site: SiteId,
        version: u64,
        allow_incomplete: bool,
        may_block: bool,
        compute: F,
    ) -> Result<Arc<MethodRefResolution>, Cancelled>
    where
        F: FnOnce(ComputeMode) -> Result<Computed, Cancelled>,
    {
        let idx = allow_incomplete as usize;
        let me = thread::current().id();
        let slot = self.slot(site);

        let mut states = slot.states.lock();
        loop {
            match &states[idx] {
                SlotState::Cached { version: v, value } if *v == version => {
                    tracing::trace!(?site, version, "method reference cache hit");
                    return Ok(value.clone());
                }
                SlotState::Cached { version: v, .. } | SlotState::InFlight { version: v, .. }
                    if *v > version =>
                {
                    drop(states);
                    return compute(ComputeMode::Stale).map(|computed| Arc::new(computed.value));
                }
                SlotState::InFlight { version: v, owner } if *v == version && *owner == me => {
                    drop(states);
                    return compute(ComputeMode::Reentrant)
                        .map(|computed| Arc::new(computed.value));
                }
                SlotState::InFlight { version: v, .. } if *v == version && !may_block => {
                    drop(states);
                    tracing::trace!(?site, version, "site in flight elsewhere; computing locally");
                    return compute(ComputeMode::Contended)
                        .map(|computed| Arc::new(computed.value));
                }
                SlotState::InFlight { version: v, .. } if *v == version => {
                    slot.published.wait(&mut states);
                }
                _ => {
                    states[idx] = SlotState::InFlight { version, owner: me };
                    break;
                }
            }
        }
        drop(states);

        let mut flight = InFlightGuard {
            slot: &slot,
            idx,
            version,
            owner: me,
            done: false,
        };
        let computed = compute(ComputeMode::Publish)?;
        let value = Arc::new(computed.value);
        if computed.cacheable {
            flight.publish(value.clone());
        } else {
            flight.finish(SlotState::Uncomputed);
        }
        Ok(value)
    }
}

/// Resets a slot this thread claimed if the computation does not finish (cancellation or panic).
struct InFlightGuard<'a> {
    slot: &'a SiteSlot,
    idx: usize,
    version: u64,
    owner: ThreadId,
    done: bool,
}

impl InFlightGuard<'_> {
    fn publish(&mut self, value: Arc<MethodRefResolution>) {
        self.finish(SlotState::Cached {
            version: self.version,
            value,
        });
    }

    fn finish(&mut self, next: SlotState) {
        self.done = true;
        let mut states = self.slot.states.lock();
        let claimed = matches!(
            &states[self.idx],
            SlotState::InFlight { version, owner } if *version == self.version && *owner == self.owner
        );
        if claimed {
            states[self.idx] = next;
        }
        drop(states);
        self.slot.published.notify_all();
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.finish(SlotState::Uncomputed);
        }
    }
}
