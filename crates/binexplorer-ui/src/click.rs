//! Single versus double activation on list items.
//!
//! The first activation of an item arms a deferred task due one window
//! later. A second activation before the task fires cancels it and resolves
//! a double right away; otherwise the task resolves a single. Every gesture
//! resolves exactly once, and items never share a burst.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::scheduler::{DeferredScheduler, DeferredTaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture<K> {
    Single(K),
    Double(K),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstState {
    AwaitingSecond {
        task_id: DeferredTaskId,
        deadline: Instant,
    },
}

#[derive(Debug)]
pub struct ClickDisambiguator<K> {
    window: Duration,
    bursts: HashMap<K, BurstState>,
    scheduler: DeferredScheduler<K>,
}

impl<K> ClickDisambiguator<K>
where
    K: Clone + Eq + Hash + std::fmt::Debug,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            bursts: HashMap::new(),
            scheduler: DeferredScheduler::default(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records one raw activation of `item` at `now`.
    ///
    /// An activation landing on a burst whose deadline already passed first
    /// resolves that burst as a single, then opens a new one.
    pub fn observe(&mut self, item: K, now: Instant) -> Vec<Gesture<K>> {
        match self.bursts.remove(&item) {
            Some(BurstState::AwaitingSecond { task_id, deadline }) if now < deadline => {
                self.scheduler.cancel(task_id);
                tracing::debug!(?item, "activation resolved as double");
                vec![Gesture::Double(item)]
            }
            Some(BurstState::AwaitingSecond { task_id, .. }) => {
                self.scheduler.cancel(task_id);
                self.arm(item.clone(), now);
                vec![Gesture::Single(item)]
            }
            None => {
                self.arm(item, now);
                Vec::new()
            }
        }
    }

    /// Resolves every burst whose window elapsed at or before `now`.
    pub fn poll_expired(&mut self, now: Instant) -> Vec<Gesture<K>> {
        let mut gestures = Vec::new();
        for (task_id, item) in self.scheduler.take_due(now) {
            match self.bursts.get(&item) {
                Some(BurstState::AwaitingSecond {
                    task_id: current, ..
                }) if *current == task_id => {
                    self.bursts.remove(&item);
                    gestures.push(Gesture::Single(item));
                }
                _ => {
                    tracing::warn!(?item, task_id, "ignoring deferred activation for untracked item");
                }
            }
        }
        gestures
    }

    /// Drops the pending burst of `item` without resolving it.
    pub fn forget(&mut self, item: &K) -> bool {
        match self.bursts.remove(item) {
            Some(BurstState::AwaitingSecond { task_id, .. }) => {
                self.scheduler.cancel(task_id);
                true
            }
            None => false,
        }
    }

    pub fn pending(&self, item: &K) -> bool {
        self.bursts.contains_key(item)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    fn arm(&mut self, item: K, now: Instant) {
        let deadline = now + self.window;
        let task_id = self.scheduler.register(deadline, item.clone());
        self.bursts
            .insert(item, BurstState::AwaitingSecond { task_id, deadline });
    }
}
