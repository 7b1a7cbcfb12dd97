use std::collections::HashMap;
use std::time::Instant;

pub type DeferredTaskId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredTask<T> {
    pub due: Instant,
    pub payload: T,
}

/// Cancellable one-shot timers driven by an injected clock.
#[derive(Debug)]
pub struct DeferredScheduler<T> {
    next_task_id: DeferredTaskId,
    tasks: HashMap<DeferredTaskId, DeferredTask<T>>,
}

impl<T> Default for DeferredScheduler<T> {
    fn default() -> Self {
        Self {
            next_task_id: 0,
            tasks: HashMap::new(),
        }
    }
}

impl<T> DeferredScheduler<T> {
    pub fn register(&mut self, due: Instant, payload: T) -> DeferredTaskId {
        self.next_task_id = self
            .next_task_id
            .checked_add(1)
            .expect("deferred scheduler task id space exhausted");
        self.tasks
            .insert(self.next_task_id, DeferredTask { due, payload });
        self.next_task_id
    }

    pub fn cancel(&mut self, task_id: DeferredTaskId) -> bool {
        self.tasks.remove(&task_id).is_some()
    }

    pub fn task(&self, task_id: DeferredTaskId) -> Option<&DeferredTask<T>> {
        self.tasks.get(&task_id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.values().map(|task| task.due).min()
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(DeferredTaskId, T)> {
        let mut due_ids = self
            .tasks
            .iter()
            .filter(|(_, task)| task.due <= now)
            .map(|(task_id, task)| (task.due, *task_id))
            .collect::<Vec<_>>();
        due_ids.sort_unstable();

        due_ids
            .into_iter()
            .filter_map(|(_, task_id)| {
                self.tasks
                    .remove(&task_id)
                    .map(|task| (task_id, task.payload))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn take_due_returns_only_expired_tasks_in_deadline_order() {
        let start = Instant::now();
        let mut scheduler = DeferredScheduler::default();
        let late = scheduler.register(start + Duration::from_millis(30), "late");
        let early = scheduler.register(start + Duration::from_millis(10), "early");
        scheduler.register(start + Duration::from_millis(500), "future");

        let fired = scheduler.take_due(start + Duration::from_millis(30));

        assert_eq!(fired, vec![(early, "early"), (late, "late")]);
        assert_eq!(scheduler.task_count(), 1);
        assert_eq!(
            scheduler.next_due(),
            Some(start + Duration::from_millis(500))
        );
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let start = Instant::now();
        let mut scheduler = DeferredScheduler::default();
        let task_id = scheduler.register(start, 1_u8);

        assert!(scheduler.cancel(task_id));
        assert!(!scheduler.cancel(task_id));
        assert!(scheduler.task(task_id).is_none());
        assert!(scheduler.take_due(start + Duration::from_secs(1)).is_empty());
    }

    #[test]
    #[should_panic(expected = "deferred scheduler task id space exhausted")]
    fn register_panics_when_task_id_space_is_exhausted() {
        let mut scheduler = DeferredScheduler {
            next_task_id: u64::MAX,
            tasks: HashMap::new(),
        };

        let _ = scheduler.register(Instant::now(), ());
    }
}
