//! Event Loop Implementation
//!
//! This module provides the task-deferral side of deferred values: the
//! [`TaskScheduler`] seam that settlement and `then` hand reactions to, and
//! [`EventLoop`], a FIFO task queue that runs them on a later turn.
//!
//! Tasks are drained in ticks. Each tick runs at most
//! `max_tasks_per_tick` tasks; tasks queued while a tick is running are
//! eligible for the same tick.

mod config;

pub use config::EventLoopConfig;

use crate::deferred::Capabilities;
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// A zero-argument callback deferred to a later turn
pub type Task = Box<dyn FnOnce()>;

/// Defers tasks to run later.
///
/// Implementations must run every task they are given, in the order they
/// were given, and never inside the `schedule` call itself.
pub trait TaskScheduler {
    /// Queue `task` to run on a later turn
    fn schedule(&self, task: Task);
}

impl<F> TaskScheduler for F
where
    F: Fn(Task),
{
    fn schedule(&self, task: Task) {
        self(task)
    }
}

/// Result of running the event loop to completion via `run_to_completion()`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Total number of tasks that were dequeued and run
    pub tasks_processed: usize,
    /// Number of ticks it took to empty the queue
    pub ticks: u64,
}

/// Runtime statistics for the event loop
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLoopStats {
    /// Total tasks handed to `schedule`
    pub total_tasks_scheduled: u64,
    /// Total tasks run across all ticks
    pub total_tasks_run: u64,
    /// Total number of ticks
    pub total_ticks: u64,
    /// Maximum tasks run in a single tick
    pub max_tasks_per_tick: u64,
}

/// The event loop owns the task queue and its execution order.
///
/// Share it as `Rc<EventLoop>`: deferred values keep a handle to it for as
/// long as they may still schedule reactions.
pub struct EventLoop {
    /// Pending tasks, oldest first
    task_queue: RefCell<VecDeque<Task>>,
    config: EventLoopConfig,
    stats: RefCell<EventLoopStats>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Create a new event loop with the default configuration
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Create a new event loop
    pub fn with_config(config: EventLoopConfig) -> Self {
        Self {
            task_queue: RefCell::new(VecDeque::new()),
            config,
            stats: RefCell::new(EventLoopStats::default()),
        }
    }

    /// The configuration this loop was built with
    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// Capabilities for deferred values scheduled on this loop, using the
    /// default duck-typed thenable check
    pub fn capabilities(self: &Rc<Self>) -> Capabilities {
        let scheduler: Rc<dyn TaskScheduler> = self.clone();
        Capabilities::new(scheduler)
    }

    /// Enqueue a closure as a task
    pub fn queue_task<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.schedule(Box::new(task));
    }

    /// Check if there are pending tasks
    pub fn has_pending_tasks(&self) -> bool {
        !self.task_queue.borrow().is_empty()
    }

    /// Number of tasks waiting to run
    pub fn pending_task_count(&self) -> usize {
        self.task_queue.borrow().len()
    }

    /// Dequeue the next task. The queue borrow ends before the task runs,
    /// so tasks are free to schedule more tasks.
    fn dequeue_task(&self) -> Option<Task> {
        self.task_queue.borrow_mut().pop_front()
    }

    /// Run one tick: up to `max_tasks_per_tick` tasks, oldest first.
    /// Returns the number of tasks run.
    pub fn run_tick(&self) -> usize {
        let budget = self.config.max_tasks_per_tick.max(1);
        let mut count: usize = 0;

        while count < budget {
            let Some(task) = self.dequeue_task() else {
                break;
            };
            task();
            count += 1;
        }

        let mut stats = self.stats.borrow_mut();
        stats.total_ticks += 1;
        stats.total_tasks_run += count as u64;
        if (count as u64) > stats.max_tasks_per_tick {
            stats.max_tasks_per_tick = count as u64;
        }
        trace!(tasks = count, remaining = self.pending_task_count(), "event loop tick");
        count
    }

    /// Run ticks until the queue is empty.
    ///
    /// Fails with a resource limit error when `max_ticks` is configured and
    /// the queue is still busy after that many ticks; tasks left in the
    /// queue stay queued.
    pub fn run_to_completion(&self) -> Result<RunResult> {
        let mut result = RunResult::default();

        while self.has_pending_tasks() {
            if let Some(limit) = self.config.max_ticks {
                if result.ticks >= limit {
                    warn!(
                        ticks = result.ticks,
                        pending = self.pending_task_count(),
                        "event loop tick limit reached"
                    );
                    return Err(Error::tick_limit_exceeded(result.ticks, limit));
                }
            }
            result.tasks_processed += self.run_tick();
            result.ticks += 1;
        }

        debug!(
            tasks = result.tasks_processed,
            ticks = result.ticks,
            "event loop ran to completion"
        );
        Ok(result)
    }

    /// Get a snapshot of the current event loop statistics.
    pub fn stats(&self) -> EventLoopStats {
        self.stats.borrow().clone()
    }

    /// Reset all event loop statistics to zero.
    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = EventLoopStats::default();
    }

    /// Drop all pending tasks without running them
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.task_queue.borrow_mut());
        debug!(dropped = dropped.len(), "event loop cleared");
    }
}

impl TaskScheduler for EventLoop {
    fn schedule(&self, task: Task) {
        self.task_queue.borrow_mut().push_back(task);
        self.stats.borrow_mut().total_tasks_scheduled += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder() -> Rc<RefCell<Vec<u32>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_new_loop_is_idle() {
        let el = EventLoop::new();
        assert!(!el.has_pending_tasks());
        assert_eq!(el.pending_task_count(), 0);
        assert_eq!(el.stats(), EventLoopStats::default());
    }

    #[test]
    fn test_schedule_does_not_run_task() {
        let el = EventLoop::new();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        el.queue_task(move || flag.set(true));

        assert!(!ran.get());
        assert!(el.has_pending_tasks());
        el.run_tick();
        assert!(ran.get());
    }

    #[test]
    fn test_tasks_run_in_fifo_order() {
        let el = EventLoop::new();
        let log = recorder();
        for i in 1..=3 {
            let log = log.clone();
            el.queue_task(move || {
                log.borrow_mut().push(i);
            });
        }

        let result = el.run_to_completion().unwrap();
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert_eq!(result.tasks_processed, 3);
        assert_eq!(result.ticks, 1);
    }

    #[test]
    fn test_tasks_scheduled_by_tasks_run_after_existing_ones() {
        let el = Rc::new(EventLoop::new());
        let log = recorder();

        let inner_log = log.clone();
        let inner_el = el.clone();
        el.queue_task(move || {
            inner_log.borrow_mut().push(1);
            let nested_log = inner_log.clone();
            inner_el.queue_task(move || {
                nested_log.borrow_mut().push(3);
            });
        });
        let second = log.clone();
        el.queue_task(move || {
            second.borrow_mut().push(2);
        });

        el.run_to_completion().unwrap();
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_tick_budget_splits_work() {
        let el = EventLoop::with_config(EventLoopConfig::default().with_max_tasks_per_tick(2));
        for _ in 0..5 {
            el.queue_task(|| {});
        }

        assert_eq!(el.run_tick(), 2);
        assert_eq!(el.pending_task_count(), 3);

        let result = el.run_to_completion().unwrap();
        assert_eq!(result.tasks_processed, 3);
        assert_eq!(result.ticks, 2);

        let stats = el.stats();
        assert_eq!(stats.total_tasks_scheduled, 5);
        assert_eq!(stats.total_tasks_run, 5);
        assert_eq!(stats.total_ticks, 3);
        assert_eq!(stats.max_tasks_per_tick, 2);
    }

    #[test]
    fn test_tick_limit_stops_runaway_loop() {
        fn requeue(el: Rc<EventLoop>) {
            let next = el.clone();
            el.queue_task(move || requeue(next));
        }

        let el = Rc::new(EventLoop::with_config(
            EventLoopConfig::default()
                .with_max_tasks_per_tick(1)
                .with_max_ticks(4),
        ));
        requeue(el.clone());

        let err = el.run_to_completion().unwrap_err();
        assert!(matches!(err, Error::ResourceLimitError { limit: 4, .. }));
        assert!(el.has_pending_tasks());

        el.clear();
        assert!(!el.has_pending_tasks());
    }

    #[test]
    fn test_reset_stats() {
        let el = EventLoop::new();
        el.queue_task(|| {});
        el.run_to_completion().unwrap();
        assert_ne!(el.stats(), EventLoopStats::default());

        el.reset_stats();
        assert_eq!(el.stats(), EventLoopStats::default());
    }

    #[test]
    fn test_closure_scheduler() {
        let queue: Rc<RefCell<Vec<Task>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = queue.clone();
        let scheduler = move |task: Task| {
            sink.borrow_mut().push(task);
        };

        let ran = Rc::new(Cell::new(0));
        let counter = ran.clone();
        scheduler.schedule(Box::new(move || counter.set(counter.get() + 1)));
        assert_eq!(ran.get(), 0);

        for task in queue.borrow_mut().drain(..) {
            task();
        }
        assert_eq!(ran.get(), 1);
    }
}
