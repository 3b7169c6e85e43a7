//! Prioritised task queue
//!
//! Panels never mutate the vehicle from their own thread of control; they
//! submit [`Task`]s which the control system's worker executes in priority
//! order. Equal priorities run first-in, first-out.

use crate::types::{Result, SimError};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Task priority, lower value runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Emergency = 0,
    High = 1,
    Normal = 2,
    Background = 3,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Emergency => write!(f, "emergency"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Normal => write!(f, "normal"),
            TaskPriority::Background => write!(f, "background"),
        }
    }
}

type Action = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

/// A one-shot unit of work submitted to the control system
pub struct Task {
    pub name: String,
    pub priority: TaskPriority,
    action: Action,
}

impl Task {
    pub fn new<F>(name: impl Into<String>, priority: TaskPriority, action: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            priority,
            action: Box::new(action),
        }
    }

    /// Execute the task, consuming it
    pub fn run(self) -> Result<()> {
        (self.action)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Heap entry: ordered by priority, then by submission sequence
struct QueuedTask {
    seq: u64,
    task: Task,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    // BinaryHeap is a max-heap: the "greatest" entry is the most urgent one.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .task
            .priority
            .cmp(&self.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueState {
    heap: BinaryHeap<QueuedTask>,
    next_seq: u64,
}

/// Bounded priority queue shared between submitters and the worker thread
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    capacity: usize,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Submit a task; fails with [`SimError::QueueFull`] at capacity
    pub fn push(&self, task: Task) -> Result<()> {
        let mut state = self.lock();
        if state.heap.len() >= self.capacity {
            return Err(SimError::QueueFull(state.heap.len(), task.name));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(QueuedTask { seq, task });
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Take the most urgent task without waiting
    pub fn try_pop(&self) -> Option<Task> {
        self.lock().heap.pop().map(|q| q.task)
    }

    /// Take the most urgent task, waiting up to `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Task> {
        let state = self.lock();
        let (mut state, _) = self
            .available
            .wait_timeout_while(state, timeout, |s| s.heap.is_empty())
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.heap.pop().map(|q| q.task)
    }

    /// Drop every pending task, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.heap.len();
        state.heap.clear();
        dropped
    }

    /// Wake every thread blocked in [`TaskQueue::pop_timeout`]
    pub fn notify_all(&self) {
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
