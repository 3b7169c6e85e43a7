//! Vehicle control system
//!
//! Owns the shared [`VehicleState`] and the task queue, and runs the three
//! timer threads of the simulation:
//!
//! - **task worker**: executes submitted [`Task`]s in priority order
//! - **speed loop**: advances the speed ramp every `speed_update_interval`
//! - **metrics loop**: advances engine metrics every `metrics_update_interval`
//!
//! [`VehicleControl`] is a cheap, cloneable handle. ADAS, infotainment and
//! the dashboard each hold a clone; every state access goes through one lock.
//!
//! # Example
//!
//! ```no_run
//! use vehicle_sim::{SimConfig, VehicleControl};
//!
//! let control = VehicleControl::new(SimConfig::default()).unwrap();
//! control.start().unwrap();
//! control.set_target_speed(80.0).unwrap();
//! // ... read control.get_metrics() on a UI timer ...
//! control.stop();
//! ```

use crate::config::SimConfig;
use crate::dynamics::VehicleState;
use crate::event_log::EventLog;
use crate::tasks::{Task, TaskQueue};
use crate::types::{DrivingMode, Result, SimError, VehicleMetrics};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the task worker waits for work before re-checking for shutdown
const TASK_POLL_TIMEOUT: Duration = Duration::from_millis(100);

struct Shared {
    config: SimConfig,
    state: Mutex<VehicleState>,
    tasks: TaskQueue,
    log: EventLog,
    running: AtomicBool,
    stop_requested: Mutex<bool>,
    stop_signal: Condvar,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to the vehicle control system
#[derive(Clone)]
pub struct VehicleControl {
    shared: Arc<Shared>,
}

impl VehicleControl {
    /// Create a control system; fails if `config` is not drivable
    pub fn new(config: SimConfig) -> Result<Self> {
        let log = EventLog::new(config.event_log_capacity);
        Self::with_event_log(config, log)
    }

    /// Create a control system that records into an existing event log
    pub fn with_event_log(config: SimConfig, log: EventLog) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config, log))
    }

    fn from_validated(config: SimConfig, log: EventLog) -> Self {
        let tasks = TaskQueue::new(config.max_queue_size);
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(VehicleState::new()),
                tasks,
                log,
                running: AtomicBool::new(false),
                stop_requested: Mutex::new(false),
                stop_signal: Condvar::new(),
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.shared.config
    }

    /// The system message log shared by every panel
    pub fn event_log(&self) -> &EventLog {
        &self.shared.log
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Spawn the worker threads. Calling `start` on a running system is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut workers = lock(&self.shared.workers);
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        *lock(&self.shared.stop_requested) = false;

        let loops: [(&str, fn(&Shared)); 3] = [
            ("vehicle-tasks", Shared::run_task_worker),
            ("vehicle-speed", Shared::run_speed_loop),
            ("vehicle-metrics", Shared::run_metrics_loop),
        ];

        for (name, body) in loops {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(name.to_string())
                .spawn(move || body(&shared));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(workers);
                    self.stop();
                    return Err(SimError::IoError(e));
                }
            }
        }

        self.shared.log.info("Vehicle control system started");
        Ok(())
    }

    /// Signal the worker threads, drop pending tasks and join the threads.
    /// Calling `stop` on a stopped system is a no-op.
    pub fn stop(&self) {
        // Handles leave the lock before joining so a task calling `stop`
        // cannot block on it.
        let workers = {
            let mut workers = lock(&self.shared.workers);
            if !self.shared.running.swap(false, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *workers)
        };

        let dropped = self.shared.tasks.clear();
        if dropped > 0 {
            log::debug!("Dropped {} pending task(s) on shutdown", dropped);
        }

        *lock(&self.shared.stop_requested) = true;
        self.shared.stop_signal.notify_all();
        self.shared.tasks.notify_all();

        let current = thread::current().id();
        for handle in workers {
            // A task may stop the system from the worker thread itself.
            if handle.thread().id() == current {
                continue;
            }
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                self.shared.log.error(format!("Thread {} panicked", name));
            }
        }

        self.shared.log.info("Vehicle control system stopped");
    }

    /// Set the target speed; returns the clamped value actually applied
    pub fn set_target_speed(&self, speed: f64) -> Result<f64> {
        let applied = self.with_state(|state| state.set_target_speed(speed, &self.shared.config))?;
        log::debug!("Target speed set to {:.1} km/h", applied);
        Ok(applied)
    }

    /// Jump the current speed; returns the clamped value actually applied
    pub fn set_current_speed(&self, speed: f64) -> Result<f64> {
        self.with_state(|state| state.set_current_speed(speed, &self.shared.config))
    }

    pub fn set_driving_mode(&self, mode: DrivingMode) {
        self.with_state(|state| state.set_driving_mode(mode));
        self.shared.log.info(format!("Driving mode set to {}", mode));
    }

    /// Bring the vehicle to a stop and latch the brake hold
    pub fn emergency_brake(&self) {
        self.with_state(|state| state.emergency_brake());
        self.shared.log.warning("Emergency brake engaged");
    }

    /// Release a latched brake hold; returns whether one was active
    pub fn release_brake_hold(&self) -> bool {
        let released = self.with_state(|state| state.release_brake_hold());
        if released {
            self.shared.log.info("Emergency brake released");
        }
        released
    }

    /// Set the fuel level (clamped to 0..=100); returns the applied level
    pub fn set_fuel_level(&self, level: f64) -> f64 {
        self.with_state(|state| state.set_fuel_level(level))
    }

    /// Copy of the current metrics
    pub fn get_metrics(&self) -> VehicleMetrics {
        self.with_state(|state| state.metrics())
    }

    /// Copy of the whole vehicle state
    pub fn snapshot(&self) -> VehicleState {
        self.with_state(|state| state.clone())
    }

    pub fn current_speed(&self) -> f64 {
        self.with_state(|state| state.current_speed())
    }

    pub fn target_speed(&self) -> f64 {
        self.with_state(|state| state.target_speed())
    }

    pub fn driving_mode(&self) -> DrivingMode {
        self.with_state(|state| state.driving_mode())
    }

    pub fn assisted_speed(&self) -> f64 {
        self.with_state(|state| state.assisted_speed())
    }

    pub fn is_emergency_braking(&self) -> bool {
        self.with_state(|state| state.is_emergency_braking())
    }

    pub fn is_brake_held(&self) -> bool {
        self.with_state(|state| state.is_brake_held())
    }

    /// Submit a task to the worker. A full queue drops the task with a warning.
    pub fn add_task(&self, task: Task) -> Result<()> {
        log::trace!("Queueing task '{}' ({})", task.name, task.priority);
        self.shared.tasks.push(task).map_err(|e| {
            self.shared.log.warning(format!("Task queue full, dropping task: {}", e));
            e
        })
    }

    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.len()
    }

    /// Execute queued tasks on the calling thread until the queue is empty.
    /// Returns the number of tasks executed.
    pub fn run_pending_tasks(&self) -> usize {
        let mut executed = 0;
        while let Some(task) = self.shared.tasks.try_pop() {
            self.shared.execute(task);
            executed += 1;
        }
        executed
    }

    /// Advance one speed tick on the calling thread
    pub fn step_speed(&self) {
        self.shared.step_speed();
    }

    /// Advance one metrics tick on the calling thread
    pub fn step_metrics(&self) {
        self.shared.step_metrics();
    }

    /// Advance one speed tick and one metrics tick on the calling thread
    pub fn step(&self) {
        self.step_speed();
        self.step_metrics();
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut VehicleState) -> R) -> R {
        f(&mut lock(&self.shared.state))
    }
}

impl Default for VehicleControl {
    fn default() -> Self {
        let config = SimConfig::default();
        let log = EventLog::new(config.event_log_capacity);
        Self::from_validated(config, log)
    }
}

impl Shared {
    fn run_task_worker(&self) {
        log::debug!("Task worker started");
        while self.running.load(Ordering::SeqCst) {
            if let Some(task) = self.tasks.pop_timeout(TASK_POLL_TIMEOUT) {
                self.execute(task);
                if !self.sleep_unless_stopped(self.config.task_rate_limit()) {
                    break;
                }
            }
        }
        log::debug!("Task worker exited");
    }

    fn run_speed_loop(&self) {
        let interval = self.config.speed_update_interval();
        while self.sleep_unless_stopped(interval) {
            self.step_speed();
        }
        log::debug!("Speed loop exited");
    }

    fn run_metrics_loop(&self) {
        let interval = self.config.metrics_update_interval();
        while self.sleep_unless_stopped(interval) {
            self.step_metrics();
        }
        log::debug!("Metrics loop exited");
    }

    fn step_speed(&self) {
        lock(&self.state).step_speed(&self.config);
    }

    fn step_metrics(&self) {
        lock(&self.state).step_metrics(&self.config);
    }

    /// Run a task, logging failures and panics instead of propagating them
    fn execute(&self, task: Task) {
        let name = task.name.clone();
        log::trace!("Executing task '{}'", name);

        match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.log.error(format!("Error executing task {}: {}", name, e)),
            Err(_) => self.log.error(format!("Error executing task {}: task panicked", name)),
        }
    }

    /// Sleep for `duration` or until a stop is requested.
    /// Returns `false` when the caller should exit.
    fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        let stop_requested = lock(&self.stop_requested);
        let (stop_requested, _) = self
            .stop_signal
            .wait_timeout_while(stop_requested, duration, |stop| !*stop)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !*stop_requested
    }
}

// State mutations are single assignments, so a poisoned lock still holds
// consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskPriority;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[test]
    fn test_step_drives_speed_and_metrics() {
        let control = VehicleControl::default();
        control.set_target_speed(40.0).unwrap();
        for _ in 0..10 {
            control.step();
        }

        let metrics = control.get_metrics();
        assert!((metrics.current_speed - 3.0).abs() < 1e-9);
        assert_eq!(metrics.rpm, 800 + 150);
    }

    #[test]
    fn test_run_pending_tasks_in_priority_order() {
        let control = VehicleControl::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (name, priority) in [
            ("media", TaskPriority::Background),
            ("brake", TaskPriority::Emergency),
            ("acc", TaskPriority::High),
        ] {
            let order = Arc::clone(&order);
            control
                .add_task(Task::new(name, priority, move || {
                    order.lock().unwrap().push(name);
                    Ok(())
                }))
                .unwrap();
        }

        assert_eq!(control.pending_tasks(), 3);
        assert_eq!(control.run_pending_tasks(), 3);
        assert_eq!(*order.lock().unwrap(), vec!["brake", "acc", "media"]);
    }

    #[test]
    fn test_failing_task_is_logged() {
        let control = VehicleControl::default();
        control
            .add_task(Task::new("Broken", TaskPriority::Normal, || {
                Err(SimError::NoTracks)
            }))
            .unwrap();
        control
            .add_task(Task::new("Panicky", TaskPriority::Normal, || panic!("boom")))
            .unwrap();

        control.run_pending_tasks();
        assert!(control.event_log().contains("Error executing task Broken: No tracks available"));
        assert!(control.event_log().contains("Error executing task Panicky: task panicked"));
    }

    #[test]
    fn test_full_queue_drops_with_warning() {
        let control = VehicleControl::new(SimConfig::new().with_max_queue_size(1)).unwrap();
        control.add_task(Task::new("one", TaskPriority::Normal, || Ok(()))).unwrap();

        let result = control.add_task(Task::new("two", TaskPriority::Normal, || Ok(())));
        assert!(matches!(result, Err(SimError::QueueFull(1, _))));
        assert!(control.event_log().contains("Task queue full"));
        assert_eq!(control.pending_tasks(), 1);
    }

    #[test]
    fn test_emergency_brake_and_release() {
        let control = VehicleControl::default();
        control.set_current_speed(90.0).unwrap();
        control.emergency_brake();

        assert_eq!(control.current_speed(), 0.0);
        assert!(control.is_brake_held());
        assert!(matches!(control.set_target_speed(50.0), Err(SimError::EmergencyBrakeActive)));

        assert!(control.release_brake_hold());
        control.step_speed();
        assert!(!control.is_emergency_braking());
        assert_eq!(control.set_target_speed(50.0).unwrap(), 50.0);
    }

    #[test]
    fn test_start_stop_are_idempotent() {
        let config = SimConfig::new()
            .with_intervals(Duration::from_millis(5), Duration::from_millis(5))
            .with_task_rate_limit(Duration::ZERO);
        let control = VehicleControl::new(config).unwrap();

        control.start().unwrap();
        control.start().unwrap();
        assert!(control.is_running());

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        control
            .add_task(Task::new("count", TaskPriority::High, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while hits.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        control.stop();
        control.stop();
        assert!(!control.is_running());

        let starts = control
            .event_log()
            .entries()
            .iter()
            .filter(|e| e.message == "Vehicle control system started")
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = VehicleControl::new(SimConfig::new().with_max_speed(f64::NAN));
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
        assert!(VehicleControl::new(SimConfig::new().with_max_speed(-1.0)).is_err());
    }

    #[test]
    fn test_stop_clears_pending_tasks() {
        let control = VehicleControl::new(SimConfig::new().with_task_rate_limit(Duration::ZERO)).unwrap();
        control.start().unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        control
            .add_task(Task::new("slow", TaskPriority::Emergency, move || {
                let _ = started_tx.send(());
                thread::sleep(Duration::from_millis(300));
                Ok(())
            }))
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = Arc::clone(&hits);
            control
                .add_task(Task::new("media", TaskPriority::Background, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .unwrap();
        }
        assert_eq!(control.pending_tasks(), 3);

        control.stop();
        assert_eq!(control.pending_tasks(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_task_may_stop_during_shutdown() {
        let control = VehicleControl::new(SimConfig::new().with_task_rate_limit(Duration::ZERO)).unwrap();
        control.start().unwrap();

        let (entered_tx, entered_rx) = mpsc::channel();
        let inner = control.clone();
        control
            .add_task(Task::new("shutdown", TaskPriority::Emergency, move || {
                let _ = entered_tx.send(());
                thread::sleep(Duration::from_millis(50));
                inner.stop();
                Ok(())
            }))
            .unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Stop from another thread while the task is still running
        let (done_tx, done_rx) = mpsc::channel();
        let outer = control.clone();
        thread::spawn(move || {
            outer.stop();
            let _ = done_tx.send(());
        });

        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(!control.is_running());
    }
}
