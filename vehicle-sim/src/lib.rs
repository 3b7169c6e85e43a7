//! Vehicle Dashboard Simulator Library
//!
//! Simulation core for an automotive dashboard: vehicle controls, ADAS,
//! infotainment and diagnostics, with speed and engine metrics driven by
//! background timer threads.
//!
//! # Architecture
//!
//! - [`VehicleControl`] owns the shared vehicle state behind a mutex, a
//!   bounded priority task queue and three worker threads (task worker,
//!   speed loop, metrics loop)
//! - [`Adas`] and [`Infotainment`] submit their work as tasks to the control
//!   system
//! - [`Dashboard`] polls the control system on the front-end's timer and
//!   produces a [`DashboardFrame`] per refresh
//! - Every subsystem reports to a shared in-memory [`EventLog`], mirrored to
//!   the `log` facade
//!
//! The library does NOT:
//! - Render anything
//! - Play audio
//! - Draw maps
//!
//! Everything that runs on a worker thread can also be stepped on the
//! caller's thread ([`VehicleControl::step`],
//! [`VehicleControl::run_pending_tasks`]), so tests need no sleeps.
//!
//! # Example Usage
//!
//! ```no_run
//! use vehicle_sim::{Adas, AdasConfig, Dashboard, SimConfig, VehicleControl};
//!
//! let control = VehicleControl::new(SimConfig::new().with_max_speed(160.0)).unwrap();
//! control.start().unwrap();
//!
//! let adas = Adas::new(control.clone(), AdasConfig::default());
//! adas.enable_adaptive_cruise().unwrap();
//! control.set_target_speed(90.0).unwrap();
//!
//! let mut dashboard = Dashboard::new(control.clone());
//! for _ in 0..50 {
//!     let frame = dashboard.refresh(Some(&adas), None);
//!     println!("{:.1} km/h, {} rpm", frame.metrics.current_speed, frame.metrics.rpm);
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//!
//! control.stop();
//! ```

// Public modules
pub mod adas;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod diagnostics;
pub mod dynamics;
pub mod environment;
pub mod event_log;
pub mod infotainment;
pub mod tasks;
pub mod types;

// Re-export main types for convenience
pub use adas::{Adas, AdasStatus};
pub use config::{AdasConfig, InfotainmentConfig, SimConfig};
pub use control::VehicleControl;
pub use dashboard::{validate_speed_input, Dashboard, DashboardFrame};
pub use diagnostics::{DiagnosticsReport, FuelStatus, Warning};
pub use dynamics::VehicleState;
pub use environment::{Environment, FixedEnvironment, SinusoidalEnvironment};
pub use event_log::EventLog;
pub use infotainment::{Infotainment, NowPlaying, RepeatMode, Route, TrackInfo, Traffic};
pub use tasks::{Task, TaskPriority, TaskQueue};
pub use types::{DrivingMode, LogEntry, Result, Severity, SimError, Timestamp, VehicleMetrics};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
