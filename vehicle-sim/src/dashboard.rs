//! Dashboard refresh logic
//!
//! The front-end polls [`Dashboard::refresh`] on its own timer. Each refresh
//! reads a consistent snapshot of the vehicle, burns fuel for the elapsed
//! refresh period and assembles everything the panels display into a
//! [`DashboardFrame`].

use crate::adas::{Adas, AdasStatus};
use crate::control::VehicleControl;
use crate::diagnostics::{DiagnosticsReport, FuelStatus};
use crate::dynamics::SPEED_TOLERANCE;
use crate::infotainment::{Infotainment, Navigation, NowPlaying};
use crate::types::{DrivingMode, LogEntry, Result, SimError, VehicleMetrics, RPM_FULL_SCALE};

/// Fuel burnt per refresh at 100 km/h (percent)
const FUEL_PER_REFRESH_AT_100: f64 = 0.1;

/// Number of system messages carried in each frame
const DEFAULT_MESSAGE_COUNT: usize = 5;

/// Parse and range-check a speed typed by the driver
pub fn validate_speed_input(input: &str, max_speed: f64) -> Result<f64> {
    let speed: f64 = input
        .trim()
        .parse()
        .map_err(|_| SimError::InvalidInput(format!("'{}' is not a valid number", input.trim())))?;

    if !(0.0..=max_speed).contains(&speed) {
        return Err(SimError::InvalidSpeed(speed, max_speed));
    }
    Ok(speed)
}

/// Everything the panels show for one refresh
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardFrame {
    pub metrics: VehicleMetrics,
    /// RPM gauge position, 0.0 to 1.0
    pub rpm_fraction: f64,
    pub target_speed: f64,
    pub driving_mode: DrivingMode,
    pub brake_held: bool,
    pub diagnostics: DiagnosticsReport,
    pub adas: Option<AdasStatus>,
    pub now_playing: Option<NowPlaying>,
    pub navigation: Option<Navigation>,
    /// Most recent system messages, oldest first
    pub messages: Vec<LogEntry>,
}

/// Polls the control system and derives display state
pub struct Dashboard {
    control: VehicleControl,
    message_count: usize,
    last_fuel_status: FuelStatus,
}

impl Dashboard {
    pub fn new(control: VehicleControl) -> Self {
        let last_fuel_status = FuelStatus::classify(control.get_metrics().fuel);
        Self {
            control,
            message_count: DEFAULT_MESSAGE_COUNT,
            last_fuel_status,
        }
    }

    /// Builder method: number of system messages per frame
    pub fn with_message_count(mut self, count: usize) -> Self {
        self.message_count = count;
        self
    }

    /// Take a snapshot, consume fuel for this refresh and build a frame
    pub fn refresh(&mut self, adas: Option<&Adas>, infotainment: Option<&Infotainment>) -> DashboardFrame {
        let state = self.control.snapshot();
        let mut metrics = state.metrics();

        let consumption = (metrics.current_speed / 100.0) * FUEL_PER_REFRESH_AT_100;
        metrics.fuel = self.control.set_fuel_level(metrics.fuel - consumption);

        let diagnostics = DiagnosticsReport::from_metrics(&metrics);
        if diagnostics.fuel_status == FuelStatus::Low && self.last_fuel_status != FuelStatus::Low {
            self.control.event_log().warning(format!("Low Fuel Warning! {:.1}% remaining", metrics.fuel));
        }
        self.last_fuel_status = diagnostics.fuel_status;

        DashboardFrame {
            metrics,
            rpm_fraction: (metrics.rpm as f64 / RPM_FULL_SCALE).clamp(0.0, 1.0),
            target_speed: state.target_speed(),
            driving_mode: state.driving_mode(),
            brake_held: state.is_brake_held(),
            diagnostics,
            adas: adas.map(Adas::status),
            now_playing: infotainment.and_then(Infotainment::current_track_info),
            navigation: infotainment.map(|i| i.navigation().clone()),
            messages: self.control.event_log().recent(self.message_count),
        }
    }

    /// Follow a speed transition: keep commanding `target` until the vehicle
    /// is within tolerance, then snap to it exactly.
    ///
    /// Returns `Ok(true)` once the speed has settled.
    pub fn settle_speed(&self, target: f64) -> Result<bool> {
        let current = self.control.current_speed();
        if (target - current).abs() > SPEED_TOLERANCE {
            self.control.set_target_speed(target)?;
            Ok(false)
        } else {
            self.control.set_current_speed(target)?;
            Ok(true)
        }
    }
}
