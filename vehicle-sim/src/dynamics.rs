//! Vehicle dynamics
//!
//! Pure state transitions for speed and engine metrics. Nothing in here
//! sleeps, locks or reads a clock: the control system calls these methods
//! from its timer threads while holding the state lock, and tests call them
//! directly.

use crate::config::SimConfig;
use crate::types::{DrivingMode, Result, SimError, VehicleMetrics, IDLE_RPM, RPM_FULL_SCALE};

/// Speed differences at or below this are considered "at target" (km/h)
pub const SPEED_TOLERANCE: f64 = 0.1;

/// Fraction of the remaining speed difference applied per tick
const RAMP_GAIN: f64 = 0.05;

/// Fraction of the current speed shed per tick while emergency braking
const EMERGENCY_GAIN: f64 = 0.1;

/// Below this the vehicle is considered stopped while emergency braking
const STOP_EPSILON: f64 = 0.01;

/// RPM gained per km/h
const RPM_PER_KMH: f64 = 50.0;

/// Mutable vehicle state guarded by the control system lock
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    current_speed: f64,
    target_speed: f64,
    driving_mode: DrivingMode,
    assisted_speed: f64,
    emergency_braking: bool,
    brake_hold: bool,
    metrics: VehicleMetrics,
}

impl VehicleState {
    pub fn new() -> Self {
        Self {
            current_speed: 0.0,
            target_speed: 0.0,
            driving_mode: DrivingMode::Manual,
            assisted_speed: 0.0,
            emergency_braking: false,
            brake_hold: false,
            metrics: VehicleMetrics::default(),
        }
    }

    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    pub fn driving_mode(&self) -> DrivingMode {
        self.driving_mode
    }

    /// Speed captured when the Assisted mode was last entered
    pub fn assisted_speed(&self) -> f64 {
        self.assisted_speed
    }

    /// True while the vehicle is being brought to a stop by the brake
    pub fn is_emergency_braking(&self) -> bool {
        self.emergency_braking
    }

    /// True from an emergency brake until the hold is released
    pub fn is_brake_held(&self) -> bool {
        self.brake_hold
    }

    pub fn metrics(&self) -> VehicleMetrics {
        self.metrics
    }

    /// Advance the speed ramp by one tick
    pub fn step_speed(&mut self, config: &SimConfig) {
        if self.emergency_braking {
            let deceleration =
                (config.emergency_deceleration_rate).min(self.current_speed * EMERGENCY_GAIN);
            self.current_speed = (self.current_speed - deceleration).max(0.0);
            if self.current_speed < STOP_EPSILON {
                self.current_speed = 0.0;
                self.emergency_braking = false;
            }
        } else {
            let speed_diff = self.target_speed - self.current_speed;
            if speed_diff.abs() > SPEED_TOLERANCE {
                let change = if speed_diff > 0.0 {
                    config.acceleration_rate.min(speed_diff * RAMP_GAIN)
                } else {
                    (-config.deceleration_rate).max(speed_diff * RAMP_GAIN)
                };
                self.current_speed = clamp_speed(self.current_speed + change, config.max_speed);
            }
        }

        self.metrics.current_speed = self.current_speed;
    }

    /// Advance the engine metrics by one tick
    pub fn step_metrics(&mut self, config: &SimConfig) {
        let rpm = IDLE_RPM as f64 + self.current_speed * RPM_PER_KMH;
        self.metrics.rpm = rpm as u32;

        let load = self.metrics.rpm as f64 / RPM_FULL_SCALE;

        let target_temp = 90.0 + load * 20.0;
        self.metrics.temp += (target_temp - self.metrics.temp) * config.temp_smoothing;

        let target_voltage = 12.0 - load * 0.5;
        self.metrics.voltage += (target_voltage - self.metrics.voltage) * config.voltage_smoothing;

        let target_oil = 45.0 + load * 15.0;
        self.metrics.oil += (target_oil - self.metrics.oil) * config.oil_smoothing;
    }

    /// Set the speed the ramp converges to; returns the clamped target
    ///
    /// A target of exactly zero stops the vehicle immediately.
    pub fn set_target_speed(&mut self, speed: f64, config: &SimConfig) -> Result<f64> {
        self.ensure_speed_control()?;
        let speed = validate_speed(speed, config)?;

        self.target_speed = speed;
        if speed == 0.0 {
            self.current_speed = 0.0;
            self.metrics.current_speed = 0.0;
        }
        Ok(speed)
    }

    /// Jump the current speed directly; returns the clamped speed
    pub fn set_current_speed(&mut self, speed: f64, config: &SimConfig) -> Result<f64> {
        self.ensure_speed_control()?;
        let speed = validate_speed(speed, config)?;

        self.current_speed = speed;
        self.metrics.current_speed = speed;
        Ok(speed)
    }

    pub fn set_driving_mode(&mut self, mode: DrivingMode) {
        self.driving_mode = mode;
        if mode == DrivingMode::Assisted {
            self.assisted_speed = self.current_speed;
        }
    }

    /// Stop the vehicle and latch the brake hold
    pub fn emergency_brake(&mut self) {
        self.emergency_braking = true;
        self.brake_hold = true;
        self.target_speed = 0.0;
        self.current_speed = 0.0;
        self.metrics.current_speed = 0.0;
    }

    /// Release the brake hold; returns whether a hold was active
    pub fn release_brake_hold(&mut self) -> bool {
        std::mem::replace(&mut self.brake_hold, false)
    }

    /// Set the fuel level, clamped to 0..=100 percent
    pub fn set_fuel_level(&mut self, level: f64) -> f64 {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 100.0) };
        self.metrics.fuel = level;
        level
    }

    fn ensure_speed_control(&self) -> Result<()> {
        if self.emergency_braking || self.brake_hold {
            return Err(SimError::EmergencyBrakeActive);
        }
        Ok(())
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_speed(speed: f64, config: &SimConfig) -> Result<f64> {
    if !(config.max_speed.is_finite() && config.max_speed > 0.0) {
        return Err(SimError::InvalidConfig(format!(
            "max_speed must be a positive number, got {}",
            config.max_speed
        )));
    }
    if speed.is_nan() {
        return Err(SimError::InvalidSpeed(speed, config.max_speed));
    }
    Ok(clamp_speed(speed, config.max_speed))
}

/// Clamp to `0..=max_speed` without panicking on a bad limit
fn clamp_speed(speed: f64, max_speed: f64) -> f64 {
    speed.max(0.0).min(max_speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_accelerates_toward_target_without_overshoot() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_target_speed(50.0, &config).unwrap();

        let mut previous = state.current_speed();
        for _ in 0..2000 {
            state.step_speed(&config);
            assert!(state.current_speed() >= previous);
            assert!(state.current_speed() <= 50.0);
            previous = state.current_speed();
        }
        assert!((state.current_speed() - 50.0).abs() <= SPEED_TOLERANCE + 1e-9);
    }

    #[test]
    fn test_first_tick_is_rate_limited() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_target_speed(100.0, &config).unwrap();
        state.step_speed(&config);

        // 100 * 0.05 = 5 is above the 0.3 acceleration limit
        assert!(approx(state.current_speed(), 0.3));
        assert!(approx(state.metrics().current_speed, 0.3));
    }

    #[test]
    fn test_decelerates_proportionally_near_target() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_current_speed(12.0, &config).unwrap();
        state.set_target_speed(10.0, &config).unwrap();
        state.step_speed(&config);

        // -2 * 0.05 = -0.1 is gentler than the 0.3 deceleration limit
        assert!(approx(state.current_speed(), 11.9));
    }

    #[test]
    fn test_within_tolerance_holds_speed() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_current_speed(50.05, &config).unwrap();
        state.set_target_speed(50.0, &config).unwrap();
        state.step_speed(&config);
        assert!(approx(state.current_speed(), 50.05));
    }

    #[test]
    fn test_speed_is_clamped() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        assert_eq!(state.set_target_speed(250.0, &config).unwrap(), 180.0);
        assert_eq!(state.set_current_speed(-5.0, &config).unwrap(), 0.0);
        assert!(matches!(
            state.set_target_speed(f64::NAN, &config),
            Err(SimError::InvalidSpeed(..))
        ));
    }

    #[test]
    fn test_zero_target_stops_immediately() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_current_speed(80.0, &config).unwrap();
        state.set_target_speed(0.0, &config).unwrap();
        assert_eq!(state.current_speed(), 0.0);
        assert_eq!(state.metrics().current_speed, 0.0);
    }

    #[test]
    fn test_emergency_brake_latches_hold() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_current_speed(120.0, &config).unwrap();
        state.set_target_speed(140.0, &config).unwrap();

        state.emergency_brake();
        assert_eq!(state.current_speed(), 0.0);
        assert_eq!(state.target_speed(), 0.0);
        assert!(state.is_emergency_braking());
        assert!(matches!(
            state.set_target_speed(60.0, &config),
            Err(SimError::EmergencyBrakeActive)
        ));

        // The speed loop observes the stop and ends the braking phase,
        // but the hold stays latched.
        state.step_speed(&config);
        assert!(!state.is_emergency_braking());
        assert!(state.is_brake_held());
        assert!(state.set_current_speed(10.0, &config).is_err());

        assert!(state.release_brake_hold());
        assert!(!state.release_brake_hold());
        assert_eq!(state.set_target_speed(60.0, &config).unwrap(), 60.0);
    }

    #[test]
    fn test_assisted_mode_captures_speed() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_current_speed(72.0, &config).unwrap();
        state.set_driving_mode(DrivingMode::Assisted);
        assert_eq!(state.assisted_speed(), 72.0);

        state.set_current_speed(90.0, &config).unwrap();
        state.set_driving_mode(DrivingMode::Autonomous);
        assert_eq!(state.assisted_speed(), 72.0);
        assert_eq!(state.driving_mode(), DrivingMode::Autonomous);
    }

    #[test]
    fn test_metrics_follow_rpm() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_current_speed(100.0, &config).unwrap();
        state.step_metrics(&config);

        let metrics = state.metrics();
        assert_eq!(metrics.rpm, 5800);
        let load = 5800.0 / 6000.0;
        assert!(approx(metrics.temp, 90.0 + (load * 20.0) * 0.1));
        assert!(approx(metrics.voltage, 12.0 - (load * 0.5) * 0.05));
        assert!(approx(metrics.oil, 45.0 + (load * 15.0) * 0.15));
    }

    #[test]
    fn test_metrics_converge() {
        let config = SimConfig::default();
        let mut state = VehicleState::new();
        state.set_current_speed(60.0, &config).unwrap();
        for _ in 0..500 {
            state.step_metrics(&config);
        }

        let load = 3800.0 / 6000.0;
        let metrics = state.metrics();
        assert!((metrics.temp - (90.0 + load * 20.0)).abs() < 1e-6);
        assert!((metrics.voltage - (12.0 - load * 0.5)).abs() < 1e-6);
        assert!((metrics.oil - (45.0 + load * 15.0)).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_speed_limit_is_an_error() {
        let mut state = VehicleState::new();
        for max_speed in [-1.0, f64::NAN] {
            let config = SimConfig::new().with_max_speed(max_speed);
            assert!(matches!(
                state.set_target_speed(10.0, &config),
                Err(SimError::InvalidConfig(_))
            ));
            assert!(state.set_current_speed(10.0, &config).is_err());
            state.step_speed(&config);
            assert_eq!(state.current_speed(), 0.0);
        }
    }

    #[test]
    fn test_fuel_level_clamped() {
        let mut state = VehicleState::new();
        assert_eq!(state.set_fuel_level(140.0), 100.0);
        assert_eq!(state.set_fuel_level(-3.0), 0.0);
        assert_eq!(state.set_fuel_level(42.5), 42.5);
        assert_eq!(state.metrics().fuel, 42.5);
    }
}
