//! Simulator configuration types
//!
//! Every tunable of the control loop, the ADAS thresholds and the
//! infotainment player lives here. All fields have defaults so partial
//! configuration files deserialize cleanly.

use crate::types::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the vehicle control system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Upper speed limit in km/h
    pub max_speed: f64,

    /// Maximum speed gain per speed tick (km/h)
    pub acceleration_rate: f64,

    /// Maximum speed loss per speed tick (km/h)
    pub deceleration_rate: f64,

    /// Maximum speed loss per speed tick while emergency braking (km/h)
    pub emergency_deceleration_rate: f64,

    /// Interval between speed ticks in milliseconds (default: 50ms)
    pub speed_update_interval_ms: u64,

    /// Interval between metrics ticks in milliseconds (default: 500ms)
    pub metrics_update_interval_ms: u64,

    /// Fraction of the distance to the target temperature covered per tick
    pub temp_smoothing: f64,

    /// Fraction of the distance to the target voltage covered per tick
    pub voltage_smoothing: f64,

    /// Fraction of the distance to the target oil pressure covered per tick
    pub oil_smoothing: f64,

    /// Maximum number of pending tasks before new ones are dropped
    pub max_queue_size: usize,

    /// Pause between two executed tasks in milliseconds (default: 10ms)
    pub task_rate_limit_ms: u64,

    /// Number of entries kept in the in-memory event log
    pub event_log_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_speed: 180.0,
            acceleration_rate: 0.3,
            deceleration_rate: 0.3,
            emergency_deceleration_rate: 0.5,
            speed_update_interval_ms: 50,
            metrics_update_interval_ms: 500,
            temp_smoothing: 0.1,
            voltage_smoothing: 0.05,
            oil_smoothing: 0.15,
            max_queue_size: 100,
            task_rate_limit_ms: 10,
            event_log_capacity: 500,
        }
    }
}

impl SimConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the speed limit
    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Builder method: set acceleration and deceleration rates
    pub fn with_rates(mut self, acceleration: f64, deceleration: f64) -> Self {
        self.acceleration_rate = acceleration;
        self.deceleration_rate = deceleration;
        self
    }

    /// Builder method: set the speed and metrics tick intervals
    pub fn with_intervals(mut self, speed: Duration, metrics: Duration) -> Self {
        self.speed_update_interval_ms = speed.as_millis() as u64;
        self.metrics_update_interval_ms = metrics.as_millis() as u64;
        self
    }

    /// Builder method: set the task queue capacity
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Builder method: set the pause between executed tasks
    pub fn with_task_rate_limit(mut self, limit: Duration) -> Self {
        self.task_rate_limit_ms = limit.as_millis() as u64;
        self
    }

    pub fn speed_update_interval(&self) -> Duration {
        Duration::from_millis(self.speed_update_interval_ms.max(1))
    }

    pub fn metrics_update_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_update_interval_ms.max(1))
    }

    pub fn task_rate_limit(&self) -> Duration {
        Duration::from_millis(self.task_rate_limit_ms)
    }

    /// Check that the limits and rates describe a drivable vehicle
    pub fn validate(&self) -> Result<()> {
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "max_speed must be a positive number, got {}",
                self.max_speed
            )));
        }

        let rates = [
            ("acceleration_rate", self.acceleration_rate),
            ("deceleration_rate", self.deceleration_rate),
            ("emergency_deceleration_rate", self.emergency_deceleration_rate),
        ];
        for (name, rate) in rates {
            if !(rate.is_finite() && rate >= 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, rate
                )));
            }
        }

        let smoothing = [
            ("temp_smoothing", self.temp_smoothing),
            ("voltage_smoothing", self.voltage_smoothing),
            ("oil_smoothing", self.oil_smoothing),
        ];
        for (name, factor) in smoothing {
            if !(0.0..=1.0).contains(&factor) {
                return Err(SimError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, factor
                )));
            }
        }

        if self.max_queue_size == 0 {
            return Err(SimError::InvalidConfig(
                "max_queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// ADAS thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdasConfig {
    /// Speed above which sudden deceleration is considered a crash (km/h)
    pub speed_threshold: f64,

    /// Deceleration magnitude that triggers the airbags (km/h per second)
    pub deceleration_threshold: f64,

    /// Distance to the vehicle ahead below which ACC slows down (m)
    pub safe_distance: f64,

    /// Factor applied to the current speed when ACC slows down
    pub acc_slowdown_factor: f64,

    /// Lane offset (-1..=1) beyond which LKA corrects the steering
    pub lane_drift_threshold: f64,

    /// Steering correction per unit of lane offset (degrees)
    pub steering_gain: f64,

    /// Highest engine temperature at which airbags may be reset
    pub reset_max_temp: f64,

    /// Lowest battery voltage at which airbags may be reset
    pub reset_min_voltage: f64,
}

impl Default for AdasConfig {
    fn default() -> Self {
        Self {
            speed_threshold: 30.0,
            deceleration_threshold: 5.0,
            safe_distance: 50.0,
            acc_slowdown_factor: 0.8,
            lane_drift_threshold: 0.5,
            steering_gain: 0.1,
            reset_max_temp: 100.0,
            reset_min_voltage: 11.0,
        }
    }
}

/// Infotainment player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfotainmentConfig {
    /// Volume applied at startup (0.0 to 1.0)
    pub default_volume: f64,

    /// Minimum delay between two play requests in milliseconds
    pub play_cooldown_ms: u64,

    /// Accepted media file extensions (lower-case, without dot)
    pub extensions: Vec<String>,
}

impl Default for InfotainmentConfig {
    fn default() -> Self {
        Self {
            default_volume: 0.7,
            play_cooldown_ms: 500,
            extensions: vec!["mp3".to_string(), "wav".to_string()],
        }
    }
}

impl InfotainmentConfig {
    /// Builder method: set the play cooldown
    pub fn with_play_cooldown(mut self, cooldown: Duration) -> Self {
        self.play_cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    pub fn play_cooldown(&self) -> Duration {
        Duration::from_millis(self.play_cooldown_ms)
    }

    /// Check if a file extension is a supported media format
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.extensions.iter().any(|e| *e == extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_config_builder() {
        let config = SimConfig::new()
            .with_max_speed(120.0)
            .with_rates(1.0, 2.0)
            .with_intervals(Duration::from_millis(20), Duration::from_millis(200))
            .with_max_queue_size(5);

        assert_eq!(config.max_speed, 120.0);
        assert_eq!(config.acceleration_rate, 1.0);
        assert_eq!(config.deceleration_rate, 2.0);
        assert_eq!(config.speed_update_interval(), Duration::from_millis(20));
        assert_eq!(config.metrics_update_interval(), Duration::from_millis(200));
        assert_eq!(config.max_queue_size, 5);
    }

    #[test]
    fn test_validate_rejects_undrivable_limits() {
        assert!(SimConfig::default().validate().is_ok());

        for max_speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = SimConfig::new().with_max_speed(max_speed);
            assert!(
                matches!(config.validate(), Err(SimError::InvalidConfig(_))),
                "max_speed {} accepted",
                max_speed
            );
        }

        assert!(SimConfig::new().with_rates(f64::NAN, 0.3).validate().is_err());
        assert!(SimConfig::new().with_rates(0.3, -0.1).validate().is_err());
        assert!(SimConfig::new().with_max_queue_size(0).validate().is_err());

        let config = SimConfig {
            oil_smoothing: 1.5,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_is_not_a_busy_loop() {
        let config = SimConfig::new().with_intervals(Duration::ZERO, Duration::ZERO);
        assert_eq!(config.speed_update_interval(), Duration::from_millis(1));
        assert_eq!(config.metrics_update_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "max_speed": 90.0 }"#).unwrap();
        assert_eq!(config.max_speed, 90.0);
        assert_eq!(config.max_queue_size, 100);

        let adas: AdasConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(adas, AdasConfig::default());
    }

    #[test]
    fn test_extension_filter() {
        let config = InfotainmentConfig::default();
        assert!(config.accepts_extension("mp3"));
        assert!(config.accepts_extension("WAV"));
        assert!(!config.accepts_extension("flac"));
    }
}
