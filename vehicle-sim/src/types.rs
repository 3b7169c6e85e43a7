//! Core types for the vehicle simulator
//!
//! This module defines the value types shared by every panel: the metrics
//! snapshot, driving modes, log severities and the library error type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type used throughout the simulator
pub type Timestamp = DateTime<Utc>;

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur while driving the simulation
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid speed: {0} (must be between 0 and {1} km/h)")]
    InvalidSpeed(f64, f64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f64),

    #[error("Cannot change speed while emergency brake is active")]
    EmergencyBrakeActive,

    #[error("Task queue full ({0} pending), dropping task '{1}'")]
    QueueFull(usize, String),

    #[error("Task '{0}' failed: {1}")]
    TaskFailed(String, String),

    #[error("No tracks available")]
    NoTracks,

    #[error("Playback requested too soon after the previous one")]
    PlayCooldown,

    #[error("Media is not playing")]
    NotPlaying,

    #[error("Unknown driving mode: {0}")]
    UnknownDrivingMode(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Playlist format error: {0}")]
    PlaylistFormat(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Driving mode selected on the vehicle control panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrivingMode {
    #[default]
    Manual,
    Assisted,
    Autonomous,
}

impl fmt::Display for DrivingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrivingMode::Manual => write!(f, "Manual"),
            DrivingMode::Assisted => write!(f, "Assisted"),
            DrivingMode::Autonomous => write!(f, "Autonomous"),
        }
    }
}

impl FromStr for DrivingMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(DrivingMode::Manual),
            "assisted" => Ok(DrivingMode::Assisted),
            "autonomous" => Ok(DrivingMode::Autonomous),
            _ => Err(SimError::UnknownDrivingMode(s.to_string())),
        }
    }
}

/// Severity of an event log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Matching level on the `log` facade
    pub fn level(self) -> log::Level {
        match self {
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single entry of the system message log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.severity,
            self.message
        )
    }
}

/// Snapshot of the simulated engine and vehicle metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleMetrics {
    /// Engine speed in revolutions per minute
    pub rpm: u32,
    /// Engine temperature in degrees Celsius
    pub temp: f64,
    /// Battery voltage in volts
    pub voltage: f64,
    /// Oil pressure in psi
    pub oil: f64,
    /// Fuel level in percent (0-100)
    pub fuel: f64,
    /// Current speed in km/h
    pub current_speed: f64,
}

/// Engine idle speed
pub const IDLE_RPM: u32 = 800;

/// RPM at which the gauge is full scale
pub const RPM_FULL_SCALE: f64 = 6000.0;

impl Default for VehicleMetrics {
    fn default() -> Self {
        Self {
            rpm: IDLE_RPM,
            temp: 90.0,
            voltage: 12.0,
            oil: 45.0,
            fuel: 100.0,
            current_speed: 0.0,
        }
    }
}
