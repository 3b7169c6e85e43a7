//! Diagnostics panel
//!
//! Threshold constants and the derived warning report. Thresholds carry
//! compile-time ordering checks so a misconfigured pair fails the build.

use crate::types::VehicleMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Fuel Thresholds
// =============================================================================

/// At or below this level the fuel gauge turns amber (percent)
pub const FUEL_MEDIUM: f64 = 50.0;

/// At or below this level the low fuel warning is raised (percent)
pub const FUEL_LOW: f64 = 20.0;

const _: () = assert!(FUEL_LOW < FUEL_MEDIUM);

// =============================================================================
// Engine Thresholds
// =============================================================================

/// Engine temperature above which the engine is reported hot (deg C)
pub const ENGINE_TEMP_HIGH: f64 = 100.0;

/// Battery voltage below which the battery is reported low (V)
pub const BATTERY_VOLTAGE_LOW: f64 = 11.0;

/// Oil pressure below which the oil pressure is reported low (psi)
pub const OIL_PRESSURE_LOW: f64 = 20.0;

const _: () = assert!(BATTERY_VOLTAGE_LOW < 12.0);
const _: () = assert!(OIL_PRESSURE_LOW < 45.0);

/// Fuel gauge colour band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelStatus {
    Normal,
    Medium,
    Low,
}

impl FuelStatus {
    pub fn classify(fuel: f64) -> Self {
        if fuel <= FUEL_LOW {
            FuelStatus::Low
        } else if fuel <= FUEL_MEDIUM {
            FuelStatus::Medium
        } else {
            FuelStatus::Normal
        }
    }
}

impl fmt::Display for FuelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelStatus::Normal => write!(f, "normal"),
            FuelStatus::Medium => write!(f, "medium"),
            FuelStatus::Low => write!(f, "low"),
        }
    }
}

/// A condition worth surfacing to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Warning {
    LowFuel,
    EngineHot,
    BatteryLow,
    OilPressureLow,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::LowFuel => write!(f, "Low Fuel Warning!"),
            Warning::EngineHot => write!(f, "Engine temperature high"),
            Warning::BatteryLow => write!(f, "Battery voltage low"),
            Warning::OilPressureLow => write!(f, "Oil pressure low"),
        }
    }
}

/// Readings and warnings shown on the diagnostics panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub engine_temp: f64,
    pub battery_voltage: f64,
    pub oil_pressure: f64,
    pub fuel: f64,
    pub fuel_status: FuelStatus,
    pub warnings: Vec<Warning>,
}

impl DiagnosticsReport {
    pub fn from_metrics(metrics: &VehicleMetrics) -> Self {
        let fuel_status = FuelStatus::classify(metrics.fuel);

        let mut warnings = Vec::new();
        if fuel_status == FuelStatus::Low {
            warnings.push(Warning::LowFuel);
        }
        if metrics.temp > ENGINE_TEMP_HIGH {
            warnings.push(Warning::EngineHot);
        }
        if metrics.voltage < BATTERY_VOLTAGE_LOW {
            warnings.push(Warning::BatteryLow);
        }
        if metrics.oil < OIL_PRESSURE_LOW {
            warnings.push(Warning::OilPressureLow);
        }

        Self {
            engine_temp: metrics.temp,
            battery_voltage: metrics.voltage,
            oil_pressure: metrics.oil,
            fuel: metrics.fuel,
            fuel_status,
            warnings,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.warnings.is_empty()
    }
}
