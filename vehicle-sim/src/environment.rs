//! Simulated surroundings read by the ADAS functions

use std::time::Instant;

/// Source of the external readings ADAS reacts to
pub trait Environment: Send + Sync {
    /// Distance to the vehicle ahead in metres
    fn distance_ahead(&self) -> f64;

    /// Position relative to the lane centre: -1 (left edge) to 1 (right edge)
    fn lane_offset(&self) -> f64;
}

/// Smoothly oscillating traffic and lane drift
///
/// The vehicle ahead swings between 10 m and 50 m, the lane position sweeps
/// across the full lane every ~12.5 s.
#[derive(Debug, Clone)]
pub struct SinusoidalEnvironment {
    origin: Instant,
}

impl SinusoidalEnvironment {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for SinusoidalEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SinusoidalEnvironment {
    fn distance_ahead(&self) -> f64 {
        30.0 + 20.0 * self.elapsed_secs().sin()
    }

    fn lane_offset(&self) -> f64 {
        (self.elapsed_secs() * 0.5).sin()
    }
}

/// Constant readings, for scripted scenarios and tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedEnvironment {
    pub distance: f64,
    pub lane_offset: f64,
}

impl FixedEnvironment {
    pub fn new(distance: f64, lane_offset: f64) -> Self {
        Self {
            distance,
            lane_offset: lane_offset.clamp(-1.0, 1.0),
        }
    }

    /// Open road: nobody ahead, centred in the lane
    pub fn clear_road() -> Self {
        Self::new(f64::INFINITY, 0.0)
    }
}

impl Environment for FixedEnvironment {
    fn distance_ahead(&self) -> f64 {
        self.distance
    }

    fn lane_offset(&self) -> f64 {
        self.lane_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sinusoidal_ranges() {
        let env = SinusoidalEnvironment::new();
        let distance = env.distance_ahead();
        assert!((10.0..=50.0).contains(&distance));
        assert!((-1.0..=1.0).contains(&env.lane_offset()));
    }

    #[test]
    fn test_fixed_environment_clamps_offset() {
        let env = FixedEnvironment::new(25.0, 3.0);
        assert_eq!(env.distance_ahead(), 25.0);
        assert_eq!(env.lane_offset(), 1.0);
        assert!(FixedEnvironment::clear_road().distance_ahead().is_infinite());
    }
}
