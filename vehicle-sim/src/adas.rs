//! Advanced Driver Assistance Systems
//!
//! Adaptive cruise control, lane keeping, collision detection, emergency
//! braking and the airbag system. Every ADAS action is submitted to the
//! control system's task queue and runs on its worker thread; the ADAS
//! flags live behind their own lock, which is never held while calling
//! into the control system.

use crate::config::AdasConfig;
use crate::control::VehicleControl;
use crate::environment::{Environment, SinusoidalEnvironment};
use crate::tasks::{Task, TaskPriority};
use crate::types::Result;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Snapshot of the ADAS panel toggles and indicators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdasStatus {
    pub acc_active: bool,
    pub lka_active: bool,
    pub airbag_deployed: bool,
    pub collision_warning_active: bool,
    /// Last steering correction applied by lane keeping (degrees)
    pub last_steering_correction: Option<f64>,
}

#[derive(Debug)]
struct AdasState {
    status: AdasStatus,
    last_speed: f64,
    last_check: Instant,
}

/// Handle to the ADAS subsystem. Clones share state.
#[derive(Clone)]
pub struct Adas {
    control: VehicleControl,
    config: AdasConfig,
    environment: Arc<dyn Environment>,
    state: Arc<Mutex<AdasState>>,
}

impl Adas {
    /// Create an ADAS subsystem reading a [`SinusoidalEnvironment`]
    pub fn new(control: VehicleControl, config: AdasConfig) -> Self {
        Self::with_environment(control, config, Arc::new(SinusoidalEnvironment::new()))
    }

    pub fn with_environment(
        control: VehicleControl,
        config: AdasConfig,
        environment: Arc<dyn Environment>,
    ) -> Self {
        Self {
            control,
            config,
            environment,
            state: Arc::new(Mutex::new(AdasState {
                status: AdasStatus {
                    acc_active: false,
                    lka_active: false,
                    airbag_deployed: false,
                    collision_warning_active: false,
                    last_steering_correction: None,
                },
                last_speed: 0.0,
                last_check: Instant::now(),
            })),
        }
    }

    pub fn status(&self) -> AdasStatus {
        self.lock().status
    }

    pub fn config(&self) -> &AdasConfig {
        &self.config
    }

    /// Activate adaptive cruise control.
    ///
    /// Returns `Ok(false)` if ACC was already active.
    pub fn enable_adaptive_cruise(&self) -> Result<bool> {
        if std::mem::replace(&mut self.lock().status.acc_active, true) {
            return Ok(false);
        }

        let adas = self.clone();
        let queued = self.control.add_task(Task::new(
            "Adaptive Cruise Control",
            TaskPriority::High,
            move || adas.adaptive_cruise_step(),
        ));
        if let Err(e) = queued {
            self.lock().status.acc_active = false;
            return Err(e);
        }

        self.control.event_log().info("ACC activated");
        Ok(true)
    }

    pub fn disable_adaptive_cruise(&self) {
        if std::mem::replace(&mut self.lock().status.acc_active, false) {
            self.control.event_log().info("ACC deactivated");
        }
    }

    /// Activate lane keeping assist.
    ///
    /// Returns `Ok(false)` if LKA was already active.
    pub fn enable_lane_keeping(&self) -> Result<bool> {
        if std::mem::replace(&mut self.lock().status.lka_active, true) {
            return Ok(false);
        }

        let adas = self.clone();
        let queued = self.control.add_task(Task::new(
            "Lane Keeping Assist",
            TaskPriority::High,
            move || adas.lane_keeping_step(),
        ));
        if let Err(e) = queued {
            self.lock().status.lka_active = false;
            return Err(e);
        }

        self.control.event_log().info("LKA activated");
        Ok(true)
    }

    pub fn disable_lane_keeping(&self) {
        if std::mem::replace(&mut self.lock().status.lka_active, false) {
            self.control.event_log().info("LKA deactivated");
        }
    }

    /// Queue an emergency stop, deploying the airbags first if the
    /// deceleration since the last check indicates a crash
    pub fn emergency_braking(&self) -> Result<()> {
        let adas = self.clone();
        self.control.add_task(Task::new(
            "Emergency Braking",
            TaskPriority::Emergency,
            move || {
                adas.emergency_braking_step();
                Ok(())
            },
        ))
    }

    /// Queue airbag deployment. Does nothing if they are already deployed.
    pub fn deploy_airbags(&self) -> Result<()> {
        if self.lock().status.airbag_deployed {
            return Ok(());
        }

        let adas = self.clone();
        self.control.add_task(Task::new(
            "Airbag Deployment",
            TaskPriority::Emergency,
            move || {
                {
                    let mut state = adas.lock();
                    if state.status.airbag_deployed {
                        return Ok(());
                    }
                    state.status.airbag_deployed = true;
                }
                adas.control
                    .event_log()
                    .warning("AIRBAG: Deploying airbags for passenger safety!");
                adas.control.emergency_brake();
                adas.activate_post_crash_safety();
                Ok(())
            },
        ))
    }

    /// Queue an airbag reset. Does nothing if they are not deployed.
    pub fn reset_airbags(&self) -> Result<()> {
        if !self.lock().status.airbag_deployed {
            return Ok(());
        }

        let adas = self.clone();
        self.control.add_task(Task::new("Airbag Reset", TaskPriority::Normal, move || {
            if adas.is_safe_to_reset() {
                adas.control.event_log().info("AIRBAG: Resetting airbag system");
                {
                    let mut state = adas.lock();
                    state.status.airbag_deployed = false;
                    state.status.collision_warning_active = false;
                }
                adas.control.release_brake_hold();
            } else {
                adas.control
                    .event_log()
                    .warning("AIRBAG: Cannot reset - safety conditions not met");
            }
            Ok(())
        }))
    }

    /// Queue a collision risk check
    pub fn check_collision_risk(&self) -> Result<()> {
        let adas = self.clone();
        self.control.add_task(Task::new(
            "Collision Detection",
            TaskPriority::High,
            move || {
                let speed = adas.control.current_speed();
                if adas.assess_deceleration(speed, Instant::now()) {
                    adas.control
                        .event_log()
                        .warning("WARNING: Sudden deceleration detected!");
                    adas.deploy_airbags()?;
                }
                Ok(())
            },
        ))
    }

    /// Compare `speed` against the previous check and record it.
    ///
    /// Returns true when the vehicle is above the speed threshold and its
    /// speed changed faster than the deceleration threshold (km/h per
    /// second) since the last check.
    pub fn assess_deceleration(&self, speed: f64, now: Instant) -> bool {
        let mut state = self.lock();

        let mut sudden = false;
        if speed > self.config.speed_threshold {
            let elapsed = now.saturating_duration_since(state.last_check).as_secs_f64();
            let rate = if elapsed > 0.0 {
                (speed - state.last_speed) / elapsed
            } else {
                0.0
            };
            sudden = rate.abs() > self.config.deceleration_threshold;
        }

        if sudden {
            state.status.collision_warning_active = true;
        }
        state.last_speed = speed;
        state.last_check = now;
        sudden
    }

    /// The vehicle is braked even when the airbag task cannot be queued
    fn emergency_braking_step(&self) {
        let speed = self.control.current_speed();
        if self.assess_deceleration(speed, Instant::now()) {
            self.control
                .event_log()
                .warning("EMERGENCY: Sudden deceleration detected!");
            if let Err(e) = self.deploy_airbags() {
                self.control
                    .event_log()
                    .error(format!("AIRBAG: Deployment failed: {}", e));
            }
        }
        self.control.emergency_brake();
    }

    fn adaptive_cruise_step(&self) -> Result<()> {
        if !self.lock().status.acc_active {
            return Ok(());
        }

        let speed = self.control.current_speed();
        if speed <= 0.0 {
            return Ok(());
        }

        let distance = self.environment.distance_ahead();
        let result = if distance < self.config.safe_distance {
            self.control
                .set_target_speed(speed * self.config.acc_slowdown_factor)
                .map(|_| {
                    self.control
                        .event_log()
                        .warning("ACC: Reducing speed to maintain safe distance");
                })
        } else {
            self.control
                .set_target_speed(self.control.assisted_speed())
                .map(|_| ())
        };

        if result.is_err() {
            self.lock().status.acc_active = false;
        }
        result
    }

    fn lane_keeping_step(&self) -> Result<()> {
        if !self.lock().status.lka_active {
            return Ok(());
        }

        let offset = self.environment.lane_offset();
        if offset.abs() > self.config.lane_drift_threshold {
            let correction = -offset * self.config.steering_gain;
            self.lock().status.last_steering_correction = Some(correction);
            self.control
                .event_log()
                .info(format!("LKA: Correcting steering by {:.2} degrees", correction));
        }
        Ok(())
    }

    fn activate_post_crash_safety(&self) {
        let log = self.control.event_log();
        log.info("Activating post-crash safety systems");
        log.info("Hazard lights activated");
        log.info("Doors unlocked for emergency exit");
    }

    fn is_safe_to_reset(&self) -> bool {
        let metrics = self.control.get_metrics();
        metrics.current_speed <= 0.0
            && metrics.temp <= self.config.reset_max_temp
            && metrics.voltage >= self.config.reset_min_voltage
            && !self.control.is_emergency_braking()
    }

    fn lock(&self) -> MutexGuard<'_, AdasState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
