//! Scenario runner
//!
//! Wires the control system, ADAS, infotainment and dashboard together and
//! drives them on the dashboard refresh timer, applying scripted steps as
//! their time comes up.

use crate::config::{Action, AppConfig, RunConfig, Step};
use crate::render;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use vehicle_sim::{
    Adas, Dashboard, DashboardFrame, Infotainment, SimError, VehicleControl,
};

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub steps_applied: usize,
    pub steps_failed: usize,
    pub elapsed: Duration,
    pub final_frame: DashboardFrame,
}

pub struct Simulation {
    control: VehicleControl,
    adas: Adas,
    infotainment: Infotainment,
    dashboard: Dashboard,
    /// Speed the driver asked for; followed until it settles
    pending_target: Option<f64>,
}

impl Simulation {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let control = VehicleControl::new(config.simulation.clone())
            .context("Failed to create the vehicle control system")?;
        Ok(Self {
            adas: Adas::new(control.clone(), config.adas.clone()),
            infotainment: Infotainment::new(control.clone(), config.infotainment.clone()),
            dashboard: Dashboard::new(control.clone()),
            control,
            pending_target: None,
        })
    }

    pub fn control(&self) -> &VehicleControl {
        &self.control
    }

    pub fn adas(&self) -> &Adas {
        &self.adas
    }

    pub fn infotainment(&self) -> &Infotainment {
        &self.infotainment
    }

    pub fn pending_target(&self) -> Option<f64> {
        self.pending_target
    }

    /// Apply the start-of-run settings: media, navigation, ADAS and speed
    pub fn prepare(&mut self, run: &RunConfig) -> Result<()> {
        if let Some(mode) = run.driving_mode {
            self.control.set_driving_mode(mode);
        }

        let mut restored = false;
        if let Some(playlist) = &run.playlist {
            match self.infotainment.load_playlist(playlist) {
                Ok(count) => {
                    log::info!("Restored playlist {:?} ({} tracks)", playlist, count);
                    restored = true;
                }
                Err(e) => log::warn!("Could not restore playlist {:?}: {}", playlist, e),
            }
        }
        if !restored {
            if let Some(dir) = &run.music_dir {
                let count = self
                    .infotainment
                    .load_library(dir)
                    .with_context(|| format!("Failed to scan music directory: {:?}", dir))?;
                log::info!("Loaded {} tracks from {:?}", count, dir);
            }
        }

        if let Some(route) = run.route {
            self.infotainment.change_route(route);
        }
        if run.navigation {
            self.infotainment.start_navigation();
        }

        if run.acc {
            self.adas.enable_adaptive_cruise()?;
        }
        if run.lka {
            self.adas.enable_lane_keeping()?;
        }

        if let Some(speed) = run.target_speed {
            self.apply(&Action::SetSpeed { speed })?;
        }
        Ok(())
    }

    /// Perform one driver action
    pub fn apply(&mut self, action: &Action) -> vehicle_sim::Result<()> {
        log::debug!("Applying {:?}", action);
        match action {
            Action::SetSpeed { speed } => {
                let max = self.control.config().max_speed;
                if !(0.0..=max).contains(speed) {
                    return Err(SimError::InvalidSpeed(*speed, max));
                }
                self.control.set_target_speed(*speed)?;
                self.pending_target = Some(*speed);
            }
            Action::DrivingMode { mode } => self.control.set_driving_mode(*mode),
            Action::EmergencyBrake => {
                self.pending_target = None;
                self.adas.emergency_braking()?;
                self.control.emergency_brake();
            }
            Action::ReleaseBrake => {
                self.control.release_brake_hold();
            }
            Action::DeployAirbags => self.adas.deploy_airbags()?,
            Action::ResetAirbags => self.adas.reset_airbags()?,
            Action::EnableAcc => {
                self.adas.enable_adaptive_cruise()?;
            }
            Action::DisableAcc => self.adas.disable_adaptive_cruise(),
            Action::EnableLka => {
                self.adas.enable_lane_keeping()?;
            }
            Action::DisableLka => self.adas.disable_lane_keeping(),
            Action::CollisionCheck => self.adas.check_collision_risk()?,
            Action::Play => {
                self.infotainment.play()?;
            }
            Action::Pause => self.infotainment.pause()?,
            Action::NextTrack => {
                self.infotainment.next_track()?;
            }
            Action::PreviousTrack => {
                self.infotainment.previous_track()?;
            }
            Action::Volume { level } => self.infotainment.set_volume(*level)?,
            Action::ToggleRepeat => {
                self.infotainment.toggle_repeat();
            }
            Action::ToggleShuffle => {
                self.infotainment.toggle_shuffle();
            }
            Action::Route { route } => {
                self.infotainment.change_route(*route);
                self.infotainment.navigation_update()?;
            }
            Action::StartNavigation => {
                self.infotainment.start_navigation();
            }
            Action::StopNavigation => {
                self.infotainment.stop_navigation();
            }
            Action::ToggleNavigation => {
                self.infotainment.toggle_navigation();
            }
            Action::Refuel { level } => {
                let level = self.control.set_fuel_level(*level);
                self.control.event_log().info(format!("Refuelled to {:.1}%", level));
            }
        }
        Ok(())
    }

    /// Follow the pending speed transition and refresh the dashboard
    pub fn tick(&mut self) -> DashboardFrame {
        if let Some(target) = self.pending_target {
            match self.dashboard.settle_speed(target) {
                Ok(true) => self.pending_target = None,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Speed transition to {:.1} km/h abandoned: {}", target, e);
                    self.pending_target = None;
                }
            }
        }
        self.dashboard.refresh(Some(&self.adas), Some(&self.infotainment))
    }

    /// Run the scenario in real time, printing every `print_every`th frame
    pub fn run<W: Write>(&mut self, run: &RunConfig, steps: &[Step], out: &mut W) -> Result<RunSummary> {
        let duration = Duration::try_from_secs_f64(run.duration_secs)
            .with_context(|| format!("Invalid run duration: {} s", run.duration_secs))?;
        let refresh = Duration::from_millis(run.refresh_ms.max(1));

        self.control.start()?;
        self.prepare(run)?;

        let start = Instant::now();
        let mut next_step = 0;
        let mut frames = 0u64;
        let mut steps_applied = 0;
        let mut steps_failed = 0;

        loop {
            let elapsed = start.elapsed();
            let elapsed_ms = elapsed.as_millis() as u64;

            while let Some(step) = steps.get(next_step).filter(|s| s.at_ms <= elapsed_ms) {
                match self.apply(&step.action) {
                    Ok(()) => steps_applied += 1,
                    Err(e) => {
                        steps_failed += 1;
                        log::warn!("Step at {} ms ({:?}) failed: {}", step.at_ms, step.action, e);
                        writeln!(out, "⚠️  {:?}: {}", step.action, e)?;
                    }
                }
                next_step += 1;
            }

            if elapsed >= duration {
                break;
            }

            let frame = self.tick();
            if run.print_every > 0 && frames % u64::from(run.print_every) == 0 {
                write!(out, "{}", render::render_frame(&frame, elapsed))?;
            }
            frames += 1;

            thread::sleep(refresh);
        }

        let elapsed = start.elapsed();
        let final_frame = self.tick();
        write!(out, "{}", render::render_frame(&final_frame, elapsed))?;

        Ok(RunSummary {
            frames,
            steps_applied,
            steps_failed,
            elapsed,
            final_frame,
        })
    }

    /// Save the playlist if requested, then stop every subsystem
    pub fn shutdown(&mut self, save_playlist: Option<&Path>) {
        if let Some(path) = save_playlist {
            match self.infotainment.save_playlist(path) {
                Ok(()) => log::info!("Playlist saved to {:?}", path),
                Err(e) => log::warn!("Could not save playlist {:?}: {}", path, e),
            }
        }
        self.infotainment.shutdown();
        self.control.event_log().info("Application shutting down");
        self.control.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use vehicle_sim::{DrivingMode, InfotainmentConfig, Route, SimConfig};

    fn fast_config() -> AppConfig {
        AppConfig {
            simulation: SimConfig::new()
                .with_intervals(Duration::from_millis(2), Duration::from_millis(5))
                .with_task_rate_limit(Duration::from_millis(1)),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_apply_speed_and_brake() {
        let mut sim = Simulation::new(&AppConfig::default()).unwrap();

        sim.apply(&Action::SetSpeed { speed: 60.0 }).unwrap();
        assert_eq!(sim.control().target_speed(), 60.0);
        assert_eq!(sim.pending_target(), Some(60.0));

        assert!(matches!(
            sim.apply(&Action::SetSpeed { speed: 250.0 }),
            Err(SimError::InvalidSpeed(..))
        ));

        sim.apply(&Action::EmergencyBrake).unwrap();
        sim.control().run_pending_tasks();
        assert!(sim.pending_target().is_none());
        assert!(sim.control().is_brake_held());
        assert!(matches!(
            sim.apply(&Action::SetSpeed { speed: 20.0 }),
            Err(SimError::EmergencyBrakeActive)
        ));

        sim.control().step();
        sim.apply(&Action::ReleaseBrake).unwrap();
        sim.apply(&Action::SetSpeed { speed: 20.0 }).unwrap();
        assert!(sim.control().event_log().contains("Emergency brake released"));
    }

    #[test]
    fn test_release_brake_logged_once() {
        let mut sim = Simulation::new(&AppConfig::default()).unwrap();
        sim.apply(&Action::EmergencyBrake).unwrap();
        sim.control().run_pending_tasks();
        sim.control().step();

        sim.apply(&Action::ReleaseBrake).unwrap();
        // Releasing again is a no-op
        sim.apply(&Action::ReleaseBrake).unwrap();

        let released = sim
            .control()
            .event_log()
            .entries()
            .iter()
            .filter(|entry| entry.message == "Emergency brake released")
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn test_invalid_simulation_config_rejected() {
        let mut config = AppConfig::default();
        config.simulation.max_speed = f64::NAN;
        assert!(Simulation::new(&config).is_err());
    }

    #[test]
    fn test_run_rejects_huge_duration() {
        let mut sim = Simulation::new(&fast_config()).unwrap();
        let run = RunConfig {
            duration_secs: 1e20,
            ..RunConfig::default()
        };
        let err = sim.run(&run, &[], &mut Vec::new()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid run duration"));
        assert!(!sim.control().is_running());
    }

    #[test]
    fn test_tick_settles_pending_target() {
        let mut sim = Simulation::new(&AppConfig::default()).unwrap();
        sim.apply(&Action::SetSpeed { speed: 5.0 }).unwrap();

        for _ in 0..500 {
            sim.control().step_speed();
            sim.tick();
            if sim.pending_target().is_none() {
                break;
            }
        }
        assert!(sim.pending_target().is_none());
        assert_eq!(sim.control().current_speed(), 5.0);
    }

    #[test]
    fn test_prepare_media_and_navigation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.mp3"), b"x").unwrap();
        fs::write(dir.path().join("two.wav"), b"x").unwrap();

        let config = AppConfig {
            infotainment: InfotainmentConfig::default().with_play_cooldown(Duration::ZERO),
            ..AppConfig::default()
        };
        let mut sim = Simulation::new(&config).unwrap();
        let run = RunConfig {
            music_dir: Some(dir.path().to_path_buf()),
            route: Some(Route::MallToHome),
            navigation: true,
            driving_mode: Some(DrivingMode::Assisted),
            ..RunConfig::default()
        };
        sim.prepare(&run).unwrap();

        assert_eq!(sim.infotainment().tracks().len(), 2);
        assert!(sim.infotainment().navigation().active);
        assert_eq!(sim.infotainment().navigation().route, Route::MallToHome);
        assert_eq!(sim.control().driving_mode(), DrivingMode::Assisted);

        sim.apply(&Action::StopNavigation).unwrap();
        assert!(!sim.infotainment().navigation().active);
        sim.apply(&Action::StartNavigation).unwrap();
        assert!(sim.infotainment().navigation().active);

        sim.apply(&Action::Play).unwrap();
        sim.apply(&Action::NextTrack).unwrap();
        assert_eq!(sim.infotainment().current_track().unwrap().title, "two");
        assert!(matches!(sim.apply(&Action::Volume { level: 1.5 }), Err(SimError::InvalidVolume(_))));
    }

    #[test]
    fn test_prepare_missing_music_dir_fails() {
        let mut sim = Simulation::new(&AppConfig::default()).unwrap();
        let run = RunConfig {
            music_dir: Some("/nonexistent/music".into()),
            ..RunConfig::default()
        };
        assert!(sim.prepare(&run).is_err());
    }

    #[test]
    fn test_short_scripted_run() {
        let mut config = fast_config();
        config.run = RunConfig {
            duration_secs: 0.3,
            refresh_ms: 10,
            print_every: 5,
            target_speed: Some(40.0),
            ..RunConfig::default()
        };
        config.steps = vec![
            Step { at_ms: 50, action: Action::Refuel { level: 15.0 } },
            Step { at_ms: 100, action: Action::EmergencyBrake },
            Step { at_ms: 150, action: Action::Pause },
        ];

        let mut sim = Simulation::new(&config).unwrap();
        let mut out = Vec::new();
        let summary = sim.run(&config.run, &config.steps, &mut out).unwrap();
        sim.shutdown(None);

        assert_eq!(summary.steps_applied, 2);
        assert_eq!(summary.steps_failed, 1);
        assert!(summary.frames > 0);
        assert!(summary.final_frame.brake_held);
        assert_eq!(summary.final_frame.metrics.current_speed, 0.0);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[BRAKE HOLD]"));
        assert!(text.contains("Pause"));
        assert!(!sim.control().is_running());
    }
}
