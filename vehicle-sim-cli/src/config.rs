//! Scenario configuration loading and parsing

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vehicle_sim::{AdasConfig, DrivingMode, InfotainmentConfig, Route, SimConfig};

/// Main application configuration (loaded from a scenario .toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimConfig,
    #[serde(default)]
    pub adas: AdasConfig,
    #[serde(default)]
    pub infotainment: InfotainmentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory for timestamped log files
    pub log_dir: Option<PathBuf>,
}

/// How long to drive and what to switch on at the start
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    /// Print every Nth dashboard frame
    #[serde(default = "default_print_every")]
    pub print_every: u32,
    pub target_speed: Option<f64>,
    pub driving_mode: Option<DrivingMode>,
    #[serde(default)]
    pub acc: bool,
    #[serde(default)]
    pub lka: bool,
    pub music_dir: Option<PathBuf>,
    /// Playlist to restore instead of scanning `music_dir`
    pub playlist: Option<PathBuf>,
    /// Where to save the playlist on exit
    pub save_playlist: Option<PathBuf>,
    pub route: Option<Route>,
    #[serde(default)]
    pub navigation: bool,
}

fn default_duration() -> f64 {
    10.0
}

fn default_refresh_ms() -> u64 {
    100
}

fn default_print_every() -> u32 {
    10
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration(),
            refresh_ms: default_refresh_ms(),
            print_every: default_print_every(),
            target_speed: None,
            driving_mode: None,
            acc: false,
            lka: false,
            music_dir: None,
            playlist: None,
            save_playlist: None,
            route: None,
            navigation: false,
        }
    }
}

/// A scripted driver action, applied once `at_ms` has elapsed
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SetSpeed { speed: f64 },
    DrivingMode { mode: DrivingMode },
    EmergencyBrake,
    ReleaseBrake,
    DeployAirbags,
    ResetAirbags,
    EnableAcc,
    DisableAcc,
    EnableLka,
    DisableLka,
    CollisionCheck,
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    Volume { level: f64 },
    ToggleRepeat,
    ToggleShuffle,
    Route { route: Route },
    StartNavigation,
    StopNavigation,
    ToggleNavigation,
    Refuel { level: f64 },
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config.validate()?;
    config.steps.sort_by_key(|step| step.at_ms);
    Ok(config)
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.run.refresh_ms == 0 {
            bail!("run.refresh_ms must be greater than zero");
        }
        if !(self.run.duration_secs.is_finite() && self.run.duration_secs >= 0.0) {
            bail!("run.duration_secs must be a non-negative number");
        }
        Duration::try_from_secs_f64(self.run.duration_secs)
            .context("run.duration_secs is too large")?;
        if !(self.simulation.max_speed.is_finite() && self.simulation.max_speed > 0.0) {
            bail!("simulation.max_speed must be a positive number");
        }
        self.simulation.validate().context("Invalid [simulation] section")?;
        for step in &self.steps {
            if let Action::Volume { level } = step.action {
                if !(0.0..=1.0).contains(&level) {
                    bail!("Step at {} ms: volume {} is outside 0.0..=1.0", step.at_ms, level);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [simulation]
            max_speed = 160.0
            speed_update_interval_ms = 20

            [adas]
            safe_distance = 40.0

            [run]
            duration_secs = 5.0
            target_speed = 80.0
            driving_mode = "Assisted"
            acc = true
            route = "office_to_mall"

            [[steps]]
            at_ms = 3000
            action = "emergency_brake"

            [[steps]]
            at_ms = 1000
            action = "set_speed"
            speed = 60.0

            [[steps]]
            at_ms = 2000
            action = "volume"
            level = 0.4
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.simulation.max_speed, 160.0);
        assert_eq!(config.simulation.speed_update_interval_ms, 20);
        assert_eq!(config.simulation.metrics_update_interval_ms, 500);
        assert_eq!(config.adas.safe_distance, 40.0);
        assert_eq!(config.run.refresh_ms, 100);
        assert_eq!(config.run.driving_mode, Some(DrivingMode::Assisted));
        assert_eq!(config.run.route, Some(Route::OfficeToMall));
        assert!(config.run.acc);
        assert_eq!(config.steps.len(), 3);
        assert_eq!(config.steps[1].action, Action::SetSpeed { speed: 60.0 });
        assert_eq!(config.steps[0].action, Action::EmergencyBrake);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.simulation, SimConfig::default());
        assert_eq!(config.run.duration_secs, 10.0);
        assert_eq!(config.run.print_every, 10);
        assert!(config.steps.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_sorts_steps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        fs::write(
            &path,
            r#"
            [[steps]]
            at_ms = 500
            action = "play"

            [[steps]]
            at_ms = 100
            action = "refuel"
            level = 75.0
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let times: Vec<u64> = config.steps.iter().map(|s| s.at_ms).collect();
        assert_eq!(times, vec![100, 500]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config: AppConfig = toml::from_str(
            r#"
            [run]
            refresh_ms = 0
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let unknown = toml::from_str::<AppConfig>(
            r#"
            [[steps]]
            at_ms = 0
            action = "fly"
            "#,
        );
        assert!(unknown.is_err());
    }

    #[test]
    fn test_undrivable_simulation_rejected() {
        for max_speed in ["0.0", "-5.0", "nan", "inf"] {
            let config: AppConfig =
                toml::from_str(&format!("[simulation]\nmax_speed = {}\n", max_speed)).unwrap();
            assert!(config.validate().is_err(), "max_speed = {} accepted", max_speed);
        }

        let config: AppConfig = toml::from_str(
            r#"
            [simulation]
            temp_smoothing = 1.5
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid [simulation] section"));
    }

    #[test]
    fn test_huge_duration_rejected() {
        let mut config = AppConfig::default();
        config.run.duration_secs = 1e20;
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("run.duration_secs"));

        config.run.duration_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bundled_scenario_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../scenarios/highway.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.run.target_speed, Some(90.0));
        assert_eq!(config.run.route, Some(Route::HomeToOffice));
        assert!(config.steps.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
        assert!(config.steps.contains(&Step {
            at_ms: 26000,
            action: Action::Route { route: Route::OfficeToMall },
        }));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_config(Path::new("/nonexistent/scenario.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }
}
