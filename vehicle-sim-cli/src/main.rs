//! Vehicle Dashboard Simulator CLI Application
//!
//! Command-line front-end for the vehicle-sim library. It adds:
//! - Scenario files (TOML) with scripted driver actions
//! - A text dashboard rendered on a refresh timer
//! - Console and file logging

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use vehicle_sim::{validate_speed_input, DrivingMode, Route};

mod config;
mod logging;
mod render;
mod runner;

use config::AppConfig;
use runner::Simulation;

/// Vehicle Dashboard Simulator - drive a simulated car from the terminal
#[derive(Parser, Debug)]
#[command(name = "vehicle-sim")]
#[command(about = "Simulate a vehicle dashboard: controls, ADAS, infotainment, diagnostics", long_about = None)]
#[command(version)]
struct Args {
    /// Path to scenario file (scenario.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run time in seconds (default: 10)
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,

    /// Speed to accelerate to at start (km/h)
    #[arg(long, value_name = "KMH")]
    target_speed: Option<String>,

    /// Driving mode: manual, assisted or autonomous
    #[arg(long, value_name = "MODE")]
    mode: Option<String>,

    /// Enable adaptive cruise control
    #[arg(long)]
    acc: bool,

    /// Enable lane keeping assist
    #[arg(long)]
    lka: bool,

    /// Directory with mp3/wav files for the media player
    #[arg(long, value_name = "DIR")]
    music_dir: Option<PathBuf>,

    /// Navigation route, e.g. home-office, office-mall, mall-home, custom
    #[arg(long, value_name = "ROUTE")]
    route: Option<String>,

    /// Dashboard refresh period in milliseconds (default: 100)
    #[arg(long, value_name = "MS")]
    refresh_ms: Option<u64>,

    /// Print every Nth dashboard frame (default: 10)
    #[arg(long, value_name = "FRAMES")]
    print_every: Option<u32>,

    /// Directory for timestamped log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    // Initialize logging
    let log_file = logging::init_logging(args.verbose, args.quiet, config.logging.log_dir.as_deref())?;

    log::info!("Vehicle Dashboard Simulator CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using simulation library v{}", vehicle_sim::VERSION);
    if let Some(path) = &log_file {
        log::info!("Logging to {:?}", path);
    }

    let title = if args.config.is_some() { "Scenario Mode" } else { "Quick Drive" };
    println!("═══════════════════════════════════════════════");
    println!("  Vehicle Dashboard Simulator - {}", title);
    println!("═══════════════════════════════════════════════\n");

    let mut simulation = Simulation::new(&config)?;
    let outcome = simulation.run(&config.run, &config.steps, &mut std::io::stdout());
    simulation.shutdown(config.run.save_playlist.as_deref());
    let summary = outcome?;

    println!("\n📊 Run Summary:");
    println!("  Duration:     {:.1}s", summary.elapsed.as_secs_f64());
    println!("  Frames:       {}", summary.frames);
    println!("  Steps:        {} applied, {} failed", summary.steps_applied, summary.steps_failed);
    println!("  Final speed:  {:.1} km/h", summary.final_frame.metrics.current_speed);
    println!("  Fuel left:    {:.1}%", summary.final_frame.metrics.fuel);
    if let Some(path) = &log_file {
        println!("  Log file:     {:?}", path);
    }

    Ok(())
}

/// Layer command-line flags over the scenario file
fn apply_overrides(config: &mut AppConfig, args: &Args) -> Result<()> {
    let run = &mut config.run;

    if let Some(duration) = args.duration {
        run.duration_secs = duration;
    }
    if let Some(refresh_ms) = args.refresh_ms {
        run.refresh_ms = refresh_ms;
    }
    if let Some(print_every) = args.print_every {
        run.print_every = print_every;
    }
    if let Some(speed) = &args.target_speed {
        let speed = validate_speed_input(speed, config.simulation.max_speed)
            .context("Invalid --target-speed")?;
        run.target_speed = Some(speed);
    }
    if let Some(mode) = &args.mode {
        run.driving_mode = Some(mode.parse::<DrivingMode>().context("Invalid --mode")?);
    }
    if let Some(route) = &args.route {
        run.route = Some(route.parse::<Route>().context("Invalid --route")?);
        run.navigation = true;
    }
    if args.music_dir.is_some() {
        run.music_dir = args.music_dir.clone();
    }
    run.acc |= args.acc;
    run.lka |= args.lka;

    if args.log_dir.is_some() {
        config.logging.log_dir = args.log_dir.clone();
    }
    Ok(())
}
