//! Text rendering of dashboard frames

use std::fmt::Write;
use std::time::Duration;
use vehicle_sim::{DashboardFrame, FuelStatus};

const GAUGE_WIDTH: usize = 20;

/// `[#####-----]` style bar for a 0.0..=1.0 fraction
pub fn gauge(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * GAUGE_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(GAUGE_WIDTH - filled))
}

fn fuel_marker(status: FuelStatus) -> &'static str {
    match status {
        FuelStatus::Normal => "",
        FuelStatus::Medium => " (!)",
        FuelStatus::Low => " Low Fuel Warning!",
    }
}

fn on_off(active: bool) -> &'static str {
    if active {
        "ON"
    } else {
        "off"
    }
}

/// Render one frame as the four dashboard panels
pub fn render_frame(frame: &DashboardFrame, elapsed: Duration) -> String {
    let mut out = String::new();
    let m = &frame.metrics;

    // Writing into a String cannot fail
    let _ = writeln!(out, "───────────────────────────────────────────────");
    let _ = writeln!(out, "  t = {:>6.1}s", elapsed.as_secs_f64());
    let _ = writeln!(
        out,
        "  Speed   {:>6.1} km/h (target {:.1})  Mode: {}{}",
        m.current_speed,
        frame.target_speed,
        frame.driving_mode,
        if frame.brake_held { "  [BRAKE HOLD]" } else { "" }
    );
    let _ = writeln!(out, "  RPM     {} {:>5}", gauge(frame.rpm_fraction), m.rpm);
    let _ = writeln!(
        out,
        "  Fuel    {} {:>5.1}%{}",
        gauge(m.fuel / 100.0),
        m.fuel,
        fuel_marker(frame.diagnostics.fuel_status)
    );
    let _ = writeln!(
        out,
        "  Engine  {:.1}°C   Battery {:.1}V   Oil {:.1}psi",
        m.temp, m.voltage, m.oil
    );
    for warning in &frame.diagnostics.warnings {
        let _ = writeln!(out, "  ⚠️  {}", warning);
    }

    if let Some(adas) = &frame.adas {
        let _ = writeln!(
            out,
            "  ADAS    ACC {}  LKA {}  Airbags {}{}",
            on_off(adas.acc_active),
            on_off(adas.lka_active),
            if adas.airbag_deployed { "DEPLOYED" } else { "ready" },
            if adas.collision_warning_active { "  COLLISION WARNING" } else { "" }
        );
    }

    if let Some(track) = &frame.now_playing {
        let _ = writeln!(
            out,
            "  Media   {} {} ({}/{})  vol {:.0}%  repeat {}{}",
            if track.is_playing { "▶" } else { "⏸" },
            track.title,
            track.position,
            track.total,
            track.volume * 100.0,
            track.repeat_mode,
            if track.shuffle { "  shuffle" } else { "" }
        );
    }

    if let Some(nav) = frame.navigation.as_ref().filter(|n| n.active) {
        let _ = writeln!(
            out,
            "  Nav     {}  {}  Traffic: {}",
            nav.route,
            nav.route.eta_label(),
            nav.traffic
        );
    }

    for entry in &frame.messages {
        let _ = writeln!(out, "  {}", entry);
    }

    out
}
