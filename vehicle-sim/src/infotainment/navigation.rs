//! Route selection and ETA for the navigation panel

use crate::types::SimError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Predefined routes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    #[default]
    HomeToOffice,
    OfficeToMall,
    MallToHome,
    Custom,
}

impl Route {
    pub const ALL: [Route; 4] = [
        Route::HomeToOffice,
        Route::OfficeToMall,
        Route::MallToHome,
        Route::Custom,
    ];

    /// Estimated travel time; `None` while a custom route is being calculated
    pub fn eta(self) -> Option<Duration> {
        let minutes = match self {
            Route::HomeToOffice => 25,
            Route::OfficeToMall => 15,
            Route::MallToHome => 35,
            Route::Custom => return None,
        };
        Some(Duration::from_secs(minutes * 60))
    }

    /// ETA as shown on the panel
    pub fn eta_label(self) -> String {
        match self.eta() {
            Some(eta) => format!("ETA: {} minutes", eta.as_secs() / 60),
            None => "ETA: Calculating...".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::HomeToOffice => write!(f, "Home → Office"),
            Route::OfficeToMall => write!(f, "Office → Mall"),
            Route::MallToHome => write!(f, "Mall → Home"),
            Route::Custom => write!(f, "Custom Route"),
        }
    }
}

impl FromStr for Route {
    type Err = SimError;

    /// Accepts `home-office`, `home_to_office`, `Home → Office`, `custom`, ...
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match key.trim_end_matches("route") {
            "homeoffice" | "hometooffice" => Ok(Route::HomeToOffice),
            "officemall" | "officetomall" => Ok(Route::OfficeToMall),
            "mallhome" | "malltohome" => Ok(Route::MallToHome),
            "custom" => Ok(Route::Custom),
            _ => Err(SimError::UnknownRoute(s.to_string())),
        }
    }
}

/// Traffic level reported for the active route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Traffic {
    Light,
    Moderate,
    Heavy,
}

impl Traffic {
    /// Pick a traffic level at random
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => Traffic::Light,
            1 => Traffic::Moderate,
            _ => Traffic::Heavy,
        }
    }
}

impl fmt::Display for Traffic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Traffic::Light => write!(f, "Light"),
            Traffic::Moderate => write!(f, "Moderate"),
            Traffic::Heavy => write!(f, "Heavy"),
        }
    }
}

/// Navigation panel state
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub active: bool,
    pub route: Route,
    pub traffic: Traffic,
}

impl Navigation {
    pub fn new() -> Self {
        Self {
            active: false,
            route: Route::default(),
            traffic: Traffic::Light,
        }
    }

    /// Select a route and refresh the traffic report
    pub fn change_route(&mut self, route: Route) {
        self.route = route;
        self.traffic = Traffic::sample(&mut rand::thread_rng());
    }

    /// Returns false if navigation was already running
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.active, true)
    }

    /// Returns false if navigation was already off
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    /// Flip navigation on or off; returns the new state
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new()
    }
}
