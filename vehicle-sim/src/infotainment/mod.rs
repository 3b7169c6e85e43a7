//! Infotainment panel: media player state and navigation
//!
//! Playback is modelled as player state only (current track, playing flag,
//! volume, repeat and shuffle); no audio is decoded. User actions are
//! announced on the system log through low-priority control tasks.

pub mod library;
pub mod navigation;
pub mod playlist;

pub use library::{scan_directory, TrackInfo};
pub use navigation::{Navigation, Route, Traffic};
pub use playlist::{PlaylistFile, RepeatMode};

use crate::config::InfotainmentConfig;
use crate::control::VehicleControl;
use crate::tasks::{Task, TaskPriority};
use crate::types::{Result, SimError};
use std::path::Path;
use std::time::Instant;

/// What the "now playing" area shows
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub format: String,
    pub duration: f64,
    pub is_playing: bool,
    pub volume: f64,
    pub repeat_mode: RepeatMode,
    pub shuffle: bool,
    /// 1-based position in the play order
    pub position: usize,
    pub total: usize,
}

/// The infotainment system
pub struct Infotainment {
    control: VehicleControl,
    config: InfotainmentConfig,
    tracks: Vec<TrackInfo>,
    /// Play order: indices into `tracks`
    order: Vec<usize>,
    /// Position in `order`
    current: usize,
    playing: bool,
    volume: f64,
    repeat: RepeatMode,
    shuffle: bool,
    last_play: Option<Instant>,
    navigation: Navigation,
}

impl Infotainment {
    pub fn new(control: VehicleControl, config: InfotainmentConfig) -> Self {
        let volume = config.default_volume.clamp(0.0, 1.0);
        Self {
            control,
            config,
            tracks: Vec::new(),
            order: Vec::new(),
            current: 0,
            playing: false,
            volume,
            repeat: RepeatMode::None,
            shuffle: false,
            last_play: None,
            navigation: Navigation::new(),
        }
    }

    /// Replace the library with the media files found in `directory`.
    /// Returns the number of tracks loaded.
    pub fn load_library(&mut self, directory: &Path) -> Result<usize> {
        let tracks = scan_directory(directory, &self.config)?;
        self.install_tracks(tracks);

        let count = self.tracks.len();
        if count == 0 {
            self.control
                .event_log()
                .warning(format!("No playable tracks found in {}", directory.display()));
        } else {
            self.control
                .event_log()
                .info(format!("Loaded {} tracks from {}", count, directory.display()));
        }
        Ok(count)
    }

    pub fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Current position in the play order (0-based)
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    /// Start playback of the current track
    pub fn play(&mut self) -> Result<TrackInfo> {
        let track = match self.current_track() {
            Some(track) => track.clone(),
            None => {
                self.control.event_log().warning("No tracks available");
                return Err(SimError::NoTracks);
            }
        };

        let now = Instant::now();
        if let Some(last) = self.last_play {
            if now.duration_since(last) < self.config.play_cooldown() {
                return Err(SimError::PlayCooldown);
            }
        }

        self.playing = true;
        self.last_play = Some(now);
        self.announce("Media Playback", format!("Playing: {}", track.title));
        Ok(track)
    }

    pub fn pause(&mut self) -> Result<()> {
        if !self.playing {
            return Err(SimError::NotPlaying);
        }
        self.playing = false;
        self.announce("Media Pause", "Media paused".to_string());
        Ok(())
    }

    /// Advance to the next track (stays put with repeat-one)
    pub fn next_track(&mut self) -> Result<TrackInfo> {
        self.skip("Next Track", |current, len| (current + 1) % len)
    }

    /// Go back to the previous track (stays put with repeat-one)
    pub fn previous_track(&mut self) -> Result<TrackInfo> {
        self.skip("Previous Track", |current, len| (current + len - 1) % len)
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(SimError::InvalidVolume(volume));
        }
        self.volume = volume;
        self.announce("Volume Change", format!("Volume set to {:.0}%", volume * 100.0));
        Ok(())
    }

    /// Cycle none -> one -> all; returns the new mode
    pub fn toggle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.next();
        self.announce("Repeat Mode", format!("Repeat mode: {}", self.repeat));
        self.repeat
    }

    /// Flip shuffle and rebuild the play order, keeping the current track.
    /// Returns the new shuffle state.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        let current_track = self.order.get(self.current).copied();
        self.order = playlist::build_order(self.tracks.len(), self.shuffle);
        if let Some(track) = current_track {
            self.current = self.order.iter().position(|&i| i == track).unwrap_or(0);
        }
        let state = if self.shuffle { "on" } else { "off" };
        self.announce("Shuffle Mode", format!("Shuffle {}", state));
        self.shuffle
    }

    pub fn current_track(&self) -> Option<&TrackInfo> {
        self.order.get(self.current).and_then(|&i| self.tracks.get(i))
    }

    pub fn current_track_info(&self) -> Option<NowPlaying> {
        let track = self.current_track()?;
        Some(NowPlaying {
            title: track.title.clone(),
            artist: track.artist.clone(),
            format: track.format.clone(),
            duration: track.duration,
            is_playing: self.playing,
            volume: self.volume,
            repeat_mode: self.repeat,
            shuffle: self.shuffle,
            position: self.current + 1,
            total: self.order.len(),
        })
    }

    /// Save the library, play order and player settings as JSON
    pub fn save_playlist(&self, path: &Path) -> Result<()> {
        let file = PlaylistFile {
            tracks: self.tracks.iter().map(|t| t.path.clone()).collect(),
            current_track: self.current,
            playlist: self.order.clone(),
            repeat_mode: self.repeat,
            shuffle: self.shuffle,
            volume: self.volume,
        };
        file.save(path).map_err(|e| {
            self.control.event_log().error(format!("Error saving playlist: {}", e));
            e
        })
    }

    /// Restore a playlist saved by [`Infotainment::save_playlist`].
    ///
    /// Tracks that no longer exist are dropped; the library is rescanned from
    /// the directory of the first surviving track. Returns the track count.
    pub fn load_playlist(&mut self, path: &Path) -> Result<usize> {
        let file = PlaylistFile::load(path).map_err(|e| {
            self.control.event_log().error(format!("Error loading playlist: {}", e));
            e
        })?;

        let first_valid = file.tracks.iter().find(|p| p.exists()).ok_or(SimError::NoTracks)?;
        let directory = first_valid
            .parent()
            .map(Path::to_path_buf)
            .ok_or(SimError::NoTracks)?;

        if self.load_library(&directory)? == 0 {
            return Err(SimError::NoTracks);
        }

        let len = self.tracks.len();
        self.shuffle = file.shuffle;
        self.order = if playlist::is_permutation(&file.playlist, len) {
            file.playlist
        } else {
            playlist::build_order(len, self.shuffle)
        };
        self.current = file.current_track.min(len - 1);
        self.repeat = file.repeat_mode;
        self.volume = file.volume.clamp(0.0, 1.0);

        Ok(len)
    }

    /// Turn navigation on; returns false if it was already running
    pub fn start_navigation(&mut self) -> bool {
        let changed = self.navigation.start();
        if changed {
            self.announce("Navigation", "Navigation started".to_string());
        }
        changed
    }

    /// Turn navigation off; returns false if it was already off
    pub fn stop_navigation(&mut self) -> bool {
        let changed = self.navigation.stop();
        if changed {
            self.announce("Navigation", "Navigation stopped".to_string());
        }
        changed
    }

    /// Turn the navigation display on or off; returns the new state
    pub fn toggle_navigation(&mut self) -> bool {
        if self.navigation.active {
            self.stop_navigation();
        } else {
            self.start_navigation();
        }
        self.navigation.active
    }

    /// Select a route; the traffic report is refreshed
    pub fn change_route(&mut self, route: Route) -> &Navigation {
        self.navigation.change_route(route);
        self.announce(
            "Route Change",
            format!(
                "Route changed to {} ({}, traffic: {})",
                route,
                route.eta_label(),
                self.navigation.traffic
            ),
        );
        &self.navigation
    }

    /// Queue a navigation refresh
    pub fn navigation_update(&self) -> Result<()> {
        let log = self.control.event_log().clone();
        let route = self.navigation.route;
        self.control.add_task(Task::new(
            "Navigation Update",
            TaskPriority::Normal,
            move || {
                log.info(format!("Infotainment: Updating navigation ({})", route));
                Ok(())
            },
        ))
    }

    /// Stop playback before the application exits
    pub fn shutdown(&mut self) {
        if std::mem::replace(&mut self.playing, false) {
            self.control.event_log().info("Media stopped");
        }
    }

    fn skip(&mut self, name: &str, advance: impl Fn(usize, usize) -> usize) -> Result<TrackInfo> {
        if self.order.is_empty() {
            return Err(SimError::NoTracks);
        }
        if self.repeat != RepeatMode::One {
            self.current = advance(self.current, self.order.len());
        }

        let track = self.current_track().cloned().ok_or(SimError::NoTracks)?;
        self.announce(name, format!("Switched to: {}", track.title));
        Ok(track)
    }

    fn install_tracks(&mut self, tracks: Vec<TrackInfo>) {
        self.order = playlist::build_order(tracks.len(), self.shuffle);
        self.tracks = tracks;
        self.current = 0;
        self.playing = false;
    }

    /// Log a player action from the task worker
    fn announce(&self, name: &str, message: String) {
        let log = self.control.event_log().clone();
        let task = Task::new(name, TaskPriority::Background, move || {
            log.info(message);
            Ok(())
        });
        // A full queue is already reported by `add_task`.
        let _ = self.control.add_task(task);
    }
}

impl Drop for Infotainment {
    fn drop(&mut self) {
        self.shutdown();
    }
}
