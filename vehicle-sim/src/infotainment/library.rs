//! Media library scanning

use crate::config::InfotainmentConfig;
use crate::types::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Information about a media track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub path: PathBuf,
    /// File name without extension
    pub title: String,
    pub artist: String,
    /// Duration in seconds (0.0 when unknown)
    pub duration: f64,
    /// Lower-case file extension, e.g. "mp3"
    pub format: String,
}

impl TrackInfo {
    /// Build track info from a media file path, if the extension is supported
    pub fn from_path(path: &Path, config: &InfotainmentConfig) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if !config.accepts_extension(&extension) {
            return None;
        }
        let title = path.file_stem()?.to_string_lossy().into_owned();

        Some(Self {
            path: path.to_path_buf(),
            title,
            artist: "Unknown".to_string(),
            duration: 0.0,
            format: extension,
        })
    }
}

/// Scan `directory` (non-recursively) for supported, non-empty media files.
///
/// Unreadable entries are skipped with a warning; the result is sorted by
/// file name so track order is stable across platforms.
pub fn scan_directory(directory: &Path, config: &InfotainmentConfig) -> Result<Vec<TrackInfo>> {
    log::debug!("Scanning media directory: {:?}", directory);

    let mut tracks = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {:?}: {}", directory, e);
                continue;
            }
        };

        let path = entry.path();
        let Some(track) = TrackInfo::from_path(&path, config) else {
            continue;
        };

        match entry.metadata() {
            Ok(meta) if meta.is_file() && meta.len() > 0 => tracks.push(track),
            Ok(_) => log::debug!("Skipping empty or non-regular file: {:?}", path),
            Err(e) => log::warn!("Error loading file {:?}: {}", path, e),
        }
    }

    tracks.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    log::debug!("Found {} track(s) in {:?}", tracks.len(), directory);
    Ok(tracks)
}
