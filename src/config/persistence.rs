// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Persisted output selection (save/load).

use airport_ipc::VideoAudioOutput;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("No persisted selection at {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to replace state file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// The user's last chosen outputs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingSelection {
    /// Display name of the audio-only receiver's sink.
    #[serde(default)]
    pub audio_output: Option<String>,
    #[serde(default)]
    pub video_audio_output: VideoAudioOutput,
}

impl RoutingSelection {
    /// First-run selection: the first enumerated sink and analog video audio.
    pub fn defaults(first_sink: Option<&str>) -> Self {
        Self {
            audio_output: first_sink.map(str::to_string),
            video_audio_output: VideoAudioOutput::Analog,
        }
    }
}

/// Single-file JSON store for [`RoutingSelection`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the selection. Missing and unreadable files are both errors the
    /// caller answers with defaults.
    pub fn load(&self) -> Result<RoutingSelection, PersistError> {
        if !self.path.exists() {
            return Err(PersistError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let selection = serde_json::from_str(&content)?;
        debug!("Loaded selection from {:?}", self.path);
        Ok(selection)
    }

    /// Overwrite the file with `selection`.
    ///
    /// Writes a sibling temp file, syncs it, then renames it into place.
    pub fn save(&self, selection: &RoutingSelection) -> Result<(), PersistError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(selection)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".persistence")
            .suffix(".json")
            .tempfile_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        debug!("Saved selection to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("persistence.json"));

        for selection in [
            RoutingSelection {
                audio_output: Some("USB DAC".to_string()),
                video_audio_output: VideoAudioOutput::Hdmi,
            },
            RoutingSelection {
                audio_output: None,
                video_audio_output: VideoAudioOutput::Off,
            },
            RoutingSelection {
                audio_output: Some("Built-in \"quoted\" jack".to_string()),
                video_audio_output: VideoAudioOutput::Analog,
            },
        ] {
            store.save(&selection).unwrap();
            assert_eq!(store.load().unwrap(), selection);
        }
    }

    #[test]
    fn test_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("persistence.json"));
        assert!(matches!(store.load(), Err(PersistError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persistence.json");
        fs::write(&path, "{\"audio_output\": ").unwrap();
        assert!(matches!(StateStore::new(&path).load(), Err(PersistError::Json(_))));
    }

    #[test]
    fn test_unknown_video_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persistence.json");
        fs::write(&path, r#"{"audio_output":"x","video_audio_output":"surround"}"#).unwrap();
        assert!(StateStore::new(&path).load().is_err());
    }

    #[test]
    fn test_save_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("airport").join("persistence.json");
        let store = StateStore::new(&path);

        store
            .save(&RoutingSelection::defaults(Some("Built-in headphone jack")))
            .unwrap();
        store
            .save(&RoutingSelection {
                audio_output: Some("USB DAC".to_string()),
                video_audio_output: VideoAudioOutput::Hdmi,
            })
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["audio_output"], "USB DAC");
        assert_eq!(raw["video_audio_output"], "hdmi");

        // Only the state file is left behind.
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_both_keys_written_without_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persistence.json");
        StateStore::new(&path)
            .save(&RoutingSelection::defaults(None))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let keys = raw.as_object().unwrap();
        assert!(keys.contains_key("audio_output"));
        assert!(raw["audio_output"].is_null());
        assert_eq!(raw["video_audio_output"], "analog");
    }

    #[test]
    fn test_defaults() {
        let selection = RoutingSelection::defaults(None);
        assert_eq!(selection.audio_output, None);
        assert_eq!(selection.video_audio_output, VideoAudioOutput::Analog);
    }
}
