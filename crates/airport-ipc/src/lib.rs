// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared IPC types and D-Bus interface definitions for the Airport adapter.
//!
//! This crate defines the protocol between the adapter daemon and the
//! gateway-side property layer that drives it over D-Bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zbus::zvariant::Type;

/// D-Bus service name for the Airport adapter.
pub const DBUS_NAME: &str = "com.airport.Adapter";

/// D-Bus object path for the adapter interface.
pub const DBUS_PATH: &str = "/com/airport/Adapter";

/// D-Bus interface name.
pub const DBUS_INTERFACE: &str = "com.airport.Adapter";

/// Device identifier exposed to the gateway.
pub const DEVICE_ID: &str = "airport";

/// Property carrying the audio-only receiver's output (a sink display name).
pub const AUDIO_OUTPUT_PROPERTY: &str = "audio output";

/// Property carrying the video receiver's audio target.
pub const VIDEO_AUDIO_OUTPUT_PROPERTY: &str = "video audio output";

/// Where the video receiver sends its audio.
///
/// These are fixed targets understood by the video receiver itself; no
/// hardware enumeration is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoAudioOutput {
    Off,
    #[default]
    Analog,
    Hdmi,
}

impl VideoAudioOutput {
    /// All selectable values, in the order they are offered to the user.
    pub const ALL: [VideoAudioOutput; 3] = [Self::Off, Self::Analog, Self::Hdmi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Analog => "analog",
            Self::Hdmi => "hdmi",
        }
    }
}

impl fmt::Display for VideoAudioOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoAudioOutput {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| AdapterError::InvalidSelection(s.to_string()))
    }
}

/// A device property as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
pub struct PropertyInfo {
    /// Property name (e.g. "audio output").
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Current (committed) value.
    pub value: String,
    /// Allowed values.
    pub options: Vec<String>,
}

/// Health of one routing channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Type)]
pub struct ChannelStatusInfo {
    /// "audio" or "video".
    pub channel: String,
    /// "idle", "applying" or "committed".
    pub state: String,
    /// Last contained failure on this channel (empty string = none).
    pub last_error: String,
}

/// Error types for adapter operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("No audio output named {0:?}")]
    SinkNotFound(String),
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Unknown property: {0}")]
    UnknownProperty(String),
    #[error("Adapter has been unloaded")]
    Unloaded,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AdapterError> for zbus::fdo::Error {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::InvalidSelection(_) | AdapterError::UnknownProperty(_) => {
                zbus::fdo::Error::InvalidArgs(e.to_string())
            }
            _ => zbus::fdo::Error::Failed(e.to_string()),
        }
    }
}
