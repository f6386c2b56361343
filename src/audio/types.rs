// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Audio sink type definitions.

/// Mixer control name used when a card has no usable (non-microphone) control.
pub const NO_MIXER_CONTROL: &str = "none";

/// Mixer control that is never used for output volume.
pub const MIC_CONTROL: &str = "mic";

/// A discovered hardware playback endpoint (ALSA card + device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSink {
    /// ALSA card index, stable within a session.
    pub card_id: u32,
    /// Zero-based index of this device within its card.
    pub device_id: u32,
    /// Short card identifier used in hardware addresses (e.g. `Headphones`).
    pub hardware_name: String,
    /// Label the user selects by.
    pub display_name: String,
    /// Volume control to drive, or [`NO_MIXER_CONTROL`].
    pub mixer_control_name: String,
}

impl AudioSink {
    /// ALSA device-open target for this sink.
    pub fn hardware_address(&self) -> String {
        format!("plughw:CARD={},DEV={}", self.hardware_name, self.device_id)
    }

    pub fn has_mixer_control(&self) -> bool {
        self.mixer_control_name != NO_MIXER_CONTROL
    }
}

/// Unique display names in enumeration order, as offered to the user.
pub fn display_options(sinks: &[AudioSink]) -> Vec<String> {
    let mut options: Vec<String> = Vec::with_capacity(sinks.len());
    for sink in sinks {
        if !options.contains(&sink.display_name) {
            options.push(sink.display_name.clone());
        }
    }
    options
}
