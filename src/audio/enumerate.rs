// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Playback sink discovery from `aplay -l` and `amixer scontrols`.
//!
//! Parsing is kept in free functions over captured text so hardware quirks
//! live in the replacement table below rather than in control flow.

use super::command::CommandRunner;
use super::types::{AudioSink, MIC_CONTROL, NO_MIXER_CONTROL};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Raw device descriptions of known boards mapped to friendly labels.
///
/// Applied in order as substring replacements; longer raw names that share a
/// prefix with a shorter one must come first.
pub const DISPLAY_NAME_REPLACEMENTS: &[(&str, &str)] = &[
    // Raspberry Pi 4
    ("bcm2835 ALSA", "Built-in headphone jack"),
    ("bcm2835 IEC958/HDMI1", "Built-in video two"),
    ("bcm2835 IEC958/HDMI", "Built-in video"),
    // Raspberry Pi 3
    ("bcm2835 Headphones", "Built-in headphone jack"),
    // ReSpeaker dual microphone hat
    (
        "bcm2835-i2s-wm8960-hifi wm8960-hifi-0",
        "ReSpeaker headphone jack",
    ),
];

fn device_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^card (?P<card>\d+): (?P<hw>[^\[\s]+)\s*\[[^\]]*\], device \d+: [^\[]*\[(?P<desc>[^\]]+)\]",
        )
        .expect("device line pattern is valid")
    })
}

fn control_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'").expect("control pattern is valid"))
}

/// One parsed playback device header, before mixer lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackDevice {
    pub card_id: u32,
    pub device_id: u32,
    pub hardware_name: String,
    pub display_name: String,
}

/// Apply the known-hardware replacement table to a raw device description.
pub fn display_name_for(raw: &str) -> String {
    DISPLAY_NAME_REPLACEMENTS
        .iter()
        .fold(raw.to_string(), |name, (from, to)| name.replace(from, to))
}

/// Parse `aplay -l` output into playback devices.
///
/// Lines that do not look like a card/device header are skipped. The device
/// index is a running count per card: it restarts at 0 whenever the card
/// index differs from the previous header and increments otherwise.
pub fn parse_playback_devices(output: &str) -> Vec<PlaybackDevice> {
    let mut devices = Vec::new();
    let mut previous_card: Option<u32> = None;
    let mut device_id = 0u32;

    for line in output.lines() {
        if !line.starts_with("card ") {
            continue;
        }

        let Some(caps) = device_line_regex().captures(line) else {
            debug!("Skipping unparseable device line: {}", line);
            continue;
        };
        let Ok(card_id) = caps["card"].parse::<u32>() else {
            debug!("Skipping device line with bad card index: {}", line);
            continue;
        };

        let display_name = display_name_for(caps["desc"].trim());
        if display_name.trim().is_empty() {
            continue;
        }

        device_id = match previous_card {
            Some(prev) if prev == card_id => device_id + 1,
            _ => 0,
        };
        previous_card = Some(card_id);

        devices.push(PlaybackDevice {
            card_id,
            device_id,
            hardware_name: caps["hw"].trim().to_string(),
            display_name,
        });
    }

    devices
}

/// Pick the volume control from `amixer -c N scontrols` output.
///
/// Returns the first quoted control that is not the microphone control, or
/// [`NO_MIXER_CONTROL`] if there is none.
pub fn parse_mixer_control(output: &str) -> String {
    output
        .lines()
        .filter_map(|line| control_regex().captures(line))
        .map(|caps| caps[1].to_string())
        .find(|name| name != MIC_CONTROL)
        .unwrap_or_else(|| NO_MIXER_CONTROL.to_string())
}

/// Stateless sink discovery over a [`CommandRunner`].
pub struct SinkEnumerator {
    runner: Arc<dyn CommandRunner>,
}

impl SinkEnumerator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// List playback sinks. Never fails: query errors yield a partial or empty list.
    pub fn enumerate(&self) -> Vec<AudioSink> {
        let listing = match self.runner.run("aplay", &["-l"]) {
            Ok(out) => out,
            Err(e) => {
                warn!("Could not list playback devices: {}", e);
                return Vec::new();
            }
        };

        let mut controls: HashMap<u32, String> = HashMap::new();
        let sinks: Vec<AudioSink> = parse_playback_devices(&listing)
            .into_iter()
            .map(|dev| {
                let mixer_control_name = controls
                    .entry(dev.card_id)
                    .or_insert_with(|| self.mixer_control(dev.card_id))
                    .clone();
                AudioSink {
                    card_id: dev.card_id,
                    device_id: dev.device_id,
                    hardware_name: dev.hardware_name,
                    display_name: dev.display_name,
                    mixer_control_name,
                }
            })
            .collect();

        debug!("Enumerated {} playback sinks", sinks.len());
        sinks
    }

    fn mixer_control(&self, card_id: u32) -> String {
        let card = card_id.to_string();
        match self.runner.run("amixer", &["-c", &card, "scontrols"]) {
            Ok(out) => parse_mixer_control(&out),
            Err(e) => {
                warn!("Could not list mixer controls for card {}: {}", card_id, e);
                NO_MIXER_CONTROL.to_string()
            }
        }
    }
}
