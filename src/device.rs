// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Device-facing state: the "airport" thing and its selectable properties.

use airport_ipc::{
    PropertyInfo, VideoAudioOutput, AUDIO_OUTPUT_PROPERTY, DEVICE_ID, VIDEO_AUDIO_OUTPUT_PROPERTY,
};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, warn};

/// Notifications for the host boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    PropertyChanged { name: String, value: String },
}

/// One enumerated string property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub label: String,
    pub options: Vec<String>,
    pub value: String,
}

impl Property {
    fn to_info(&self) -> PropertyInfo {
        PropertyInfo {
            name: self.name.clone(),
            label: self.label.clone(),
            value: self.value.clone(),
            options: self.options.clone(),
        }
    }
}

/// The single device this adapter exposes.
#[derive(Debug)]
pub struct AirportDevice {
    pub id: String,
    pub title: String,
    pub description: String,
    properties: Vec<Property>,
    notifier: Option<tokio_mpsc::UnboundedSender<DeviceEvent>>,
}

impl Default for AirportDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl AirportDevice {
    /// A device with no properties yet.
    pub fn new() -> Self {
        Self {
            id: DEVICE_ID.to_string(),
            title: "Airport".to_string(),
            description: "Airport streaming".to_string(),
            properties: Vec::new(),
            notifier: None,
        }
    }

    /// Expose the audio-only output selector.
    pub fn with_audio_output(mut self, options: Vec<String>, value: Option<&str>) -> Self {
        self.properties.push(Property {
            name: AUDIO_OUTPUT_PROPERTY.to_string(),
            label: "Audio-only output".to_string(),
            options,
            value: value.unwrap_or_default().to_string(),
        });
        self
    }

    /// Expose the video receiver's audio selector.
    pub fn with_video_audio_output(mut self, value: VideoAudioOutput) -> Self {
        self.properties.push(Property {
            name: VIDEO_AUDIO_OUTPUT_PROPERTY.to_string(),
            label: "Video audio output".to_string(),
            options: VideoAudioOutput::ALL
                .iter()
                .map(|v| v.as_str().to_string())
                .collect(),
            value: value.as_str().to_string(),
        });
        self
    }

    pub fn set_notifier(&mut self, tx: tokio_mpsc::UnboundedSender<DeviceEvent>) {
        self.notifier = Some(tx);
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn properties(&self) -> Vec<PropertyInfo> {
        self.properties.iter().map(Property::to_info).collect()
    }

    /// Set a property's value and notify observers.
    ///
    /// Returns false if the device does not expose `name`.
    pub fn update(&mut self, name: &str, value: &str) -> bool {
        let Some(property) = self.properties.iter_mut().find(|p| p.name == name) else {
            debug!("Device has no property {:?}, not updating", name);
            return false;
        };
        property.value = value.to_string();

        if let Some(ref tx) = self.notifier {
            let event = DeviceEvent::PropertyChanged {
                name: name.to_string(),
                value: value.to_string(),
            };
            if tx.send(event).is_err() {
                warn!("Property change for {:?} has no listener", name);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_only_when_enabled() {
        let device = AirportDevice::new().with_video_audio_output(VideoAudioOutput::Analog);
        assert!(!device.has_property(AUDIO_OUTPUT_PROPERTY));
        let video = device.property(VIDEO_AUDIO_OUTPUT_PROPERTY).unwrap();
        assert_eq!(video.options, vec!["off", "analog", "hdmi"]);
        assert_eq!(video.value, "analog");
    }

    #[test]
    fn test_update_notifies() {
        let (tx, mut rx) = tokio_mpsc::unbounded_channel();
        let mut device = AirportDevice::new().with_audio_output(
            vec!["Built-in headphone jack".to_string(), "USB DAC".to_string()],
            Some("Built-in headphone jack"),
        );
        device.set_notifier(tx);

        assert!(device.update(AUDIO_OUTPUT_PROPERTY, "USB DAC"));
        assert_eq!(device.property(AUDIO_OUTPUT_PROPERTY).unwrap().value, "USB DAC");
        assert_eq!(
            rx.try_recv().unwrap(),
            DeviceEvent::PropertyChanged {
                name: AUDIO_OUTPUT_PROPERTY.to_string(),
                value: "USB DAC".to_string(),
            }
        );
    }

    #[test]
    fn test_update_unknown_property() {
        let (tx, mut rx) = tokio_mpsc::unbounded_channel();
        let mut device = AirportDevice::new();
        device.set_notifier(tx);
        assert!(!device.update("volume", "11"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_property_info() {
        let device = AirportDevice::new().with_audio_output(Vec::new(), None);
        let info = device.properties();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].label, "Audio-only output");
        assert_eq!(info[0].value, "");
    }
}
