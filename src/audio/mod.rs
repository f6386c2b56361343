// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Audio subsystem - ALSA playback sink discovery.

pub mod command;
pub mod enumerate;
pub mod types;

pub use command::{CommandRunner, SystemRunner};
pub use enumerate::SinkEnumerator;
pub use types::AudioSink;
