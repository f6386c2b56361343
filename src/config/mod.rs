// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Configuration management: install paths, settings, persisted selection.

pub mod paths;
pub mod persistence;
pub mod settings;

pub use paths::InstallPaths;
pub use persistence::{RoutingSelection, StateStore};
pub use settings::{AdapterSettings, BusKind};
