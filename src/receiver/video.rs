// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Video receiver (RPiPlay) launch spec.

use crate::config::InstallPaths;
use crate::process::LaunchSpec;
use airport_ipc::VideoAudioOutput;

/// Process name of the video receiver.
pub const PROCESS_NAME: &str = "rpiplay";

/// Launch spec for the video receiver sending audio to `output`.
///
/// The receiver advertises itself as "<host> video".
pub fn launch_spec(
    paths: &InstallPaths,
    output: VideoAudioOutput,
    host_name: &str,
    verbose: bool,
) -> LaunchSpec {
    let mut args = Vec::with_capacity(8);
    if verbose {
        args.push("-vv".to_string());
    }
    args.extend([
        "-l".to_string(),
        "-a".to_string(),
        output.as_str().to_string(),
        "-b".to_string(),
        "auto".to_string(),
        "-n".to_string(),
        format!("{} video", host_name),
    ]);

    LaunchSpec {
        process_name: PROCESS_NAME.to_string(),
        program: paths.rpiplay_binary(),
        args,
        library_path: paths.rpiplay_dir(),
    }
}
