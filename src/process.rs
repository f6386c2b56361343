// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Starting and stopping the managed receiver processes.
//!
//! Supervision is by process name: each receiver is expected to be the only
//! process of that name on the host. Launches are fire-and-forget; there is
//! no readiness check and no liveness tracking.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Exit status `killall` uses when no process matched.
const KILLALL_NO_MATCH: i32 = 1;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },
}

/// Everything needed to launch one managed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Process name used for stopping (`killall <name>`).
    pub process_name: String,
    /// Executable to run.
    pub program: PathBuf,
    /// Argument vector, passed without a shell.
    pub args: Vec<String>,
    /// Directory placed on `LD_LIBRARY_PATH` for the child.
    pub library_path: PathBuf,
}

/// Process lifecycle control, kept behind a trait so health checks can be
/// added later without touching the routing controller.
pub trait ProcessSupervisor: Send + Sync {
    /// Terminate every instance of `process_name`.
    ///
    /// Returns false only if the termination request could not be issued;
    /// a process that was not running counts as stopped.
    fn stop(&self, process_name: &str) -> bool;

    /// Launch a process detached from the caller.
    fn start(&self, spec: &LaunchSpec) -> Result<(), LaunchError>;
}

/// Supervisor backed by `killall` and `std::process::Command`.
pub struct SystemSupervisor {
    privileged: bool,
}

impl SystemSupervisor {
    /// `privileged` runs `killall` through `sudo`.
    pub fn new(privileged: bool) -> Self {
        Self { privileged }
    }

    fn kill_command(&self, process_name: &str) -> Command {
        let mut cmd = if self.privileged {
            let mut c = Command::new("sudo");
            c.arg("killall");
            c
        } else {
            Command::new("killall")
        };
        cmd.arg(process_name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl ProcessSupervisor for SystemSupervisor {
    fn stop(&self, process_name: &str) -> bool {
        match self.kill_command(process_name).status() {
            Ok(status) if status.success() => {
                info!("{} stopped", process_name);
                true
            }
            Ok(status) if status.code() == Some(KILLALL_NO_MATCH) => {
                debug!("{} was not running", process_name);
                true
            }
            Ok(status) => {
                // killall ran; anything it could not kill is left for the next stop.
                warn!("killall {} exited with {}", process_name, status);
                true
            }
            Err(e) => {
                warn!("Could not stop {}: {}", process_name, e);
                false
            }
        }
    }

    fn start(&self, spec: &LaunchSpec) -> Result<(), LaunchError> {
        info!("Starting {}: {:?} {:?}", spec.process_name, spec.program, spec.args);

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .env("LD_LIBRARY_PATH", &spec.library_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                name: spec.process_name.clone(),
                source,
            })?;

        debug!("{} spawned with PID: {}", spec.process_name, child.id());

        // Reap in the background so the child never lingers as a zombie.
        let name = spec.process_name.clone();
        thread::spawn(move || match child.wait() {
            Ok(status) => debug!("{} exited with {}", name, status),
            Err(e) => debug!("Lost track of {}: {}", name, e),
        });

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// What a [`RecordingSupervisor`] was asked to do.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Stop(String),
        Start(LaunchSpec),
    }

    /// Records calls instead of touching processes.
    #[derive(Default)]
    pub struct RecordingSupervisor {
        pub calls: Mutex<Vec<Call>>,
        pub fail_starts: bool,
    }

    impl RecordingSupervisor {
        pub fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_starts: true,
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        pub fn starts_of(&self, name: &str) -> Vec<LaunchSpec> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Start(spec) if spec.process_name == name => Some(spec),
                    _ => None,
                })
                .collect()
        }
    }

    impl ProcessSupervisor for RecordingSupervisor {
        fn stop(&self, process_name: &str) -> bool {
            self.calls.lock().push(Call::Stop(process_name.to_string()));
            true
        }

        fn start(&self, spec: &LaunchSpec) -> Result<(), LaunchError> {
            self.calls.lock().push(Call::Start(spec.clone()));
            if self.fail_starts {
                return Err(LaunchError::Spawn {
                    name: spec.process_name.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing binary"),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_start_missing_binary_fails() {
        let supervisor = SystemSupervisor::new(false);
        let spec = LaunchSpec {
            process_name: "airport-test-missing".to_string(),
            program: PathBuf::from("/nonexistent/airport-test-missing"),
            args: vec!["-j".to_string()],
            library_path: PathBuf::from("/nonexistent"),
        };
        assert!(matches!(
            supervisor.start(&spec),
            Err(LaunchError::Spawn { .. })
        ));
    }

    #[test]
    fn test_start_detaches() {
        let supervisor = SystemSupervisor::new(false);
        let spec = LaunchSpec {
            process_name: "true".to_string(),
            program: PathBuf::from("true"),
            args: Vec::new(),
            library_path: PathBuf::from("/tmp"),
        };
        assert!(supervisor.start(&spec).is_ok());
    }

    #[test]
    fn test_kill_command_shape() {
        let cmd = SystemSupervisor::new(true).kill_command("rpiplay");
        assert_eq!(cmd.get_program(), "sudo");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["killall", "rpiplay"]);

        let cmd = SystemSupervisor::new(false).kill_command("shairport");
        assert_eq!(cmd.get_program(), "killall");
    }
}
