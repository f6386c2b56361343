// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Running external query commands (aplay, amixer) with a timeout.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Default time an enumeration query may take before it is abandoned.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("{program} failed: {stderr}")]
    Failed { program: String, stderr: String },
}

/// Something that can run a text-producing command and hand back stdout.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, QueryError>;
}

/// Runs commands on the host with an argument vector (never through a shell).
///
/// `run` blocks on `handle`, so it must be called from a blocking thread
/// (`spawn_blocking`), never from inside async code.
pub struct SystemRunner {
    handle: Handle,
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(handle: Handle, timeout: Duration) -> Self {
        Self { handle, timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, QueryError> {
        debug!("Running {} {:?}", program, args);

        let spawn_error = |source: std::io::Error| QueryError::Spawn {
            program: program.to_string(),
            source,
        };

        let child = {
            let _runtime = self.handle.enter();
            // Dropping the child on timeout kills it.
            Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(spawn_error)?
        };

        let waited = self.handle.block_on(async {
            tokio::time::timeout(self.timeout, child.wait_with_output()).await
        });
        let output = match waited {
            Ok(output) => output.map_err(spawn_error)?,
            Err(_) => {
                warn!("{} did not finish within {:?}, killing it", program, self.timeout);
                return Err(QueryError::TimedOut {
                    program: program.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(QueryError::Failed {
                program: program.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Card descriptions are not guaranteed to be UTF-8.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
