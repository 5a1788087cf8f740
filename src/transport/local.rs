//! Local execution transport.

use super::{run_with_stdin, ExecOutput, TransportError};
use crate::core::Sender;
use std::process::Command;

/// Runs each script request with a local shell, script on stdin.
///
/// Defaults to `bash` (not sh/dash) so scripts can use `set -o pipefail`.
#[derive(Debug, Clone)]
pub struct LocalShell {
    pub shell: String,
}

impl Default for LocalShell {
    fn default() -> Self {
        LocalShell {
            shell: "bash".to_string(),
        }
    }
}

impl LocalShell {
    pub fn exec(&self, script: &str) -> Result<ExecOutput, TransportError> {
        run_with_stdin(Command::new(&self.shell), &self.shell, script)
    }
}

impl Sender<String, ExecOutput> for LocalShell {
    type Error = TransportError;

    fn send(&mut self, script: String) -> Result<ExecOutput, TransportError> {
        tracing::debug!(shell = %self.shell, bytes = script.len(), "local exec");
        self.exec(&script)
    }
}
