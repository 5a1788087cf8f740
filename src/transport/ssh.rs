//! SSH execution transport.
//!
//! Uses the `ssh` binary directly — no libssh2 dependency.
//! Script is piped to stdin (not passed as argument) to avoid
//! argument length limits and injection vectors.

use super::{run_with_stdin, ExecOutput, Target, TransportError};
use crate::core::Sender;
use std::process::Command;

/// Runs each script request on a remote target through `ssh ... bash`.
#[derive(Debug, Clone)]
pub struct SshShell {
    pub target: Target,
}

impl SshShell {
    pub fn new(target: Target) -> Self {
        SshShell { target }
    }

    /// Arguments passed to `ssh`, in order.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-o",
            "BatchMode=yes",
            "-o",
            "ConnectTimeout=5",
            "-o",
            "StrictHostKeyChecking=accept-new",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if let Some(ref key) = self.target.ssh_key {
            args.push("-i".to_string());
            args.push(expand_home(key));
        }

        args.push(format!("{}@{}", self.target.user, self.target.addr));
        args.push("bash".to_string());
        args
    }
}

/// Expand a leading `~/` to `$HOME/`.
fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home, rest),
        _ => path.to_string(),
    }
}

impl Sender<String, ExecOutput> for SshShell {
    type Error = TransportError;

    fn send(&mut self, script: String) -> Result<ExecOutput, TransportError> {
        tracing::debug!(addr = %self.target.addr, bytes = script.len(), "ssh exec");
        let mut cmd = Command::new("ssh");
        cmd.args(self.args());
        run_with_stdin(cmd, "ssh", &script)
    }
}
