//! Shell senders — run script requests locally or over SSH.
//!
//! Each sender takes a script as its request and answers with the captured
//! [`ExecOutput`]. A non-zero exit is a normal response, not a failure; only
//! spawn and I/O problems surface as [`TransportError`].

pub mod local;
pub mod ssh;

use crate::core::Sender;
use serde::{Deserialize, Serialize};

pub use local::LocalShell;
pub use ssh::SshShell;

/// Output from executing a script on a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Failure to run a script at all.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stdin write error: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("wait error: {0}")]
    Wait(#[source] std::io::Error),
}

/// Where scripts run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Network address (IP or DNS)
    pub addr: String,

    /// SSH user
    #[serde(default = "default_user")]
    pub user: String,

    /// Path to SSH private key
    #[serde(default)]
    pub ssh_key: Option<String>,
}

fn default_user() -> String {
    "root".to_string()
}

impl Target {
    pub fn is_local(&self) -> bool {
        is_local_addr(&self.addr)
    }
}

/// Check if an address is this machine.
fn is_local_addr(addr: &str) -> bool {
    if addr == "127.0.0.1" || addr == "localhost" || addr == "::1" {
        return true;
    }
    if let Ok(hostname) = std::fs::read_to_string("/etc/hostname") {
        if addr == hostname.trim() {
            return true;
        }
    }
    false
}

/// A local or SSH shell sender, chosen from a target.
#[derive(Debug, Clone)]
pub enum ShellSender {
    Local(LocalShell),
    Ssh(SshShell),
}

/// Pick the sender for a target: local for loopback or absent targets,
/// SSH otherwise.
pub fn sender_for(target: Option<&Target>) -> ShellSender {
    match target {
        Some(t) if !t.is_local() => ShellSender::Ssh(SshShell::new(t.clone())),
        _ => ShellSender::Local(LocalShell::default()),
    }
}

impl Sender<String, ExecOutput> for ShellSender {
    type Error = TransportError;

    fn send(&mut self, script: String) -> Result<ExecOutput, TransportError> {
        match self {
            ShellSender::Local(s) => s.send(script),
            ShellSender::Ssh(s) => s.send(script),
        }
    }
}

/// Feed `script` to a spawned command's stdin and collect its output.
fn run_with_stdin(
    mut cmd: std::process::Command,
    program: &str,
    script: &str,
) -> Result<ExecOutput, TransportError> {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| TransportError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if let Some(ref mut stdin) = child.stdin {
        stdin
            .write_all(script.as_bytes())
            .map_err(TransportError::Stdin)?;
    }

    let output = child.wait_with_output().map_err(TransportError::Wait)?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{execute, Fixed};

    #[test]
    fn test_transport_local_detection() {
        assert!(is_local_addr("127.0.0.1"));
        assert!(is_local_addr("localhost"));
        assert!(is_local_addr("::1"));
        assert!(!is_local_addr("192.168.1.100"));
        assert!(!is_local_addr("10.0.0.1"));
    }

    #[test]
    fn test_transport_sender_for_local() {
        assert!(matches!(sender_for(None), ShellSender::Local(_)));
        let t = Target {
            addr: "localhost".to_string(),
            user: "root".to_string(),
            ssh_key: None,
        };
        assert!(matches!(sender_for(Some(&t)), ShellSender::Local(_)));
    }

    #[test]
    fn test_transport_sender_for_remote() {
        let t = Target {
            addr: "10.0.0.1".to_string(),
            user: "deploy".to_string(),
            ssh_key: None,
        };
        assert!(matches!(sender_for(Some(&t)), ShellSender::Ssh(_)));
    }

    #[test]
    fn test_transport_target_default_user() {
        let t: Target = serde_yaml_ng::from_str("addr: 10.0.0.1").unwrap();
        assert_eq!(t.user, "root");
        assert!(t.ssh_key.is_none());
    }

    #[test]
    fn test_transport_exec_output_success() {
        let ok = ExecOutput { exit_code: 0, stdout: "ok".into(), stderr: "".into() };
        assert!(ok.success());
        let fail = ExecOutput { exit_code: 1, stdout: "".into(), stderr: "err".into() };
        assert!(!fail.success());
        let sig = ExecOutput { exit_code: 137, stdout: "".into(), stderr: "killed".into() };
        assert!(!sig.success());
    }

    #[test]
    fn test_transport_execute_fixed_locally() {
        let mut sender = sender_for(None);
        let q: Fixed<String, ExecOutput, _> =
            Fixed::with_loader("echo query-test".to_string(), |out: ExecOutput| {
                out.stdout.trim().to_string()
            });
        let out = execute(&mut sender, &q).unwrap();
        assert_eq!(out, "query-test");
    }

    #[test]
    fn test_transport_spawn_error_display() {
        let err = TransportError::Spawn {
            program: "nope".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "failed to spawn nope: not found");
    }
}
