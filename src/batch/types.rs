//! Batch file schema.
//!
//! A batch is an ordered list of shell scripts run as one query against a
//! single target, every script passing through the same script pipe.

use crate::transport::{ExecOutput, Target};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Top-level batch.yaml
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Human-readable batch name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Where scripts run; local when absent
    #[serde(default)]
    pub target: Option<Target>,

    /// How every script is prepared and every output parsed
    #[serde(default)]
    pub pipe: PipeConfig,

    /// Scripts, in execution order
    #[serde(default)]
    pub requests: Vec<RequestSpec>,

    #[serde(default)]
    pub policy: Policy,
}

/// One script in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub id: String,
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeConfig {
    /// Lines prepended to every script
    #[serde(default)]
    pub prelude: Vec<String>,

    /// Trim surrounding whitespace from stdout
    #[serde(default = "default_true")]
    pub trim: bool,
}

impl Default for PipeConfig {
    fn default() -> Self {
        PipeConfig {
            prelude: Vec::new(),
            trim: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Skip the remaining scripts after the first non-zero exit
    #[serde(default = "default_true")]
    pub stop_on_failure: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            stop_on_failure: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Results
// ============================================================================

/// A parsed script response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl From<ExecOutput> for ScriptOutcome {
    fn from(out: ExecOutput) -> Self {
        ScriptOutcome {
            exit_code: out.exit_code,
            stdout: out.stdout,
            stderr: out.stderr,
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Outcome per request id, in execution order
    pub results: IndexMap<String, ScriptOutcome>,

    /// Ids never sent because an earlier script failed
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.results.values().filter(|o| !o.success()).count()
    }
}
