//! Script pipe — adds the configured prelude on the way out and turns raw
//! exec output into a [`ScriptOutcome`] on the way back.

use super::types::{PipeConfig, ScriptOutcome};
use crate::core::{Phase, Pipe, ProtocolError, Resolution, Step};
use crate::transport::ExecOutput;

#[derive(Debug, Clone, Default)]
pub struct ScriptPipe {
    prelude: String,
    trim: bool,
}

impl ScriptPipe {
    pub fn new(config: &PipeConfig) -> Self {
        ScriptPipe {
            prelude: config.prelude.join("\n"),
            trim: config.trim,
        }
    }

    /// The script as it will be sent.
    pub fn prepare(&self, script: &str) -> String {
        if self.prelude.is_empty() {
            script.to_string()
        } else {
            format!("{}\n{}", self.prelude, script)
        }
    }

    pub fn parse(&self, raw: ExecOutput) -> ScriptOutcome {
        let mut outcome = ScriptOutcome::from(raw);
        if self.trim {
            outcome.stdout = outcome.stdout.trim().to_string();
        }
        outcome
    }
}

impl Pipe for ScriptPipe {
    type Request = String;
    type Prepared = String;
    type Raw = ExecOutput;
    type Parsed = ScriptOutcome;
    type Resolution<'a> = ScriptRound<'a>;

    fn wrap(&self, script: String) -> ScriptRound<'_> {
        ScriptRound {
            pipe: self,
            script,
            phase: Phase::Ready,
        }
    }
}

pub struct ScriptRound<'a> {
    pipe: &'a ScriptPipe,
    script: String,
    phase: Phase,
}

impl Resolution for ScriptRound<'_> {
    type Request = String;
    type Response = ExecOutput;
    type Output = ScriptOutcome;

    fn start(&mut self) -> Result<Step<String, ScriptOutcome>, ProtocolError> {
        self.phase.begin()?;
        Ok(Step::Suspended(self.pipe.prepare(&self.script)))
    }

    fn resume(&mut self, raw: ExecOutput) -> Result<Step<String, ScriptOutcome>, ProtocolError> {
        self.phase.resume()?;
        self.phase.complete();
        Ok(Step::Completed(self.pipe.parse(raw)))
    }
}
