//! Batch query and runner.
//!
//! A batch resolves as one query: it emits each script in order, records
//! each parsed outcome, and, under `stop_on_failure`, completes early after
//! the first non-zero exit. Wrapped in a [`ScriptPipe`], the query never sees
//! prelude lines or raw exec output.
//!
//! Outcomes are keyed by request id, so a batch with a repeated id is
//! rejected with [`ProtocolError::MalformedQuery`] before anything is sent.

use super::pipe::ScriptPipe;
use super::types::{BatchConfig, BatchOutcome, RequestSpec, ScriptOutcome};
use crate::core::{
    execute_report, ExecuteError, ExecuteReport, Phase, Piped, ProtocolError, Query, Resolution,
    Sender, Step,
};
use crate::transport::ExecOutput;

/// Runs a list of scripts, optionally stopping at the first failure.
#[derive(Debug, Clone)]
pub struct BatchQuery {
    pub requests: Vec<RequestSpec>,
    pub stop_on_failure: bool,
}

impl BatchQuery {
    pub fn new(config: &BatchConfig) -> Self {
        BatchQuery {
            requests: config.requests.clone(),
            stop_on_failure: config.policy.stop_on_failure,
        }
    }
}

impl Query for BatchQuery {
    type Request = String;
    type Response = ScriptOutcome;
    type Output = BatchOutcome;
    type Resolution<'a> = BatchResolution<'a>;

    fn resolve(&self) -> BatchResolution<'_> {
        BatchResolution {
            query: self,
            outcome: BatchOutcome::default(),
            cursor: 0,
            phase: Phase::Ready,
        }
    }
}

pub struct BatchResolution<'a> {
    query: &'a BatchQuery,
    outcome: BatchOutcome,
    /// Index of the next request to emit.
    cursor: usize,
    phase: Phase,
}

impl BatchResolution<'_> {
    fn next(&mut self) -> Step<String, BatchOutcome> {
        let done = self.cursor;
        let last_failed = self
            .outcome
            .results
            .last()
            .is_some_and(|(_, o)| !o.success());

        if self.query.stop_on_failure && last_failed {
            self.outcome.skipped = self.query.requests[done..]
                .iter()
                .map(|r| r.id.clone())
                .collect();
            return Step::Completed(std::mem::take(&mut self.outcome));
        }

        match self.query.requests.get(done) {
            Some(req) => Step::Suspended(req.script.clone()),
            None => Step::Completed(std::mem::take(&mut self.outcome)),
        }
    }
}

impl Resolution for BatchResolution<'_> {
    type Request = String;
    type Response = ScriptOutcome;
    type Output = BatchOutcome;

    fn start(&mut self) -> Result<Step<String, BatchOutcome>, ProtocolError> {
        self.phase.begin()?;
        if let Some(id) = duplicate_id(&self.query.requests) {
            self.phase.complete();
            return Err(ProtocolError::MalformedQuery(format!(
                "duplicate request id '{}'",
                id
            )));
        }
        let step = self.next();
        Ok(self.phase.settle(step))
    }

    fn resume(&mut self, outcome: ScriptOutcome) -> Result<Step<String, BatchOutcome>, ProtocolError> {
        self.phase.resume()?;
        let id = self
            .query
            .requests
            .get(self.cursor)
            .map(|r| r.id.clone())
            .ok_or_else(|| {
                ProtocolError::MalformedQuery("response without a pending request".to_string())
            })?;
        self.outcome.results.insert(id, outcome);
        self.cursor += 1;
        let step = self.next();
        Ok(self.phase.settle(step))
    }
}

fn duplicate_id(requests: &[RequestSpec]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    requests
        .iter()
        .map(|r| r.id.as_str())
        .find(|id| !seen.insert(*id))
}

/// Run a batch through its script pipe with the given sender.
pub fn run_batch<S>(
    config: &BatchConfig,
    sender: &mut S,
) -> Result<ExecuteReport<BatchOutcome>, ExecuteError<S::Error>>
where
    S: Sender<String, ExecOutput>,
{
    let query = Piped::new(ScriptPipe::new(&config.pipe), BatchQuery::new(config));
    tracing::info!(
        batch = %config.name,
        requests = config.requests.len(),
        "running batch"
    );
    execute_report(sender, &query)
}
