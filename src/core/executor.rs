//! The driver — runs a query to completion against a sender.
//!
//! `execute` owns the only loop in the protocol: start the resolution, send
//! each emitted request, feed each response back, stop on completion. There
//! is no retry and no recovery. A sender failure ends the run immediately and
//! the query is never resumed with a made-up value.

use super::resolution::{Query, Resolution, Sender};
use super::types::{ProtocolError, Step};
use std::time::{Duration, Instant};

/// Why an execution stopped without a result.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError<E> {
    /// The query or one of its pipes broke the resolution contract.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The sender failed; the error is passed through untouched.
    #[error("sender failed: {0}")]
    Sender(#[source] E),
}

impl<E> ExecuteError<E> {
    /// The sender's own error, if that is what stopped the run.
    pub fn into_sender_error(self) -> Option<E> {
        match self {
            ExecuteError::Sender(e) => Some(e),
            ExecuteError::Protocol(_) => None,
        }
    }

    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            ExecuteError::Protocol(e) => Some(e),
            ExecuteError::Sender(_) => None,
        }
    }
}

/// Result of a run plus how it went.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteReport<T> {
    pub output: T,
    /// Request/response rounds the sender served.
    pub rounds: u32,
    pub duration: Duration,
}

/// Execute a query: resolve it, sending every request through `sender`.
pub fn execute<Q, S>(sender: &mut S, query: &Q) -> Result<Q::Output, ExecuteError<S::Error>>
where
    Q: Query,
    S: Sender<Q::Request, Q::Response>,
{
    execute_report(sender, query).map(|report| report.output)
}

/// Like [`execute`], also reporting the number of rounds and elapsed time.
pub fn execute_report<Q, S>(
    sender: &mut S,
    query: &Q,
) -> Result<ExecuteReport<Q::Output>, ExecuteError<S::Error>>
where
    Q: Query,
    S: Sender<Q::Request, Q::Response>,
{
    let start = Instant::now();
    let mut resolution = query.resolve();
    let mut step = resolution.start()?;
    let mut rounds = 0u32;

    loop {
        match step {
            Step::Completed(output) => {
                let duration = start.elapsed();
                tracing::debug!(rounds, ?duration, "query resolved");
                return Ok(ExecuteReport {
                    output,
                    rounds,
                    duration,
                });
            }
            Step::Suspended(request) => {
                rounds += 1;
                tracing::debug!(round = rounds, "sending request");
                let response = sender.send(request).map_err(|e| {
                    tracing::debug!(round = rounds, "sender failed");
                    ExecuteError::Sender(e)
                })?;
                step = resolution.resume(response)?;
            }
        }
    }
}
