//! Protocol vocabulary — steps, resolution phases, and contract violations.

use std::fmt;

/// The state a resolution reports after `start` or `resume`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<Req, T> {
    /// Paused, waiting for the response to this request.
    Suspended(Req),
    /// Finished with a result. The resolution must not be resumed again.
    Completed(T),
}

impl<Req, T> Step<Req, T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Step::Completed(_))
    }

    /// The emitted request, if suspended.
    pub fn request(&self) -> Option<&Req> {
        match self {
            Step::Suspended(req) => Some(req),
            Step::Completed(_) => None,
        }
    }

    /// Transform the emitted request, leaving a completed result untouched.
    pub fn map_request<R2>(self, f: impl FnOnce(Req) -> R2) -> Step<R2, T> {
        match self {
            Step::Suspended(req) => Step::Suspended(f(req)),
            Step::Completed(out) => Step::Completed(out),
        }
    }

    /// Transform the completed result, leaving a suspension untouched.
    pub fn map_output<U>(self, f: impl FnOnce(T) -> U) -> Step<Req, U> {
        match self {
            Step::Suspended(req) => Step::Suspended(req),
            Step::Completed(out) => Step::Completed(f(out)),
        }
    }
}

/// Contract violations raised by resolutions and the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("resolution resumed after it already completed")]
    ResolutionAlreadyComplete,

    #[error("resolution started twice")]
    ResolutionAlreadyStarted,

    #[error("resolution resumed before it was started")]
    ResolutionNotStarted,

    #[error("pipe completed without emitting a request")]
    PipeProducedNoRequest,

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("malformed pipe: {0}")]
    MalformedPipe(String),
}

/// Lifecycle of a single resolution.
///
/// Hand-written resolutions keep one of these next to their own state and
/// call [`Phase::begin`], [`Phase::resume`], and [`Phase::complete`] at the
/// matching transitions; the phase turns every out-of-order call into the
/// right [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Created, not yet started.
    #[default]
    Ready,
    /// Waiting for the response to an emitted request.
    Suspended,
    /// Finished; any further call is an error.
    Complete,
}

impl Phase {
    /// Transition out of `Ready`. Call from `start`.
    pub fn begin(&mut self) -> Result<(), ProtocolError> {
        match self {
            Phase::Ready => {
                *self = Phase::Suspended;
                Ok(())
            }
            Phase::Suspended => Err(ProtocolError::ResolutionAlreadyStarted),
            Phase::Complete => Err(ProtocolError::ResolutionAlreadyComplete),
        }
    }

    /// Check that a response is expected. Call at the top of `resume`.
    pub fn resume(&self) -> Result<(), ProtocolError> {
        match self {
            Phase::Suspended => Ok(()),
            Phase::Ready => Err(ProtocolError::ResolutionNotStarted),
            Phase::Complete => Err(ProtocolError::ResolutionAlreadyComplete),
        }
    }

    pub fn complete(&mut self) {
        *self = Phase::Complete;
    }

    /// Record `step` and hand it back: completion moves to `Complete`,
    /// suspension stays (or becomes) `Suspended`.
    pub fn settle<Req, T>(&mut self, step: Step<Req, T>) -> Step<Req, T> {
        *self = if step.is_completed() {
            Phase::Complete
        } else {
            Phase::Suspended
        };
        step
    }

    pub fn is_complete(&self) -> bool {
        *self == Phase::Complete
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Ready => write!(f, "ready"),
            Phase::Suspended => write!(f, "suspended"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}
