//! Piped composition — one pipe layered over one inner query.
//!
//! Every request the inner query emits opens a fresh pipe round. The pipe's
//! prepared requests are what the outer driver sees; the raw responses the
//! driver delivers go back into the pipe. When the round completes, its
//! parsed result is what the inner query receives as its response.
//!
//! The inner query therefore sees `P::Parsed`, not the raw response: the
//! type system ties `Q::Response` to `P::Parsed`.

use super::resolution::{Pipe, Query, Resolution};
use super::types::{ProtocolError, Step};

/// A query with a pipe modifying its requests and responses.
pub struct Piped<P, Q> {
    pub pipe: P,
    pub inner: Q,
}

impl<P, Q> Piped<P, Q> {
    pub fn new(pipe: P, inner: Q) -> Self {
        Piped { pipe, inner }
    }
}

impl<P, Q> Query for Piped<P, Q>
where
    P: Pipe,
    Q: Query<Request = P::Request, Response = P::Parsed>,
{
    type Request = P::Prepared;
    type Response = P::Raw;
    type Output = Q::Output;
    type Resolution<'a>
        = PipedResolution<'a, P, Q>
    where
        Self: 'a;

    fn resolve(&self) -> Self::Resolution<'_> {
        PipedResolution {
            pipe: &self.pipe,
            inner: self.inner.resolve(),
            stage: Stage::Ready,
        }
    }
}

/// Where the piped resolution currently stands.
enum Stage<R> {
    /// Not started.
    Ready,
    /// A pipe round is open and waiting for a raw response.
    Round(R),
    /// The inner query completed, or a step failed.
    Complete,
}

pub struct PipedResolution<'a, P, Q>
where
    P: Pipe + 'a,
    Q: Query + 'a,
{
    pipe: &'a P,
    inner: Q::Resolution<'a>,
    stage: Stage<P::Resolution<'a>>,
}

impl<'a, P, Q> PipedResolution<'a, P, Q>
where
    P: Pipe + 'a,
    Q: Query<Request = P::Request, Response = P::Parsed> + 'a,
{
    /// Act on what the inner query just did: finish with its result, or
    /// open a pipe round for its request and surface the first prepared one.
    ///
    /// Expects `stage` to be `Complete` on entry; it is only moved back to
    /// `Round` once the new round has suspended.
    fn advance(
        &mut self,
        step: Step<Q::Request, Q::Output>,
    ) -> Result<Step<P::Prepared, Q::Output>, ProtocolError> {
        let request = match step {
            Step::Completed(out) => {
                tracing::trace!("piped: inner query completed");
                return Ok(Step::Completed(out));
            }
            Step::Suspended(request) => request,
        };

        let pipe: &'a P = self.pipe;
        let mut round = pipe.wrap(request);
        let started = round.start().map_err(|e| match e {
            ProtocolError::ResolutionAlreadyStarted | ProtocolError::ResolutionAlreadyComplete => {
                ProtocolError::MalformedPipe(
                    "wrap returned a resolution that was already started".to_string(),
                )
            }
            other => other,
        })?;

        match started {
            Step::Suspended(prepared) => {
                tracing::trace!("piped: pipe round opened");
                self.stage = Stage::Round(round);
                Ok(Step::Suspended(prepared))
            }
            Step::Completed(_) => Err(ProtocolError::PipeProducedNoRequest),
        }
    }
}

impl<'a, P, Q> Resolution for PipedResolution<'a, P, Q>
where
    P: Pipe + 'a,
    Q: Query<Request = P::Request, Response = P::Parsed> + 'a,
{
    type Request = P::Prepared;
    type Response = P::Raw;
    type Output = Q::Output;

    fn start(&mut self) -> Result<Step<P::Prepared, Q::Output>, ProtocolError> {
        match std::mem::replace(&mut self.stage, Stage::Complete) {
            Stage::Ready => {}
            Stage::Round(round) => {
                self.stage = Stage::Round(round);
                return Err(ProtocolError::ResolutionAlreadyStarted);
            }
            Stage::Complete => return Err(ProtocolError::ResolutionAlreadyComplete),
        }
        let step = self.inner.start()?;
        self.advance(step)
    }

    fn resume(&mut self, response: P::Raw) -> Result<Step<P::Prepared, Q::Output>, ProtocolError> {
        let mut round = match std::mem::replace(&mut self.stage, Stage::Complete) {
            Stage::Round(round) => round,
            Stage::Ready => {
                self.stage = Stage::Ready;
                return Err(ProtocolError::ResolutionNotStarted);
            }
            Stage::Complete => return Err(ProtocolError::ResolutionAlreadyComplete),
        };

        match round.resume(response)? {
            Step::Suspended(prepared) => {
                self.stage = Stage::Round(round);
                Ok(Step::Suspended(prepared))
            }
            Step::Completed(parsed) => {
                tracing::trace!("piped: pipe round closed");
                let step = self.inner.resume(parsed)?;
                self.advance(step)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipe::{Identity, Map};
    use crate::core::query::{from_fn, Fixed, Sequence};
    use crate::core::types::Phase;

    /// Prepends a header to the request, strips a suffix from the response.
    fn header_pipe() -> Map<String, String, impl Fn(String) -> String, impl Fn(String) -> String> {
        Map::new(
            |req: String| format!("HEADER:{req}"),
            |raw: String| raw.strip_suffix(";END").unwrap_or(&raw).to_string(),
        )
    }

    #[test]
    fn test_piped_rewrites_request_and_response() {
        let q: Fixed<String, String> = Fixed::new("X".to_string());
        let piped = Piped::new(header_pipe(), q);
        let mut res = piped.resolve();
        assert_eq!(res.start().unwrap(), Step::Suspended("HEADER:X".to_string()));
        assert_eq!(
            res.resume("payload;END".to_string()).unwrap(),
            Step::Completed("payload".to_string())
        );
    }

    #[test]
    fn test_piped_fresh_round_per_inner_request() {
        let q: Sequence<String, String, _> = Sequence::new(vec!["a".to_string(), "b".to_string()]);
        let piped = Piped::new(header_pipe(), q);
        let mut res = piped.resolve();
        assert_eq!(res.start().unwrap(), Step::Suspended("HEADER:a".to_string()));
        assert_eq!(
            res.resume("1;END".to_string()).unwrap(),
            Step::Suspended("HEADER:b".to_string())
        );
        assert_eq!(
            res.resume("2;END".to_string()).unwrap(),
            Step::Completed(vec!["1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn test_piped_zero_request_query_skips_pipe() {
        let q: Sequence<u32, u32, _> = Sequence::with_loader(vec![], |_rs: Vec<u32>| 42);
        let piped = Piped::new(Identity::<u32, u32>::new(), q);
        let mut res = piped.resolve();
        assert_eq!(res.start().unwrap(), Step::Completed(42));
        assert_eq!(res.resume(1), Err(ProtocolError::ResolutionAlreadyComplete));
    }

    #[test]
    fn test_piped_resume_before_start() {
        let q: Fixed<u32, u32> = Fixed::new(1);
        let piped = Piped::new(Identity::<u32, u32>::new(), q);
        let mut res = piped.resolve();
        assert_eq!(res.resume(1), Err(ProtocolError::ResolutionNotStarted));
    }

    #[test]
    fn test_piped_resume_after_complete() {
        let q: Fixed<u32, u32> = Fixed::new(1);
        let piped = Piped::new(Identity::<u32, u32>::new(), q);
        let mut res = piped.resolve();
        res.start().unwrap();
        assert_eq!(res.resume(5).unwrap(), Step::Completed(5));
        assert_eq!(res.resume(6), Err(ProtocolError::ResolutionAlreadyComplete));
    }

    /// A pipe that never suspends.
    struct Silent;

    struct SilentRound;

    impl Resolution for SilentRound {
        type Request = u32;
        type Response = u32;
        type Output = u32;

        fn start(&mut self) -> Result<Step<u32, u32>, ProtocolError> {
            Ok(Step::Completed(0))
        }

        fn resume(&mut self, _response: u32) -> Result<Step<u32, u32>, ProtocolError> {
            Err(ProtocolError::ResolutionAlreadyComplete)
        }
    }

    impl Pipe for Silent {
        type Request = u32;
        type Prepared = u32;
        type Raw = u32;
        type Parsed = u32;
        type Resolution<'a> = SilentRound;

        fn wrap(&self, _request: u32) -> SilentRound {
            SilentRound
        }
    }

    #[test]
    fn test_piped_pipe_without_request() {
        let q: Fixed<u32, u32> = Fixed::new(1);
        let piped = Piped::new(Silent, q);
        let mut res = piped.resolve();
        assert_eq!(res.start(), Err(ProtocolError::PipeProducedNoRequest));
        assert_eq!(res.resume(1), Err(ProtocolError::ResolutionAlreadyComplete));
    }

    /// A pipe that asks for a token before every request.
    struct Authenticated;

    struct AuthRound {
        request: String,
        token: Option<String>,
        phase: Phase,
    }

    impl Resolution for AuthRound {
        type Request = String;
        type Response = String;
        type Output = String;

        fn start(&mut self) -> Result<Step<String, String>, ProtocolError> {
            self.phase.begin()?;
            Ok(Step::Suspended("TOKEN?".to_string()))
        }

        fn resume(&mut self, response: String) -> Result<Step<String, String>, ProtocolError> {
            self.phase.resume()?;
            match self.token.take() {
                None => {
                    self.token = Some(response.clone());
                    Ok(Step::Suspended(format!("{}|{}", response, self.request)))
                }
                Some(_) => {
                    self.phase.complete();
                    Ok(Step::Completed(response.to_lowercase()))
                }
            }
        }
    }

    impl Pipe for Authenticated {
        type Request = String;
        type Prepared = String;
        type Raw = String;
        type Parsed = String;
        type Resolution<'a> = AuthRound;

        fn wrap(&self, request: String) -> AuthRound {
            AuthRound {
                request,
                token: None,
                phase: Phase::Ready,
            }
        }
    }

    #[test]
    fn test_piped_multi_suspend_pipe_hides_intermediates() {
        let q: Sequence<String, String, _> = Sequence::new(vec!["q1".to_string(), "q2".to_string()]);
        let piped = Piped::new(Authenticated, q);
        let mut res = piped.resolve();

        let mut seen = Vec::new();
        let mut raw = vec!["tok", "A", "tok", "B"].into_iter();
        let mut step = res.start().unwrap();
        while let Step::Suspended(req) = step {
            seen.push(req);
            step = res.resume(raw.next().unwrap().to_string()).unwrap();
        }

        assert_eq!(seen, vec!["TOKEN?", "tok|q1", "TOKEN?", "tok|q2"]);
        assert_eq!(step, Step::Completed(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_piped_over_factory_query() {
        let q = from_fn(|| Authenticated.wrap("q".to_string()));
        let piped = Piped::new(header_pipe(), q);
        let mut res = piped.resolve();
        assert_eq!(res.start().unwrap(), Step::Suspended("HEADER:TOKEN?".to_string()));
        assert_eq!(
            res.resume("tok;END".to_string()).unwrap(),
            Step::Suspended("HEADER:tok|q".to_string())
        );
        assert_eq!(
            res.resume("OK;END".to_string()).unwrap(),
            Step::Completed("ok".to_string())
        );
    }

    /// Hands out rounds that have already been started.
    struct Prestarted;

    impl Pipe for Prestarted {
        type Request = String;
        type Prepared = String;
        type Raw = String;
        type Parsed = String;
        type Resolution<'a> = AuthRound;

        fn wrap(&self, request: String) -> AuthRound {
            let mut round = Authenticated.wrap(request);
            let _ = round.start();
            round
        }
    }

    #[test]
    fn test_piped_wrap_returning_started_round() {
        let q: Fixed<String, String> = Fixed::new("X".to_string());
        let piped = Piped::new(Prestarted, q);
        let mut res = piped.resolve();
        assert!(matches!(res.start(), Err(ProtocolError::MalformedPipe(_))));
        assert_eq!(
            res.resume("tok".to_string()),
            Err(ProtocolError::ResolutionAlreadyComplete)
        );
    }

    #[test]
    fn test_piped_second_start_keeps_open_round() {
        let q: Fixed<String, String> = Fixed::new("q".to_string());
        let piped = Piped::new(Authenticated, q);
        let mut res = piped.resolve();
        assert_eq!(res.start().unwrap(), Step::Suspended("TOKEN?".to_string()));
        assert_eq!(res.start(), Err(ProtocolError::ResolutionAlreadyStarted));
        assert_eq!(
            res.resume("tok".to_string()).unwrap(),
            Step::Suspended("tok|q".to_string())
        );
        assert_eq!(
            res.resume("DONE".to_string()).unwrap(),
            Step::Completed("done".to_string())
        );
    }
}
