//! Ready-made queries: static, base-style, sequences, and factory-built.
//!
//! Each of these is a thin specialization of [`Resolution`]; none adds
//! protocol behavior beyond what the contract already defines.

use super::resolution::{Query, Resolution};
use super::types::{Phase, ProtocolError, Step};
use std::marker::PhantomData;

/// Returns its argument. The default loader for [`Fixed`].
pub fn identity<T>(value: T) -> T {
    value
}

// ============================================================================
// Fixed
// ============================================================================

/// A static query: one request, one loader.
///
/// Emits `request` exactly once and completes with `load(response)`.
pub struct Fixed<Req, Resp, F = fn(Resp) -> Resp> {
    pub request: Req,
    pub load: F,
    _response: PhantomData<fn(Resp)>,
}

impl<Req, Resp> Fixed<Req, Resp> {
    /// A fixed query whose result is the raw response.
    pub fn new(request: Req) -> Self {
        Fixed {
            request,
            load: identity,
            _response: PhantomData,
        }
    }
}

impl<Req, Resp, F> Fixed<Req, Resp, F> {
    pub fn with_loader(request: Req, load: F) -> Self {
        Fixed {
            request,
            load,
            _response: PhantomData,
        }
    }
}

impl<Req: Clone, Resp, T, F: Fn(Resp) -> T> Query for Fixed<Req, Resp, F> {
    type Request = Req;
    type Response = Resp;
    type Output = T;
    type Resolution<'a>
        = FixedResolution<'a, Req, Resp, F>
    where
        Self: 'a;

    fn resolve(&self) -> Self::Resolution<'_> {
        FixedResolution {
            query: self,
            phase: Phase::Ready,
        }
    }
}

pub struct FixedResolution<'a, Req, Resp, F> {
    query: &'a Fixed<Req, Resp, F>,
    phase: Phase,
}

impl<Req: Clone, Resp, T, F: Fn(Resp) -> T> Resolution for FixedResolution<'_, Req, Resp, F> {
    type Request = Req;
    type Response = Resp;
    type Output = T;

    fn start(&mut self) -> Result<Step<Req, T>, ProtocolError> {
        self.phase.begin()?;
        Ok(Step::Suspended(self.query.request.clone()))
    }

    fn resume(&mut self, response: Resp) -> Result<Step<Req, T>, ProtocolError> {
        self.phase.resume()?;
        self.phase.complete();
        Ok(Step::Completed((self.query.load)(response)))
    }
}

// ============================================================================
// Base
// ============================================================================

/// Single-round query described by two methods.
///
/// Every `Base` implementor is a [`Query`]: the resolution emits
/// [`request`](Base::request) once and completes with
/// [`parse`](Base::parse) of the response. `parse` has no default; for a
/// pass-through query use `Requester::new(params, build, identity)`.
pub trait Base {
    type Request;
    type Response;
    type Output;

    fn request(&self) -> Self::Request;

    fn parse(&self, response: Self::Response) -> Self::Output;
}

impl<B: Base> Query for B {
    type Request = B::Request;
    type Response = B::Response;
    type Output = B::Output;
    type Resolution<'a>
        = BaseResolution<'a, B>
    where
        Self: 'a;

    fn resolve(&self) -> Self::Resolution<'_> {
        BaseResolution {
            query: self,
            phase: Phase::Ready,
        }
    }
}

pub struct BaseResolution<'a, B> {
    query: &'a B,
    phase: Phase,
}

impl<B: Base> Resolution for BaseResolution<'_, B> {
    type Request = B::Request;
    type Response = B::Response;
    type Output = B::Output;

    fn start(&mut self) -> Result<Step<B::Request, B::Output>, ProtocolError> {
        self.phase.begin()?;
        Ok(Step::Suspended(self.query.request()))
    }

    fn resume(&mut self, response: B::Response) -> Result<Step<B::Request, B::Output>, ProtocolError> {
        self.phase.resume()?;
        self.phase.complete();
        Ok(Step::Completed(self.query.parse(response)))
    }
}

/// A [`Base`] query assembled from parameters and two functions.
///
/// `build` derives the request from the parameters on every run; `load`
/// turns the response into the result.
pub struct Requester<P, Resp, B, L> {
    pub params: P,
    build: B,
    load: L,
    _response: PhantomData<fn(Resp)>,
}

impl<P, Resp, B, L> Requester<P, Resp, B, L> {
    pub fn new(params: P, build: B, load: L) -> Self {
        Requester {
            params,
            build,
            load,
            _response: PhantomData,
        }
    }
}

impl<P, Req, Resp, T, B, L> Base for Requester<P, Resp, B, L>
where
    B: Fn(&P) -> Req,
    L: Fn(Resp) -> T,
{
    type Request = Req;
    type Response = Resp;
    type Output = T;

    fn request(&self) -> Req {
        (self.build)(&self.params)
    }

    fn parse(&self, response: Resp) -> T {
        (self.load)(response)
    }
}

// ============================================================================
// Sequence
// ============================================================================

/// Emits a fixed list of requests in order and loads the collected responses.
///
/// An empty list completes on start with `load(vec![])`.
pub struct Sequence<Req, Resp, F> {
    pub requests: Vec<Req>,
    load: F,
    _response: PhantomData<fn(Resp)>,
}

impl<Req, Resp> Sequence<Req, Resp, fn(Vec<Resp>) -> Vec<Resp>> {
    /// A sequence whose result is the list of raw responses.
    pub fn new(requests: Vec<Req>) -> Self {
        Self::with_loader(requests, identity)
    }
}

impl<Req, Resp, F> Sequence<Req, Resp, F> {
    pub fn with_loader(requests: Vec<Req>, load: F) -> Self {
        Sequence {
            requests,
            load,
            _response: PhantomData,
        }
    }
}

impl<Req: Clone, Resp, T, F: Fn(Vec<Resp>) -> T> Query for Sequence<Req, Resp, F> {
    type Request = Req;
    type Response = Resp;
    type Output = T;
    type Resolution<'a>
        = SequenceResolution<'a, Req, Resp, F>
    where
        Self: 'a;

    fn resolve(&self) -> Self::Resolution<'_> {
        SequenceResolution {
            query: self,
            responses: Vec::with_capacity(self.requests.len()),
            phase: Phase::Ready,
        }
    }
}

pub struct SequenceResolution<'a, Req, Resp, F> {
    query: &'a Sequence<Req, Resp, F>,
    responses: Vec<Resp>,
    phase: Phase,
}

impl<Req: Clone, Resp, T, F: Fn(Vec<Resp>) -> T> SequenceResolution<'_, Req, Resp, F> {
    fn next(&mut self) -> Step<Req, T> {
        match self.query.requests.get(self.responses.len()) {
            Some(req) => Step::Suspended(req.clone()),
            None => Step::Completed((self.query.load)(std::mem::take(&mut self.responses))),
        }
    }
}

impl<Req: Clone, Resp, T, F: Fn(Vec<Resp>) -> T> Resolution for SequenceResolution<'_, Req, Resp, F> {
    type Request = Req;
    type Response = Resp;
    type Output = T;

    fn start(&mut self) -> Result<Step<Req, T>, ProtocolError> {
        self.phase.begin()?;
        let step = self.next();
        Ok(self.phase.settle(step))
    }

    fn resume(&mut self, response: Resp) -> Result<Step<Req, T>, ProtocolError> {
        self.phase.resume()?;
        self.responses.push(response);
        let step = self.next();
        Ok(self.phase.settle(step))
    }
}

// ============================================================================
// FromFn
// ============================================================================

/// A query whose resolutions come from a factory closure.
///
/// The factory runs once per [`resolve`](Query::resolve) and must return a
/// fresh, unstarted resolution. The returned resolution is guarded: calls
/// out of order are rejected here even if the factory's resolution does not
/// check them itself.
pub struct FromFn<F> {
    factory: F,
}

pub fn from_fn<F, R>(factory: F) -> FromFn<F>
where
    F: Fn() -> R,
    R: Resolution,
{
    FromFn { factory }
}

impl<F, R> Query for FromFn<F>
where
    F: Fn() -> R,
    R: Resolution,
{
    type Request = R::Request;
    type Response = R::Response;
    type Output = R::Output;
    type Resolution<'a>
        = Guarded<R>
    where
        Self: 'a;

    fn resolve(&self) -> Guarded<R> {
        Guarded {
            inner: (self.factory)(),
            phase: Phase::Ready,
        }
    }
}

/// Enforces the start/resume ordering around an arbitrary resolution.
pub struct Guarded<R> {
    inner: R,
    phase: Phase,
}

impl<R: Resolution> Resolution for Guarded<R> {
    type Request = R::Request;
    type Response = R::Response;
    type Output = R::Output;

    fn start(&mut self) -> Result<Step<R::Request, R::Output>, ProtocolError> {
        self.phase.begin()?;
        let step = self.inner.start().map_err(|e| match e {
            ProtocolError::ResolutionAlreadyStarted | ProtocolError::ResolutionAlreadyComplete => {
                ProtocolError::MalformedQuery(
                    "factory returned a resolution that was already started".to_string(),
                )
            }
            other => other,
        })?;
        Ok(self.phase.settle(step))
    }

    fn resume(&mut self, response: R::Response) -> Result<Step<R::Request, R::Output>, ProtocolError> {
        self.phase.resume()?;
        let step = self.inner.resume(response)?;
        Ok(self.phase.settle(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a resolution by hand with a fixed list of responses.
    fn drive<R: Resolution>(
        mut res: R,
        responses: Vec<R::Response>,
    ) -> (Vec<R::Request>, Option<R::Output>) {
        let mut requests = Vec::new();
        let mut step = res.start().unwrap();
        let mut responses = responses.into_iter();
        loop {
            match step {
                Step::Completed(out) => return (requests, Some(out)),
                Step::Suspended(req) => {
                    requests.push(req);
                    match responses.next() {
                        Some(resp) => step = res.resume(resp).unwrap(),
                        None => return (requests, None),
                    }
                }
            }
        }
    }

    #[test]
    fn test_fixed_emits_once() {
        let q: Fixed<&str, String, _> = Fixed::with_loader("GET /", |s: String| s.len());
        let (requests, out) = drive(q.resolve(), vec!["hello".to_string()]);
        assert_eq!(requests, vec!["GET /"]);
        assert_eq!(out, Some(5));
    }

    #[test]
    fn test_fixed_identity_loader() {
        let q: Fixed<u8, String> = Fixed::new(1);
        let (_, out) = drive(q.resolve(), vec!["raw".to_string()]);
        assert_eq!(out.as_deref(), Some("raw"));
    }

    #[test]
    fn test_fixed_resume_after_complete() {
        let q: Fixed<u8, u8> = Fixed::new(1);
        let mut res = q.resolve();
        res.start().unwrap();
        assert_eq!(res.resume(2).unwrap(), Step::Completed(2));
        assert_eq!(res.resume(3), Err(ProtocolError::ResolutionAlreadyComplete));
    }

    #[test]
    fn test_fixed_resume_before_start() {
        let q: Fixed<u8, u8> = Fixed::new(1);
        let mut res = q.resolve();
        assert_eq!(res.resume(3), Err(ProtocolError::ResolutionNotStarted));
    }

    #[test]
    fn test_fixed_resolves_independently() {
        let q: Fixed<u8, u8, _> = Fixed::with_loader(9, |r: u8| r + 1);
        let mut a = q.resolve();
        let mut b = q.resolve();
        assert_eq!(a.start().unwrap(), Step::Suspended(9));
        assert_eq!(b.start().unwrap(), Step::Suspended(9));
        assert_eq!(a.resume(1).unwrap(), Step::Completed(2));
        assert_eq!(b.resume(10).unwrap(), Step::Completed(11));
    }

    struct Lookup {
        user: String,
    }

    impl Base for Lookup {
        type Request = String;
        type Response = String;
        type Output = Vec<String>;

        fn request(&self) -> String {
            format!("/users/{}", self.user)
        }

        fn parse(&self, response: String) -> Vec<String> {
            response.split(',').map(str::to_string).collect()
        }
    }

    #[test]
    fn test_base_query() {
        let q = Lookup {
            user: "ann".to_string(),
        };
        let (requests, out) = drive(q.resolve(), vec!["a,b".to_string()]);
        assert_eq!(requests, vec!["/users/ann".to_string()]);
        assert_eq!(out, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_base_double_start() {
        let q = Lookup {
            user: "ann".to_string(),
        };
        let mut res = q.resolve();
        res.start().unwrap();
        assert_eq!(res.start(), Err(ProtocolError::ResolutionAlreadyStarted));
    }

    #[test]
    fn test_requester_builds_from_params() {
        let q: Requester<_, String, _, _> = Requester::new(
            ("repos", 42u32),
            |(kind, id): &(&str, u32)| format!("/{kind}/{id}"),
            |resp: String| resp.to_uppercase(),
        );
        let (requests, out) = drive(q.resolve(), vec!["ok".to_string()]);
        assert_eq!(requests, vec!["/repos/42".to_string()]);
        assert_eq!(out.as_deref(), Some("OK"));
    }

    #[test]
    fn test_requester_pass_through() {
        let q: Requester<_, String, _, _> =
            Requester::new(7u32, |id: &u32| format!("/items/{id}"), identity);
        let (requests, out) = drive(q.resolve(), vec!["raw".to_string()]);
        assert_eq!(requests, vec!["/items/7".to_string()]);
        assert_eq!(out.as_deref(), Some("raw"));
    }

    #[test]
    fn test_sequence_in_order() {
        let q: Sequence<_, u32, _> = Sequence::with_loader(vec!["a", "b", "c"], |rs: Vec<u32>| rs.iter().sum::<u32>());
        let (requests, out) = drive(q.resolve(), vec![1, 2, 3]);
        assert_eq!(requests, vec!["a", "b", "c"]);
        assert_eq!(out, Some(6));
    }

    #[test]
    fn test_sequence_empty_completes_on_start() {
        let q: Sequence<&str, u32, _> = Sequence::new(vec![]);
        let mut res = q.resolve();
        assert_eq!(res.start().unwrap(), Step::Completed(vec![]));
        assert_eq!(res.resume(1), Err(ProtocolError::ResolutionAlreadyComplete));
    }

    /// A resolution that never checks its own phase.
    struct Sloppy {
        started: bool,
    }

    impl Resolution for Sloppy {
        type Request = u8;
        type Response = u8;
        type Output = u8;

        fn start(&mut self) -> Result<Step<u8, u8>, ProtocolError> {
            if self.started {
                return Err(ProtocolError::ResolutionAlreadyStarted);
            }
            self.started = true;
            Ok(Step::Suspended(0))
        }

        fn resume(&mut self, response: u8) -> Result<Step<u8, u8>, ProtocolError> {
            Ok(Step::Completed(response))
        }
    }

    #[test]
    fn test_from_fn_guards_resume_after_complete() {
        let q = from_fn(|| Sloppy { started: false });
        let mut res = q.resolve();
        assert_eq!(res.start().unwrap(), Step::Suspended(0));
        assert_eq!(res.resume(4).unwrap(), Step::Completed(4));
        assert_eq!(res.resume(5), Err(ProtocolError::ResolutionAlreadyComplete));
    }

    #[test]
    fn test_from_fn_rejects_started_resolution() {
        let q = from_fn(|| Sloppy { started: true });
        let mut res = q.resolve();
        assert!(matches!(res.start(), Err(ProtocolError::MalformedQuery(_))));
    }
}
