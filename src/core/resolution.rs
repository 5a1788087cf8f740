//! The three capability contracts: resolutions (handles), queries, pipes, and senders.
//!
//! A [`Resolution`] is one run of a suspend/resume sequence. It is started
//! once, yields either a request ([`Step::Suspended`]) or a result
//! ([`Step::Completed`]), and is resumed with exactly one response per
//! emitted request until it completes.
//!
//! A [`Query`] produces a fresh resolution per run; a [`Pipe`] produces a
//! fresh resolution per wrapped request; a [`Sender`] turns one request into
//! one response.

use super::types::{ProtocolError, Step};

/// One run of a suspend/resume sequence.
///
/// Callers must invoke [`start`](Resolution::start) exactly once, then
/// [`resume`](Resolution::resume) once per [`Step::Suspended`]. Resuming a
/// completed resolution returns [`ProtocolError::ResolutionAlreadyComplete`].
/// Dropping a resolution mid-run cancels it.
pub trait Resolution {
    type Request;
    type Response;
    type Output;

    /// Begin the run. Needs no external input.
    fn start(&mut self) -> Result<Step<Self::Request, Self::Output>, ProtocolError>;

    /// Deliver the response to the most recently emitted request.
    fn resume(
        &mut self,
        response: Self::Response,
    ) -> Result<Step<Self::Request, Self::Output>, ProtocolError>;
}

impl<R: Resolution + ?Sized> Resolution for Box<R> {
    type Request = R::Request;
    type Response = R::Response;
    type Output = R::Output;

    fn start(&mut self) -> Result<Step<Self::Request, Self::Output>, ProtocolError> {
        (**self).start()
    }

    fn resume(
        &mut self,
        response: Self::Response,
    ) -> Result<Step<Self::Request, Self::Output>, ProtocolError> {
        (**self).resume(response)
    }
}

/// Describes what data is needed, independent of how it is fetched.
///
/// Each call to [`resolve`](Query::resolve) returns an independent
/// resolution; a query holds no mutable state between runs.
pub trait Query {
    type Request;
    type Response;
    type Output;

    type Resolution<'a>: Resolution<
        Request = Self::Request,
        Response = Self::Response,
        Output = Self::Output,
    >
    where
        Self: 'a;

    fn resolve(&self) -> Self::Resolution<'_>;
}

/// Middleware around a single request/response round.
///
/// [`wrap`](Pipe::wrap) receives the request an inner query emitted and
/// returns a resolution that suspends with prepared requests, is resumed
/// with raw responses, and completes with the parsed response handed back
/// to the inner query. The resolution must suspend at least once.
pub trait Pipe {
    type Request;
    type Prepared;
    type Raw;
    type Parsed;

    type Resolution<'a>: Resolution<
        Request = Self::Prepared,
        Response = Self::Raw,
        Output = Self::Parsed,
    >
    where
        Self: 'a;

    fn wrap(&self, request: Self::Request) -> Self::Resolution<'_>;
}

/// Turns one request into one response, synchronously.
///
/// Blocking I/O, retries, and timeouts all live behind this trait. Any
/// `FnMut(Req) -> Result<Resp, E>` closure is a sender.
pub trait Sender<Req, Resp> {
    type Error;

    fn send(&mut self, request: Req) -> Result<Resp, Self::Error>;
}

impl<F, Req, Resp, E> Sender<Req, Resp> for F
where
    F: FnMut(Req) -> Result<Resp, E>,
{
    type Error = E;

    fn send(&mut self, request: Req) -> Result<Resp, E> {
        self(request)
    }
}
