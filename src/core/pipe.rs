//! Stock pipes.

use super::resolution::{Pipe, Resolution};
use super::types::{Phase, ProtocolError, Step};
use std::marker::PhantomData;

/// Re-emits the request unchanged and returns the raw response unchanged.
///
/// `Piped::new(Identity::new(), q)` behaves exactly like `q`.
pub struct Identity<Req, Resp> {
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> Identity<Req, Resp> {
    pub fn new() -> Self {
        Identity {
            _types: PhantomData,
        }
    }
}

impl<Req, Resp> Default for Identity<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> Pipe for Identity<Req, Resp> {
    type Request = Req;
    type Prepared = Req;
    type Raw = Resp;
    type Parsed = Resp;
    type Resolution<'a>
        = PassRound<Req, Resp>
    where
        Self: 'a;

    fn wrap(&self, request: Req) -> PassRound<Req, Resp> {
        PassRound {
            request: Some(request),
            phase: Phase::Ready,
            _response: PhantomData,
        }
    }
}

pub struct PassRound<Req, Resp> {
    request: Option<Req>,
    phase: Phase,
    _response: PhantomData<fn(Resp)>,
}

impl<Req, Resp> Resolution for PassRound<Req, Resp> {
    type Request = Req;
    type Response = Resp;
    type Output = Resp;

    fn start(&mut self) -> Result<Step<Req, Resp>, ProtocolError> {
        self.phase.begin()?;
        let request = self.request.take().ok_or_else(|| {
            ProtocolError::MalformedPipe("round has no request to emit".to_string())
        })?;
        Ok(Step::Suspended(request))
    }

    fn resume(&mut self, response: Resp) -> Result<Step<Req, Resp>, ProtocolError> {
        self.phase.resume()?;
        self.phase.complete();
        Ok(Step::Completed(response))
    }
}

/// A pipe configured with two functions: `prepare` rewrites the request on
/// the way out, `parse` rewrites the raw response on the way back.
pub struct Map<Req, Raw, F, G> {
    prepare: F,
    parse: G,
    _types: PhantomData<fn(Req, Raw)>,
}

impl<Req, Raw, F, G> Map<Req, Raw, F, G> {
    pub fn new(prepare: F, parse: G) -> Self {
        Map {
            prepare,
            parse,
            _types: PhantomData,
        }
    }
}

impl<Req, Raw, Prepared, Parsed, F, G> Pipe for Map<Req, Raw, F, G>
where
    F: Fn(Req) -> Prepared,
    G: Fn(Raw) -> Parsed,
{
    type Request = Req;
    type Prepared = Prepared;
    type Raw = Raw;
    type Parsed = Parsed;
    type Resolution<'a>
        = MapRound<'a, Req, Raw, F, G>
    where
        Self: 'a;

    fn wrap(&self, request: Req) -> Self::Resolution<'_> {
        MapRound {
            pipe: self,
            request: Some(request),
            phase: Phase::Ready,
        }
    }
}

pub struct MapRound<'a, Req, Raw, F, G> {
    pipe: &'a Map<Req, Raw, F, G>,
    request: Option<Req>,
    phase: Phase,
}

impl<Req, Raw, Prepared, Parsed, F, G> Resolution for MapRound<'_, Req, Raw, F, G>
where
    F: Fn(Req) -> Prepared,
    G: Fn(Raw) -> Parsed,
{
    type Request = Prepared;
    type Response = Raw;
    type Output = Parsed;

    fn start(&mut self) -> Result<Step<Prepared, Parsed>, ProtocolError> {
        self.phase.begin()?;
        let request = self.request.take().ok_or_else(|| {
            ProtocolError::MalformedPipe("round has no request to emit".to_string())
        })?;
        Ok(Step::Suspended((self.pipe.prepare)(request)))
    }

    fn resume(&mut self, raw: Raw) -> Result<Step<Prepared, Parsed>, ProtocolError> {
        self.phase.resume()?;
        self.phase.complete();
        Ok(Step::Completed((self.pipe.parse)(raw)))
    }
}
