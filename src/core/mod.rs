//! Core protocol — resolutions, queries, pipes, senders, and the driver.

pub mod executor;
pub mod pipe;
pub mod piped;
pub mod query;
pub mod resolution;
pub mod types;

pub use executor::{execute, execute_report, ExecuteError, ExecuteReport};
pub use pipe::{Identity, Map};
pub use piped::Piped;
pub use query::{from_fn, identity, Base, Fixed, FromFn, Requester, Sequence};
pub use resolution::{Pipe, Query, Resolution, Sender};
pub use types::{Phase, ProtocolError, Step};
