//! Snug — transport-agnostic queries, senders, and pipes.
//!
//! A query describes what data is needed as a suspend/resume sequence of
//! requests; a sender decides how each request is fetched; pipes layer
//! request/response rewriting between the two without either side knowing.

pub mod batch;
pub mod cli;
pub mod core;
pub mod transport;
