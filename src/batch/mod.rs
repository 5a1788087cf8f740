//! Script batches — a YAML-described list of shell scripts resolved as a
//! single piped query.

pub mod parser;
pub mod pipe;
pub mod runner;
pub mod types;
