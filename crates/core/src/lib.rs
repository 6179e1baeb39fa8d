//! Ladder signal chain: drive, resonant four-pole ladder low-pass and trim
//!
//! The crate is platform independent; device I/O lives in `ladder-infra`.

pub mod domain;

pub use domain::*;
