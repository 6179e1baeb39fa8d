//! Command-line host pieces shared by the `ladder` binary and its tests

pub mod control;
pub mod render;
