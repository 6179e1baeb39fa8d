//! Device I/O for the ladder chain, built on CPAL

pub mod audio;

pub use audio::*;
