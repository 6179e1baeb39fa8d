//! Platform-specific audio backend implementations using CPAL
//!
//! This module provides cross-platform audio support through CPAL, which abstracts
//! platform-specific APIs:
//! - Windows: WASAPI
//! - Linux: ALSA/PulseAudio
//! - macOS: CoreAudio

pub mod cpal_backend;
pub mod engine;
pub mod lockfree_buffer;
pub mod stream;

pub use cpal_backend::CpalEnumerator;
pub use engine::{AudioEngine, EngineConfig};
pub use lockfree_buffer::{sample_ring, RingConsumer, RingProducer};
pub use stream::{LiveStream, StreamSettings, StreamStats};
