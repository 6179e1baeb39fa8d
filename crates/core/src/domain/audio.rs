//! Audio stream abstractions and domain models
//!
//! This module defines the platform-agnostic pieces the signal chain is
//! configured with: stream configuration, channel layouts and device
//! descriptions. Device access itself lives in the `infra` crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// Requested audio device was not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Error in audio stream creation or processing
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Invalid configuration for the chain or a device
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input/Output error at the OS level
    #[error("OS error: {0}")]
    OsError(String),

    /// Channel layout or device setup the chain cannot run with
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Highest channel count a chain can be prepared for (mono or stereo)
pub const MAX_CHANNELS: usize = 2;

/// Number of audio channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCount {
    Mono,
    Stereo,
    Surround(u16),
}

impl ChannelCount {
    pub fn count(&self) -> u16 {
        match self {
            ChannelCount::Mono => 1,
            ChannelCount::Stereo => 2,
            ChannelCount::Surround(n) => *n,
        }
    }

    pub fn from_count(count: u16) -> Self {
        match count {
            1 => ChannelCount::Mono,
            2 => ChannelCount::Stereo,
            n => ChannelCount::Surround(n),
        }
    }
}

/// Main input/output bus layout offered by a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusLayout {
    pub input: ChannelCount,
    pub output: ChannelCount,
}

impl BusLayout {
    pub fn new(input: ChannelCount, output: ChannelCount) -> Self {
        Self { input, output }
    }

    /// Same channel set on both sides
    pub fn symmetric(channels: ChannelCount) -> Self {
        Self::new(channels, channels)
    }

    /// Only mono or stereo, and the input must match the output.
    pub fn is_supported(&self) -> bool {
        matches!(self.output, ChannelCount::Mono | ChannelCount::Stereo) && self.input == self.output
    }
}

/// Stream parameters the chain is prepared with.
///
/// Fixed for the lifetime of a stream; a new `prepare` call is required to
/// change any of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub sample_rate: f32,
    pub channels: u16,
    pub max_block_size: usize,
}

impl ChainConfig {
    pub fn new(sample_rate: f32, channels: u16, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            max_block_size,
        }
    }

    /// Reject configurations the chain cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.max_block_size == 0 {
            return Err(AudioError::InvalidConfiguration(
                "maximum block size must be at least one sample".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(AudioError::InvalidConfiguration(
                "at least one channel is required".to_string(),
            ));
        }
        if self.channels as usize > MAX_CHANNELS {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{} channels requested, only mono and stereo are supported",
                self.channels
            )));
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            channels: 2,
            max_block_size: 512,
        }
    }
}

/// Unique identifier for an audio device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Type of audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Input,
    Output,
    Duplex,
}

/// Information about an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
    pub sample_rates: Vec<u32>,
    pub channel_counts: Vec<ChannelCount>,
    pub default_sample_rate: Option<u32>,
}

/// Trait for enumerating available audio devices
pub trait AudioEnumerator: Send + Sync {
    /// Get all input devices
    fn input_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Get all output devices
    fn output_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Get the default input device
    fn default_input_device(&self) -> Result<DeviceInfo>;

    /// Get the default output device
    fn default_output_device(&self) -> Result<DeviceInfo>;
}
