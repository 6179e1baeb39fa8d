//! Domain entities and business rules

pub mod audio;
pub mod chain;
pub mod config;
pub mod denormal;
pub mod dsp;
pub mod ladder;
pub mod meter;
pub mod params;
pub mod processor;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{
    AudioEnumerator, AudioError, BusLayout, ChainConfig, ChannelCount, DeviceId, DeviceInfo,
    DeviceType, MAX_CHANNELS,
};
pub use chain::{AudioBuffer, SignalChain};
pub use config::{AppConfig, ConfigError, ConfigManager, LadderConfig, Preset, PresetManager};
pub use denormal::ScopedNoDenormals;
pub use dsp::{db_to_gain, gain_to_db, GainRamp, Saturator, TrimGain};
pub use ladder::{FilterState, LadderFilter, ProcessingState};
pub use meter::{AudioLevel, LevelMeter};
pub use params::{ParamId, ParamRange, Parameter, ParameterSet, ParameterSnapshot, ParameterValues};
pub use processor::LadderProcessor;
