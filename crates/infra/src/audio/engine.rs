//! Real-time audio engine for running the ladder chain on live devices
//!
//! The engine resolves devices, prepares a [`LadderProcessor`] for the stream
//! format and keeps the running [`LiveStream`] alive. Parameters and the
//! output meter stay shared with the caller while audio runs.

use super::cpal_backend::{device_name, CpalEnumerator};
use super::stream::{LiveStream, StreamSettings, StreamStats};
use cpal::traits::DeviceTrait;
use ladder_core::domain::audio::{AudioError, Result, MAX_CHANNELS};
use ladder_core::domain::meter::LevelMeter;
use ladder_core::domain::params::ParameterSet;
use ladder_core::domain::processor::LadderProcessor;
use ladder_core::domain::AppConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Devices and format requested for a live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub channels: u16,
}

impl From<&AppConfig> for EngineConfig {
    fn from(app: &AppConfig) -> Self {
        Self {
            input_device: app.input_device.clone(),
            output_device: app.output_device.clone(),
            sample_rate: app.sample_rate,
            buffer_size: app.buffer_size,
            channels: app.channels,
        }
    }
}

/// Audio engine owning the live stream
pub struct AudioEngine {
    enumerator: CpalEnumerator,
    parameters: Arc<ParameterSet>,
    meter: Option<Arc<LevelMeter>>,
    stream: Option<LiveStream>,
}

impl AudioEngine {
    /// Create a new audio engine driving `parameters`
    pub fn new(parameters: Arc<ParameterSet>) -> Self {
        Self {
            enumerator: CpalEnumerator::new(),
            parameters,
            meter: None,
            stream: None,
        }
    }

    pub fn parameters(&self) -> &Arc<ParameterSet> {
        &self.parameters
    }

    /// Output meter of the running stream
    pub fn meter(&self) -> Option<&Arc<LevelMeter>> {
        self.meter.as_ref()
    }

    pub fn stats(&self) -> Option<&Arc<StreamStats>> {
        self.stream.as_ref().map(LiveStream::stats)
    }

    pub fn settings(&self) -> Option<&StreamSettings> {
        self.stream.as_ref().map(LiveStream::settings)
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    pub fn enumerator(&self) -> &CpalEnumerator {
        &self.enumerator
    }

    /// Open the devices and start processing
    #[instrument(skip(self))]
    pub fn start(&mut self, config: &EngineConfig) -> Result<()> {
        if self.is_running() {
            return Err(AudioError::StreamError("Engine already running".to_string()));
        }

        let input = self
            .enumerator
            .find_input_device(config.input_device.as_deref())?;
        let output = self
            .enumerator
            .find_output_device(config.output_device.as_deref())?;
        info!(
            "Starting engine: input={}, output={}",
            device_name(&input),
            device_name(&output)
        );

        let input_channels = Self::input_channels(&input, config.channels);

        let mut processor = LadderProcessor::with_parameters(Arc::clone(&self.parameters));
        processor.prepare(
            config.sample_rate as f32,
            config.buffer_size as usize,
            config.channels,
        )?;
        let meter = Arc::clone(processor.meter());

        let settings = StreamSettings {
            sample_rate: config.sample_rate,
            buffer_size: config.buffer_size,
            channels: config.channels,
            input_channels,
        };
        let stream = LiveStream::start(&input, &output, settings, processor)?;

        self.meter = Some(meter);
        self.stream = Some(stream);
        info!("Audio engine started");
        Ok(())
    }

    /// Stop the streams; the processor is dropped with them
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let stats = stream.stats();
            info!(
                underruns = stats.underruns(),
                overruns = stats.overruns(),
                blocks = stats.blocks(),
                "Stopping audio engine"
            );
        }
        self.meter = None;
    }

    /// Capture channel count: the wanted count if the device offers it,
    /// otherwise the device default (capped at stereo)
    fn input_channels(device: &cpal::Device, wanted: u16) -> u16 {
        let offers_wanted = device
            .supported_input_configs()
            .map(|mut configs| configs.any(|c| c.channels() == wanted))
            .unwrap_or(false);
        if offers_wanted {
            return wanted;
        }

        match device.default_input_config() {
            Ok(config) => {
                let channels = config.channels().clamp(1, MAX_CHANNELS as u16);
                warn!(
                    "Input device does not offer {} channel(s), capturing {}",
                    wanted, channels
                );
                channels
            }
            Err(_) => wanted,
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
