//! Host-facing processor
//!
//! [`LadderProcessor`] is what an audio host drives: it owns the signal chain,
//! the shared parameter set and the output meter, and exposes the stream
//! lifecycle, block processing and state persistence entry points.

use super::audio::{AudioError, BusLayout, ChainConfig, ChannelCount, Result};
use super::chain::{AudioBuffer, SignalChain};
use super::config;
use super::meter::LevelMeter;
use super::params::ParameterSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Drive → ladder → trim processor
#[derive(Debug)]
pub struct LadderProcessor {
    parameters: Arc<ParameterSet>,
    meter: Arc<LevelMeter>,
    chain: SignalChain,
}

impl LadderProcessor {
    pub const NAME: &'static str = "Ladder";

    pub fn new() -> Self {
        Self::with_parameters(Arc::new(ParameterSet::new()))
    }

    /// Processor reading from an existing parameter set
    pub fn with_parameters(parameters: Arc<ParameterSet>) -> Self {
        Self {
            parameters,
            meter: Arc::new(LevelMeter::new()),
            chain: SignalChain::new(),
        }
    }

    pub fn parameters(&self) -> &Arc<ParameterSet> {
        &self.parameters
    }

    pub fn meter(&self) -> &Arc<LevelMeter> {
        &self.meter
    }

    pub fn chain(&self) -> &SignalChain {
        &self.chain
    }

    /// Mono or stereo main bus, with matching input and output
    pub fn is_layout_supported(layout: &BusLayout) -> bool {
        layout.is_supported()
    }

    #[instrument(skip(self))]
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize, channels: u16) -> Result<()> {
        let layout = BusLayout::symmetric(ChannelCount::from_count(channels));
        if !Self::is_layout_supported(&layout) {
            warn!("Rejected bus layout: {:?}", layout);
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{} channel(s); only mono and stereo are supported",
                channels
            )));
        }

        self.chain
            .prepare(ChainConfig::new(sample_rate, channels, max_block_size))?;
        self.meter.clear();

        info!("{} prepared", Self::NAME);
        Ok(())
    }

    pub fn release(&mut self) {
        self.chain.release();
        self.meter.clear();
        info!("{} released", Self::NAME);
    }

    /// Process a planar host block in place.
    ///
    /// Channels past the prepared count are cleared.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let snapshot = self.parameters.snapshot();
        self.chain.process(buffer, &snapshot);
        self.publish_levels();
    }

    /// Process interleaved frames of `channels` samples in place
    pub fn process_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let snapshot = self.parameters.snapshot();
        self.chain.process_interleaved(data, channels, &snapshot);
        self.publish_levels();
    }

    /// Serialized parameter values for the host to store
    pub fn get_state(&self) -> config::Result<Vec<u8>> {
        self.parameters.save_state()
    }

    /// Restore parameter values saved by [`LadderProcessor::get_state`]
    pub fn set_state(&self, data: &[u8]) -> config::Result<()> {
        self.parameters.load_state(data).map_err(|e| {
            warn!("Ignoring invalid processor state: {}", e);
            e
        })
    }

    /// The chain adds no tail after the input stops
    pub fn tail_length_seconds(&self) -> f64 {
        0.0
    }

    pub fn accepts_midi(&self) -> bool {
        false
    }

    fn publish_levels(&self) {
        for (channel, &peak) in self.chain.output_peaks().iter().enumerate() {
            self.meter.publish(channel, peak);
        }
    }
}

impl Default for LadderProcessor {
    fn default() -> Self {
        Self::new()
    }
}
