//! Drive → ladder filter → trim signal chain
//!
//! [`SignalChain`] owns one [`LadderFilter`] per prepared channel and a single
//! trim stage whose ramp is shared by all channels. It is driven once per
//! block with a [`ParameterSnapshot`] and processes planar or interleaved
//! buffers in place.
//!
//! Real-time contract for `process*`: no allocation, locking, I/O or logging.

use super::audio::{ChainConfig, Result, MAX_CHANNELS};
use super::denormal::ScopedNoDenormals;
use super::dsp::{params, Saturator, TrimGain};
use super::ladder::LadderFilter;
use super::params::ParameterSnapshot;
use tracing::{debug, info, instrument};

/// Planar multi-channel buffer, one `Vec` per channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl AudioBuffer {
    /// Silent buffer of `num_channels` × `num_samples`
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_samples]; num_channels],
            num_samples,
        }
    }

    /// Wrap existing channel data; channels are truncated to the shortest one
    pub fn from_channels(mut channels: Vec<Vec<f32>>) -> Self {
        let num_samples = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in &mut channels {
            channel.truncate(num_samples);
        }
        Self {
            channels,
            num_samples,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Shrink or grow the active length within the allocated capacity.
    ///
    /// Used by hosts that deliver variable block sizes into a buffer sized
    /// for the maximum.
    pub fn set_num_samples(&mut self, num_samples: usize) {
        for channel in &mut self.channels {
            channel.resize(num_samples, 0.0);
        }
        self.num_samples = num_samples;
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }
}

/// The per-channel processing chain
#[derive(Debug, Default)]
pub struct SignalChain {
    config: Option<ChainConfig>,
    filters: Vec<LadderFilter>,
    trim: TrimGain,
    output_peaks: [f32; MAX_CHANNELS],
    snap_on_next_block: bool,
}

impl SignalChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and build one filter per channel
    #[instrument(skip(self))]
    pub fn prepare(&mut self, config: ChainConfig) -> Result<()> {
        config.validate()?;

        let mut filters = Vec::with_capacity(config.channels as usize);
        for _ in 0..config.channels {
            let mut filter = LadderFilter::new();
            filter.set_drive(LadderFilter::DEFAULT_DRIVE);
            filter.prepare(config.sample_rate, config.max_block_size)?;
            filters.push(filter);
        }

        self.filters = filters;
        self.trim.reset();
        self.output_peaks = [0.0; MAX_CHANNELS];
        self.config = Some(config);
        self.snap_on_next_block = true;

        info!(
            "Signal chain prepared: {} Hz, {} channel(s), max block {}",
            config.sample_rate, config.channels, config.max_block_size
        );
        Ok(())
    }

    /// Free per-stream resources; processing outputs silence until the next
    /// `prepare`
    pub fn release(&mut self) {
        self.filters = Vec::new();
        self.config = None;
        self.output_peaks = [0.0; MAX_CHANNELS];
        debug!("Signal chain released");
    }

    /// Clear filter memories and drop any pending ramps. The next block
    /// starts at its targets.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
        self.trim.reset();
        self.output_peaks = [0.0; MAX_CHANNELS];
        self.snap_on_next_block = true;
    }

    pub fn is_prepared(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&ChainConfig> {
        self.config.as_ref()
    }

    pub fn num_channels(&self) -> usize {
        self.filters.len()
    }

    pub fn filter(&self, channel: usize) -> Option<&LadderFilter> {
        self.filters.get(channel)
    }

    pub fn trim(&self) -> &TrimGain {
        &self.trim
    }

    /// Absolute peak of each channel's output in the last block
    pub fn output_peaks(&self) -> &[f32] {
        &self.output_peaks[..self.filters.len().min(MAX_CHANNELS)]
    }

    /// Process a planar buffer in place
    pub fn process(&mut self, buffer: &mut AudioBuffer, snapshot: &ParameterSnapshot) {
        let _no_denormals = ScopedNoDenormals::new();

        if !self.is_prepared() {
            buffer.clear();
            return;
        }

        let saturator = self.begin_block(snapshot);
        let ramp = self.trim.next_ramp(buffer.num_samples());
        self.output_peaks = [0.0; MAX_CHANNELS];

        for (ch, samples) in buffer.channels_mut().enumerate() {
            let Some(filter) = self.filters.get_mut(ch) else {
                samples.fill(0.0);
                continue;
            };

            saturator.process(samples);
            filter.process(samples);
            ramp.apply_gain(samples.iter_mut());
            self.output_peaks[ch] = peak(samples.iter());
        }
    }

    /// Process interleaved frames of `channels` samples in place.
    ///
    /// A trailing partial frame is left untouched.
    pub fn process_interleaved(
        &mut self,
        data: &mut [f32],
        channels: usize,
        snapshot: &ParameterSnapshot,
    ) {
        let _no_denormals = ScopedNoDenormals::new();

        if channels == 0 {
            return;
        }
        if !self.is_prepared() {
            data.fill(0.0);
            return;
        }

        let frames = data.len() / channels;
        let data = &mut data[..frames * channels];

        let saturator = self.begin_block(snapshot);
        let ramp = self.trim.next_ramp(frames);
        self.output_peaks = [0.0; MAX_CHANNELS];

        for ch in 0..channels {
            let Some(filter) = self.filters.get_mut(ch) else {
                for sample in data.iter_mut().skip(ch).step_by(channels) {
                    *sample = 0.0;
                }
                continue;
            };

            saturator.process_samples(data.iter_mut().skip(ch).step_by(channels));
            filter.process_samples(data.iter_mut().skip(ch).step_by(channels));
            ramp.apply_gain(data.iter_mut().skip(ch).step_by(channels));
            self.output_peaks[ch] = peak(data.iter().skip(ch).step_by(channels));
        }
    }

    /// Push the block's parameters into the stages
    fn begin_block(&mut self, snapshot: &ParameterSnapshot) -> Saturator {
        for filter in &mut self.filters {
            filter.set_cutoff_frequency_hz(snapshot.cutoff_hz);
            filter.set_resonance(snapshot.resonance);
        }
        self.trim.set_gain_decibels(snapshot.trim_db);

        if self.snap_on_next_block {
            for filter in &mut self.filters {
                filter.reset();
            }
            self.trim.reset();
            self.snap_on_next_block = false;
        }

        Saturator::new(snapshot.drive * params::DRIVE_SCALE)
    }
}

#[inline]
fn peak<'a>(samples: impl Iterator<Item = &'a f32>) -> f32 {
    samples.fold(0.0_f32, |acc, s| acc.max(s.abs()))
}

// ============================================================================
// TESTS
// ============================================================================
