//! Resonant four-pole ladder low-pass filter
//!
//! Four trapezoidal (TPT) one-pole low-pass stages in series with a global
//! feedback path from the last stage back to the first:
//!
//! ```text
//! x = gain · tanh(drive · in)
//! u = x − k · (tanh(y4[n−1]) − 0.5 · x)
//! y1..y4 = onepole(u) … onepole(y3)
//! ```
//!
//! Each stage uses `G = g / (1 + g)` with the pre-warped `g = tan(π·fc/fs)`.
//! Both the input and the fed-back signal pass through `tanh`, so the signal
//! entering the ladder is bounded and the cascade of stable one-poles keeps the
//! output bounded for every cutoff and resonance setting.
//!
//! Coefficients are computed once per block and interpolated linearly across
//! it, starting from the values reached at the end of the previous block.

use super::audio::{AudioError, Result};
use super::dsp::{params, BlockRamp};
use std::f32::consts::PI;
use tracing::debug;

/// Number of one-pole stages in the ladder
pub const STAGES: usize = 4;

/// Lifecycle of a filter instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// No sample rate yet; processing produces silence
    Uninitialized,
    /// Prepared for a stream, no block processed since
    Prepared,
    /// At least one block processed
    Processing,
}

/// Memory of one channel's ladder
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterState {
    /// Integrator state of each one-pole stage
    pub stages: [f32; STAGES],
    /// Last output of the fourth stage, read by the feedback path
    pub last_output: f32,
}

impl FilterState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Resonant ladder low-pass filter for a single channel
#[derive(Debug, Clone)]
pub struct LadderFilter {
    sample_rate: f32,
    max_block_size: usize,
    cutoff_hz: f32,
    resonance: f32,
    drive: f32,
    input_gain: f32,
    stage_gain: BlockRamp,
    feedback: BlockRamp,
    state: FilterState,
    processing: ProcessingState,
}

impl LadderFilter {
    pub const DEFAULT_CUTOFF_HZ: f32 = 750.0;
    pub const DEFAULT_RESONANCE: f32 = 0.5;
    pub const DEFAULT_DRIVE: f32 = 1.0;

    /// Feedback amount at full resonance
    pub const MAX_FEEDBACK: f32 = 4.0;

    /// Sample rate assumed for clamping until `prepare` is called
    const FALLBACK_SAMPLE_RATE: f32 = 44100.0;

    pub fn new() -> Self {
        let mut filter = Self {
            sample_rate: Self::FALLBACK_SAMPLE_RATE,
            max_block_size: 0,
            cutoff_hz: Self::DEFAULT_CUTOFF_HZ,
            resonance: Self::DEFAULT_RESONANCE,
            drive: Self::DEFAULT_DRIVE,
            input_gain: input_compensation(Self::DEFAULT_DRIVE),
            stage_gain: BlockRamp::new(0.0),
            feedback: BlockRamp::new(0.0),
            state: FilterState::default(),
            processing: ProcessingState::Uninitialized,
        };
        filter.update_targets();
        filter.snap_coefficients();
        filter
    }

    /// Prepare for a stream.
    ///
    /// Clears the stage memories and re-clamps the cutoff against the new
    /// sample rate. The first block afterwards runs at the target coefficients
    /// without a ramp.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> Result<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.cutoff_hz = self.clamp_cutoff(self.cutoff_hz);
        self.update_targets();
        self.snap_coefficients();
        self.state.clear();
        self.processing = ProcessingState::Prepared;

        debug!(sample_rate, max_block_size, cutoff_hz = self.cutoff_hz, "Ladder filter prepared");
        Ok(())
    }

    /// Back to the unprepared state; processing produces silence until the
    /// next `prepare`.
    pub fn release(&mut self) {
        self.state.clear();
        self.processing = ProcessingState::Uninitialized;
    }

    /// Zero the stage memories, keeping the parameters
    pub fn reset(&mut self) {
        self.state.clear();
        self.snap_coefficients();
        if self.processing == ProcessingState::Processing {
            self.processing = ProcessingState::Prepared;
        }
    }

    pub fn set_cutoff_frequency_hz(&mut self, cutoff_hz: f32) {
        if cutoff_hz.is_nan() {
            return;
        }
        let cutoff_hz = self.clamp_cutoff(cutoff_hz);
        if cutoff_hz != self.cutoff_hz {
            self.cutoff_hz = cutoff_hz;
            self.update_targets();
        }
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        if resonance.is_nan() {
            return;
        }
        let resonance = resonance.clamp(params::RESONANCE_MIN, params::RESONANCE_MAX);
        if resonance != self.resonance {
            self.resonance = resonance;
            self.update_targets();
        }
    }

    /// Pre-filter drive (≥ 1), applied through `tanh` with level compensation
    pub fn set_drive(&mut self, drive: f32) {
        if drive.is_nan() {
            return;
        }
        let drive = drive.max(1.0);
        if drive != self.drive {
            self.drive = drive;
            self.input_gain = input_compensation(drive);
        }
    }

    pub fn cutoff_frequency_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn processing_state(&self) -> ProcessingState {
        self.processing
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.state
    }

    /// Process a single-channel buffer in place
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.process_samples(buffer.iter_mut());
    }

    /// Process one channel given as an iterator over its samples.
    ///
    /// Works the same for a planar slice and for one channel of an
    /// interleaved buffer (`iter_mut().skip(ch).step_by(channels)`).
    pub fn process_samples<'a, I>(&mut self, samples: I)
    where
        I: ExactSizeIterator<Item = &'a mut f32>,
    {
        if self.processing == ProcessingState::Uninitialized {
            for sample in samples {
                *sample = 0.0;
            }
            return;
        }
        self.processing = ProcessingState::Processing;

        let len = samples.len();
        let stage_gain = self.stage_gain.advance(len);
        let feedback = self.feedback.advance(len);
        let drive = self.drive;
        let input_gain = self.input_gain;
        let state = &mut self.state;

        for (i, sample) in samples.enumerate() {
            let g = stage_gain.value_at(i);
            let k = feedback.value_at(i);

            let x = input_gain * (drive * *sample).tanh();
            let mut stage_in = x - k * (state.last_output.tanh() - 0.5 * x);

            for s in state.stages.iter_mut() {
                let v = g * (stage_in - *s);
                let y = v + *s;
                *s = y + v;
                stage_in = y;
            }

            state.last_output = stage_in;
            *sample = stage_in;
        }
    }

    fn clamp_cutoff(&self, cutoff_hz: f32) -> f32 {
        // Below ~20 Hz sample rates the Nyquist limit undercuts the floor
        let max = (self.sample_rate * params::FILTER_MAX_CUTOFF_RATIO).max(f32::MIN_POSITIVE);
        let min = params::FILTER_MIN_CUTOFF_HZ.min(max);
        cutoff_hz.clamp(min, max)
    }

    fn update_targets(&mut self) {
        let g = (PI * self.cutoff_hz / self.sample_rate).tan();
        self.stage_gain.set_target(g / (1.0 + g));
        self.feedback.set_target(Self::MAX_FEEDBACK * self.resonance);
    }

    fn snap_coefficients(&mut self) {
        self.stage_gain.snap();
        self.feedback.snap();
    }
}

impl Default for LadderFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Output level compensation for the `tanh` input drive
fn input_compensation(drive: f32) -> f32 {
    drive.powf(-2.642) * 0.6103 + 0.3903
}

// ============================================================================
// TESTS
// ============================================================================
