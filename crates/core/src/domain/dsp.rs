//! Digital Signal Processing building blocks for the ladder chain
//!
//! This module provides the stateless and lightly stateful stages that sit
//! around the ladder filter:
//! - Arctangent soft-clip saturator with level compensation
//! - Trim gain with per-block linear ramping
//! - Block ramps shared by every smoothed value in the chain
//!
//! All stages are designed for:
//! - Zero allocations in the hot path
//! - In-place processing of f32 samples
//! - Per-block parameter updates

use std::f32::consts::FRAC_2_PI;

/// Parameter constraints for DSP stages
///
/// All parameters are clamped to these ranges to prevent
/// invalid states and ensure numerical stability.
pub mod params {
    /// Drive control range (user facing units)
    pub const DRIVE_MIN: f32 = 0.0;
    pub const DRIVE_MAX: f32 = 10.0;

    /// Factor between the drive control and the waveshaper drive amount
    pub const DRIVE_SCALE: f32 = 5.0;

    /// Cutoff control range (Hz)
    pub const CUTOFF_MIN_HZ: f32 = 20.0;
    pub const CUTOFF_MAX_HZ: f32 = 20000.0;

    /// Lowest cutoff the filter accepts regardless of the control range
    pub const FILTER_MIN_CUTOFF_HZ: f32 = 10.0;

    /// Highest cutoff as a fraction of the sample rate (just below Nyquist)
    pub const FILTER_MAX_CUTOFF_RATIO: f32 = 0.49;

    /// Resonance range (normalized feedback)
    pub const RESONANCE_MIN: f32 = 0.0;
    pub const RESONANCE_MAX: f32 = 1.0;

    /// Trim range (dB)
    pub const TRIM_DB_MIN: f32 = -36.0;
    pub const TRIM_DB_MAX: f32 = 36.0;
}

/// Convert decibels to a linear amplitude factor
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear amplitude factor to decibels (floored at -100 dB)
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 1e-5 {
        -100.0
    } else {
        20.0 * gain.log10()
    }
}

// ============================================================================
// BLOCK RAMPS
// ============================================================================

/// Linear segment covering one block.
///
/// Sample `i` of the block sees `start + step * (i + 1)`, so the last sample
/// lands exactly on the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    start: f32,
    step: f32,
}

impl Ramp {
    /// A ramp that holds one value for the whole block
    pub fn constant(value: f32) -> Self {
        Self {
            start: value,
            step: 0.0,
        }
    }

    #[inline]
    pub fn value_at(&self, index: usize) -> f32 {
        self.start + self.step * (index + 1) as f32
    }

    pub fn is_constant(&self) -> bool {
        self.step == 0.0
    }

    /// Multiply each sample by the ramped value
    #[inline]
    pub fn apply_gain<'a, I>(&self, samples: I)
    where
        I: Iterator<Item = &'a mut f32>,
    {
        if self.is_constant() {
            if self.start == 1.0 {
                return;
            }
            for sample in samples {
                *sample *= self.start;
            }
            return;
        }

        for (i, sample) in samples.enumerate() {
            *sample *= self.value_at(i);
        }
    }
}

/// Ramp handed out by [`TrimGain::next_ramp`]
pub type GainRamp = Ramp;

/// Value that travels linearly to its target over the next block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRamp {
    current: f32,
    target: f32,
}

impl BlockRamp {
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Value reached at the end of the last block
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Jump straight to the target
    pub fn snap(&mut self) {
        self.current = self.target;
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Ramp for a block of `len` samples; afterwards the value is settled.
    ///
    /// An empty block leaves the ramp where it is.
    pub fn advance(&mut self, len: usize) -> Ramp {
        if len == 0 || self.is_settled() {
            return Ramp::constant(self.current);
        }

        let ramp = Ramp {
            start: self.current,
            step: (self.target - self.current) / len as f32,
        };
        self.current = self.target;
        ramp
    }
}

// ============================================================================
// SATURATOR
// ============================================================================

/// Arctangent soft clipper with drive-dependent gain compensation.
///
/// `y = (2/π) · atan(10^(0.05·d) · x) · 1.5 · 10^(-0.04·d)`
///
/// The input factor turns the drive amount into pre-gain (every +20 drive is
/// ×10), the output factor pulls the level back down as the curve saturates,
/// and 1.5 makes up for the loss of the curve's initial slope.
///
/// The drive-dependent factors are computed once in [`Saturator::new`] so a
/// block can be shaped without any `powf` in the inner loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturator {
    drive: f32,
    input_gain: f32,
    output_gain: f32,
}

impl Saturator {
    /// Fixed make-up on the saturation curve
    pub const MAKEUP: f32 = 1.5;

    pub fn new(drive: f32) -> Self {
        Self {
            drive,
            input_gain: 10.0_f32.powf(drive * 0.05),
            output_gain: Self::MAKEUP * 10.0_f32.powf(-drive * 0.04),
        }
    }

    /// Shape a single sample. Pure; intended for reference and tests.
    pub fn apply(sample: f32, drive: f32) -> f32 {
        Self::new(drive).process_sample(sample)
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    #[inline]
    pub fn process_sample(&self, sample: f32) -> f32 {
        FRAC_2_PI * (self.input_gain * sample).atan() * self.output_gain
    }

    /// Shape a buffer in place
    pub fn process(&self, buffer: &mut [f32]) {
        self.process_samples(buffer.iter_mut());
    }

    #[inline]
    pub fn process_samples<'a, I>(&self, samples: I)
    where
        I: Iterator<Item = &'a mut f32>,
    {
        for sample in samples {
            *sample = self.process_sample(*sample);
        }
    }
}

impl Default for Saturator {
    fn default() -> Self {
        Self::new(0.0)
    }
}

// ============================================================================
// TRIM GAIN
// ============================================================================

/// Output trim in decibels.
///
/// A gain change is reached through a linear ramp over the following block,
/// starting from the gain applied on the last sample of the previous block.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimGain {
    gain_db: f32,
    gain: BlockRamp,
}

impl TrimGain {
    pub fn new(gain_db: f32) -> Self {
        let gain_db = gain_db.clamp(params::TRIM_DB_MIN, params::TRIM_DB_MAX);
        Self {
            gain_db,
            gain: BlockRamp::new(db_to_gain(gain_db)),
        }
    }

    /// Set the trim in dB; takes effect over the next block
    pub fn set_gain_decibels(&mut self, gain_db: f32) {
        if gain_db.is_nan() {
            return;
        }
        let gain_db = gain_db.clamp(params::TRIM_DB_MIN, params::TRIM_DB_MAX);
        if gain_db != self.gain_db {
            self.gain_db = gain_db;
            self.gain.set_target(db_to_gain(gain_db));
        }
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Target linear gain
    pub fn gain_linear(&self) -> f32 {
        self.gain.target()
    }

    /// Linear gain applied on the last processed sample
    pub fn current_gain(&self) -> f32 {
        self.gain.current()
    }

    /// Ramp for the next block of `len` samples.
    ///
    /// Apply the returned ramp to every channel of the block so all channels
    /// see the same gain trajectory.
    pub fn next_ramp(&mut self, len: usize) -> GainRamp {
        self.gain.advance(len)
    }

    /// Process a single-channel buffer in place
    pub fn process(&mut self, buffer: &mut [f32]) {
        let ramp = self.next_ramp(buffer.len());
        ramp.apply_gain(buffer.iter_mut());
    }

    /// Drop any pending ramp
    pub fn reset(&mut self) {
        self.gain.snap();
    }
}

impl Default for TrimGain {
    fn default() -> Self {
        Self::new(0.0)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE_RATE: f32 = 48000.0;

    fn generate_test_signal(samples: usize, frequency: f32) -> Vec<f32> {
        (0..samples)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Ramp Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_block_ramp_reaches_target_on_last_sample() {
        let mut ramp = BlockRamp::new(0.0);
        ramp.set_target(1.0);

        let segment = ramp.advance(4);
        assert!((segment.value_at(0) - 0.25).abs() < 1e-6);
        assert!((segment.value_at(3) - 1.0).abs() < 1e-6);
        assert!(ramp.is_settled());

        // Settled ramps hold their value
        let segment = ramp.advance(4);
        assert!(segment.is_constant());
        assert_eq!(segment.value_at(10), 1.0);
    }

    #[test]
    fn test_block_ramp_empty_block_keeps_pending_target() {
        let mut ramp = BlockRamp::new(0.5);
        ramp.set_target(2.0);

        let segment = ramp.advance(0);
        assert!(segment.is_constant());
        assert!(!ramp.is_settled());
        assert_eq!(ramp.current(), 0.5);
    }

    // -------------------------------------------------------------------------
    // Saturator Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_saturator_zero_drive_near_identity() {
        // 1.5 * 2/pi ~= 0.955 slope at the origin
        for &x in &[0.001_f32, 0.005, -0.003, 0.01] {
            let y = Saturator::apply(x, 0.0);
            assert!((y / x - 1.5 * FRAC_2_PI).abs() < 0.01);
            assert!((y - x).abs() < 0.05 * x.abs());
        }
        assert_eq!(Saturator::apply(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_saturator_bounded_output() {
        let sat = Saturator::new(50.0);
        let bound = Saturator::MAKEUP * 10.0_f32.powf(-50.0 * 0.04);

        for &x in &[-100.0_f32, -1.0, 0.5, 1.0, 1000.0] {
            let y = sat.process_sample(x);
            assert!(y.is_finite());
            assert!(y.abs() <= bound);
        }
    }

    #[test]
    fn test_saturator_matches_formula() {
        let drive = 12.5_f32;
        let x = 0.3_f32;
        let expected = FRAC_2_PI
            * (10.0_f32.powf(drive * 0.05) * x).atan()
            * 1.5
            * 10.0_f32.powf(-drive * 0.04);
        assert!((Saturator::apply(x, drive) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_saturator_process_buffer() {
        let sat = Saturator::new(20.0);
        let mut signal = generate_test_signal(256, 440.0);
        let original = signal.clone();

        sat.process(&mut signal);

        for (out, inp) in signal.iter().zip(original.iter()) {
            assert!((out - sat.process_sample(*inp)).abs() < f32::EPSILON);
        }
    }

    proptest! {
        #[test]
        fn prop_saturator_odd_symmetric(x in -4.0_f32..4.0, drive in 0.0_f32..50.0) {
            let pos = Saturator::apply(x, drive);
            let neg = Saturator::apply(-x, drive);
            prop_assert_eq!(neg, -pos);
        }

        #[test]
        fn prop_saturator_monotonic(a in -4.0_f32..4.0, b in -4.0_f32..4.0, drive in 0.0_f32..50.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Saturator::apply(lo, drive) <= Saturator::apply(hi, drive));
        }
    }

    // -------------------------------------------------------------------------
    // Trim Gain Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_trim_unity_is_identity() {
        let mut trim = TrimGain::new(0.0);
        let mut signal = generate_test_signal(512, 1000.0);
        let original = signal.clone();

        trim.process(&mut signal);

        assert_eq!(signal, original);
    }

    #[test]
    fn test_trim_clamping() {
        let mut trim = TrimGain::new(100.0);
        assert_eq!(trim.gain_db(), params::TRIM_DB_MAX);

        trim.set_gain_decibels(-100.0);
        assert_eq!(trim.gain_db(), params::TRIM_DB_MIN);

        trim.set_gain_decibels(f32::NAN);
        assert_eq!(trim.gain_db(), params::TRIM_DB_MIN);
    }

    #[test]
    fn test_trim_change_is_ramped() {
        let mut trim = TrimGain::new(0.0);
        trim.set_gain_decibels(-6.0);

        let mut signal = vec![1.0_f32; 100];
        trim.process(&mut signal);

        // Starts near unity, ends at the target, never jumps
        let target = db_to_gain(-6.0);
        assert!(signal[0] > 0.99);
        assert!((signal[99] - target).abs() < 1e-5);
        for pair in signal.windows(2) {
            assert!(pair[1] <= pair[0]);
            assert!((pair[0] - pair[1]).abs() < 0.01);
        }

        // The next block holds the target
        let mut next = vec![1.0_f32; 100];
        trim.process(&mut next);
        assert!(next.iter().all(|&s| (s - target).abs() < 1e-5));
    }

    #[test]
    fn test_trim_reset_skips_ramp() {
        let mut trim = TrimGain::new(0.0);
        trim.set_gain_decibels(6.0);
        trim.reset();

        let mut signal = vec![0.5_f32; 16];
        trim.process(&mut signal);

        let expected = 0.5 * db_to_gain(6.0);
        assert!(signal.iter().all(|&s| (s - expected).abs() < 1e-5));
    }

    #[test]
    fn test_db_conversion() {
        assert!((db_to_gain(0.0) - 1.0).abs() < f32::EPSILON);
        assert!((db_to_gain(-6.0) - 0.501187).abs() < 0.001);
        assert!((gain_to_db(db_to_gain(12.0)) - 12.0).abs() < 0.001);
        assert_eq!(gain_to_db(0.0), -100.0);
    }
}
