//! Output level metering
//!
//! The audio thread publishes each channel's block peak into a
//! [`LevelMeter`]; a UI or CLI thread folds those peaks into [`AudioLevel`]
//! values with peak hold and decay.

use super::audio::MAX_CHANNELS;
use serde::{Deserialize, Serialize};
use super::params::AtomicF32;

/// Audio level in decibels with a held peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioLevel {
    pub current_db: f32,
    pub peak_db: f32,
}

impl AudioLevel {
    pub const MIN_LEVEL: f32 = -60.0;
    pub const MAX_LEVEL: f32 = 0.0;

    pub fn new() -> Self {
        Self {
            current_db: Self::MIN_LEVEL,
            peak_db: Self::MIN_LEVEL,
        }
    }

    /// Update level with new sample value
    pub fn update(&mut self, sample: f32) {
        let level = if sample.abs() > 0.0 {
            let db = 20.0 * sample.abs().log10();
            db.clamp(Self::MIN_LEVEL, Self::MAX_LEVEL)
        } else {
            Self::MIN_LEVEL
        };

        self.current_db = level;
        self.peak_db = self.peak_db.max(level);
    }

    /// Decay peak level (call periodically)
    pub fn decay_peak(&mut self, amount: f32) {
        self.peak_db = (self.peak_db - amount).max(Self::MIN_LEVEL);
    }
}

impl Default for AudioLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-channel block peaks shared with the audio thread
#[derive(Debug)]
pub struct LevelMeter {
    peaks: [AtomicF32; MAX_CHANNELS],
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            peaks: std::array::from_fn(|_| AtomicF32::new(0.0)),
        }
    }

    /// Store the linear peak of the last block. Channels past the meter's
    /// width are dropped.
    #[inline]
    pub fn publish(&self, channel: usize, peak: f32) {
        if let Some(slot) = self.peaks.get(channel) {
            slot.store(peak);
        }
    }

    /// Linear peak of the last block on `channel`
    pub fn peak(&self, channel: usize) -> f32 {
        self.peaks
            .get(channel)
            .map_or(0.0, AtomicF32::load)
    }

    pub fn clear(&self) {
        for slot in &self.peaks {
            slot.store(0.0);
        }
    }

    /// Fold the latest peaks into `levels`, one entry per channel
    pub fn read_into(&self, levels: &mut [AudioLevel]) {
        for (channel, level) in levels.iter_mut().enumerate() {
            level.update(self.peak(channel));
        }
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}
