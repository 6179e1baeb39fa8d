//! Lock-free parameter store
//!
//! The control side (CLI, presets, host state restore) writes parameters at
//! any time; the audio thread reads one [`ParameterSnapshot`] per block. Each
//! value lives in an `AtomicU32` holding the f32 bit pattern, so reads and
//! writes never block and the latest write wins.

use super::config::{ConfigError, Result};
use super::dsp::params;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, instrument};

/// Version written into saved state blobs
pub const STATE_VERSION: u32 = 1;

/// Identifier of a chain parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamId {
    Drive,
    Cutoff,
    Resonance,
    Trim,
}

impl ParamId {
    pub const ALL: [ParamId; 4] = [
        ParamId::Drive,
        ParamId::Cutoff,
        ParamId::Resonance,
        ParamId::Trim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamId::Drive => "drive",
            ParamId::Cutoff => "cutoff",
            ParamId::Resonance => "resonance",
            ParamId::Trim => "trim",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        ParamId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::Invalid(format!("unknown parameter: {}", s)))
    }
}

// ============================================================================
// RANGES
// ============================================================================

/// Value range with optional step snapping and a skewed normalized mapping.
///
/// A skew below 1 spends more of the normalized range on low values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    /// Snap interval, 0 for continuous
    pub step: f32,
    pub skew: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            step: 0.0,
            skew: 1.0,
        }
    }

    pub const fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub const fn with_skew(mut self, skew: f32) -> Self {
        self.skew = skew;
        self
    }

    /// Choose the skew so that `midpoint` sits at normalized 0.5
    pub fn with_skew_from_midpoint(self, midpoint: f32) -> Self {
        let proportion = (midpoint - self.min) / (self.max - self.min);
        self.with_skew(0.5_f32.ln() / proportion.ln())
    }

    /// Snap to the step grid and clamp into the range
    pub fn clamp(&self, value: f32) -> f32 {
        let snapped = if self.step > 0.0 {
            self.min + self.step * ((value - self.min) / self.step).round()
        } else {
            value
        };
        snapped.clamp(self.min, self.max)
    }

    pub fn to_normalized(&self, value: f32) -> f32 {
        let proportion = ((self.clamp(value) - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let mut proportion = normalized.clamp(0.0, 1.0);
        if self.skew != 1.0 && proportion > 0.0 {
            proportion = (proportion.ln() / self.skew).exp();
        }
        self.clamp(self.min + (self.max - self.min) * proportion)
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// f32 stored as its bit pattern in an `AtomicU32`
#[derive(Debug)]
pub(crate) struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub(crate) fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub(crate) fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// One automatable parameter: its description and current value
#[derive(Debug)]
pub struct Parameter {
    id: ParamId,
    name: &'static str,
    unit: &'static str,
    range: ParamRange,
    default: f32,
    value: AtomicF32,
}

impl Parameter {
    fn new(id: ParamId, name: &'static str, unit: &'static str, range: ParamRange, default: f32) -> Self {
        Self {
            id,
            name,
            unit,
            range,
            default,
            value: AtomicF32::new(default),
        }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn range(&self) -> &ParamRange {
        &self.range
    }

    pub fn default_value(&self) -> f32 {
        self.default
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load()
    }

    /// Store a new value, clamped into range. NaN is ignored.
    pub fn set(&self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.value.store(self.range.clamp(value));
    }

    pub fn normalized(&self) -> f32 {
        self.range.to_normalized(self.get())
    }

    pub fn set_normalized(&self, normalized: f32) {
        if normalized.is_nan() {
            return;
        }
        self.value.store(self.range.from_normalized(normalized));
    }

    pub fn reset_to_default(&self) {
        self.value.store(self.default);
    }

    /// Format a value the way a control would show it
    pub fn display_value(&self, value: f32) -> String {
        let text = if self.range.step >= 1.0 {
            format!("{:.0}", value)
        } else {
            format!("{:.2}", value)
        };
        if self.unit.is_empty() {
            text
        } else {
            format!("{} {}", text, self.unit)
        }
    }

    /// Parse user text, accepting an optional unit suffix
    pub fn parse_value(&self, text: &str) -> Option<f32> {
        let text = text.trim();
        let split = text
            .len()
            .checked_sub(self.unit.len())
            .filter(|&i| !self.unit.is_empty() && text.is_char_boundary(i));
        let number = match split {
            Some(i) if text[i..].eq_ignore_ascii_case(self.unit) => text[..i].trim_end(),
            _ => text,
        };
        number.parse::<f32>().ok().filter(|v| v.is_finite())
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.display_value(self.get()))
    }
}

/// Values of every parameter read at one point in time.
///
/// The same shape is stored in presets and config files, where missing
/// fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSnapshot {
    pub drive: f32,
    pub cutoff_hz: f32,
    pub resonance: f32,
    pub trim_db: f32,
}

/// Parameter values as stored in presets and configuration files
pub type ParameterValues = ParameterSnapshot;

impl ParameterSnapshot {
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::Drive => self.drive,
            ParamId::Cutoff => self.cutoff_hz,
            ParamId::Resonance => self.resonance,
            ParamId::Trim => self.trim_db,
        }
    }

    pub fn set(&mut self, id: ParamId, value: f32) {
        match id {
            ParamId::Drive => self.drive = value,
            ParamId::Cutoff => self.cutoff_hz = value,
            ParamId::Resonance => self.resonance = value,
            ParamId::Trim => self.trim_db = value,
        }
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            drive: 0.0,
            cutoff_hz: 750.0,
            resonance: 0.5,
            trim_db: 0.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateBlob {
    version: u32,
    parameters: BTreeMap<String, f32>,
}

/// The four chain parameters, shared between the control and audio threads
#[derive(Debug)]
pub struct ParameterSet {
    parameters: [Parameter; 4],
}

impl ParameterSet {
    pub fn new() -> Self {
        let defaults = ParameterSnapshot::default();
        Self {
            parameters: [
                Parameter::new(
                    ParamId::Drive,
                    "Drive",
                    "",
                    ParamRange::new(params::DRIVE_MIN, params::DRIVE_MAX),
                    defaults.drive,
                ),
                Parameter::new(
                    ParamId::Cutoff,
                    "Cutoff",
                    "Hz",
                    ParamRange::new(params::CUTOFF_MIN_HZ, params::CUTOFF_MAX_HZ)
                        .with_step(1.0)
                        .with_skew_from_midpoint(750.0),
                    defaults.cutoff_hz,
                ),
                Parameter::new(
                    ParamId::Resonance,
                    "Resonance",
                    "",
                    ParamRange::new(params::RESONANCE_MIN, params::RESONANCE_MAX),
                    defaults.resonance,
                ),
                Parameter::new(
                    ParamId::Trim,
                    "Trim",
                    "dB",
                    ParamRange::new(params::TRIM_DB_MIN, params::TRIM_DB_MAX),
                    defaults.trim_db,
                ),
            ],
        }
    }

    pub fn parameter(&self, id: ParamId) -> &Parameter {
        &self.parameters[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.parameter(id).get()
    }

    pub fn set(&self, id: ParamId, value: f32) {
        self.parameter(id).set(value);
    }

    pub fn set_normalized(&self, id: ParamId, normalized: f32) {
        self.parameter(id).set_normalized(normalized);
    }

    /// Read every parameter once; called at the top of each block
    #[inline]
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            drive: self.get(ParamId::Drive),
            cutoff_hz: self.get(ParamId::Cutoff),
            resonance: self.get(ParamId::Resonance),
            trim_db: self.get(ParamId::Trim),
        }
    }

    /// Store a full set of values, each clamped into its range
    pub fn apply(&self, values: &ParameterValues) {
        for id in ParamId::ALL {
            self.set(id, values.get(id));
        }
    }

    pub fn reset_to_defaults(&self) {
        for parameter in &self.parameters {
            parameter.reset_to_default();
        }
    }

    /// Serialize the current values into an opaque, versioned blob
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let blob = StateBlob {
            version: STATE_VERSION,
            parameters: self
                .iter()
                .map(|p| (p.id().as_str().to_string(), p.get()))
                .collect(),
        };
        Ok(serde_json::to_vec(&blob)?)
    }

    /// Restore values from a blob written by [`ParameterSet::save_state`].
    ///
    /// Out-of-range values are clamped, unknown identifiers are skipped and
    /// missing identifiers keep their current value. A blob that cannot be
    /// decoded leaves every value untouched.
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn load_state(&self, data: &[u8]) -> Result<()> {
        let blob: StateBlob = serde_json::from_slice(data)?;
        if blob.version > STATE_VERSION {
            debug!(version = blob.version, "State blob from a newer version");
        }

        for (key, value) in &blob.parameters {
            let Ok(id) = key.parse::<ParamId>() else {
                debug!(id = %key, "Ignoring unknown parameter in state");
                continue;
            };
            let parameter = self.parameter(id);
            let clamped = parameter.range().clamp(*value);
            if clamped != *value {
                debug!(id = %id, stored = value, clamped, "Clamped stored parameter value");
            }
            parameter.set(clamped);
        }

        debug!(parameters = blob.parameters.len(), "State restored");
        Ok(())
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&ParameterSet> for ParameterValues {
    fn from(set: &ParameterSet) -> Self {
        set.snapshot()
    }
}
