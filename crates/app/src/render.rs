//! Offline rendering of WAV files through the processor

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use ladder_core::domain::processor::LadderProcessor;
use std::path::Path;
use tracing::{debug, info, instrument};

/// What a render produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub blocks: usize,
    /// Highest absolute output sample
    pub peak: f32,
}

/// Interleaved audio read from a WAV file
#[derive(Debug, Clone, PartialEq)]
pub struct WavData {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl WavData {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Load a WAV file as interleaved f32 in [-1, 1]
pub fn read_wav(path: &Path) -> Result<WavData> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>(),
        SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<f32>, _>>()
        }
    }
    .with_context(|| format!("Failed to read samples from {}", path.display()))?;

    Ok(WavData {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Save interleaved samples as a 32-bit float WAV file
pub fn write_wav(path: &Path, data: &WavData) -> Result<()> {
    let spec = WavSpec {
        channels: data.channels,
        sample_rate: data.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in &data.samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", path.display()))?;
    Ok(())
}

/// Run interleaved audio through `processor` in blocks of `block_size`
/// frames. The processor is prepared for the audio's format first.
pub fn render_samples(
    processor: &mut LadderProcessor,
    data: &mut WavData,
    block_size: usize,
) -> Result<RenderSummary> {
    if block_size == 0 {
        bail!("Block size must be at least one frame");
    }

    processor.prepare(data.sample_rate as f32, block_size, data.channels)?;

    let channels = data.channels as usize;
    let mut blocks = 0;
    for block in data.samples.chunks_mut(block_size * channels) {
        processor.process_interleaved(block, channels);
        blocks += 1;
    }
    processor.release();

    let peak = data.samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    Ok(RenderSummary {
        sample_rate: data.sample_rate,
        channels: data.channels,
        frames: data.frames(),
        blocks,
        peak,
    })
}

/// Render `input` through `processor` into `output`
#[instrument(skip(processor))]
pub fn render_file(
    input: &Path,
    output: &Path,
    processor: &mut LadderProcessor,
    block_size: usize,
) -> Result<RenderSummary> {
    let mut data = read_wav(input)?;
    debug!(
        frames = data.frames(),
        channels = data.channels,
        sample_rate = data.sample_rate,
        "Input loaded"
    );

    let summary = render_samples(processor, &mut data, block_size)
        .with_context(|| format!("Failed to process {}", input.display()))?;
    write_wav(output, &data)?;

    info!(
        "Rendered {} frames in {} blocks to {}",
        summary.frames,
        summary.blocks,
        output.display()
    );
    Ok(summary)
}
