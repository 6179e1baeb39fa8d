//! Live duplex streaming through the ladder processor
//!
//! An input stream captures interleaved frames into a lock-free ring; the
//! output stream owns the [`LadderProcessor`], pulls one block from the ring,
//! processes it in place and hands it to the device.

use super::lockfree_buffer::{sample_ring, RingConsumer, RingProducer};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Stream, StreamConfig as CpalStreamConfig};
use ladder_core::domain::audio::{AudioError, Result};
use ladder_core::domain::processor::LadderProcessor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Blocks of headroom kept in the ring between capture and playback
const RING_BLOCKS: usize = 4;

/// Format shared by both streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub sample_rate: u32,
    pub buffer_size: u32,
    /// Channels of the output stream and of the processor
    pub channels: u16,
    /// Channels captured from the input device
    pub input_channels: u16,
}

impl StreamSettings {
    fn cpal_config(&self, channels: u16) -> CpalStreamConfig {
        CpalStreamConfig {
            channels,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(self.buffer_size),
        }
    }
}

/// Counters updated from the stream callbacks
#[derive(Debug, Default)]
pub struct StreamStats {
    /// Output samples that had no captured input and were played as silence
    pub underruns: AtomicU64,
    /// Captured samples dropped because the ring was full
    pub overruns: AtomicU64,
    /// Blocks processed by the output callback
    pub blocks: AtomicU64,
}

impl StreamStats {
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }
}

/// Copy one interleaved input block into the ring, mapping channels.
///
/// Input channels past `out_channels` are dropped; output channels past
/// `in_channels` receive silence. Returns the number of samples lost to a
/// full ring.
pub fn capture_block(
    producer: &mut RingProducer,
    data: &[f32],
    in_channels: usize,
    out_channels: usize,
) -> usize {
    if in_channels == 0 || out_channels == 0 {
        return 0;
    }

    let frames = data.len() / in_channels;
    let mapped = data
        .chunks_exact(in_channels)
        .flat_map(|frame| (0..out_channels).map(move |ch| frame.get(ch).copied().unwrap_or(0.0)));

    let written = producer.write_from_iter(mapped);
    frames * out_channels - written
}

/// Fill one output block from the ring and run it through the processor.
///
/// Returns the number of samples that had to be filled with silence.
pub fn render_block(
    consumer: &mut RingConsumer,
    processor: &mut LadderProcessor,
    data: &mut [f32],
    channels: usize,
) -> usize {
    let read = consumer.read(data);
    data[read..].fill(0.0);
    processor.process_interleaved(data, channels);
    data.len() - read
}

/// Running input and output streams
pub struct LiveStream {
    _input: Stream,
    _output: Stream,
    settings: StreamSettings,
    stats: Arc<StreamStats>,
}

impl LiveStream {
    /// Build and start both streams.
    ///
    /// `processor` must already be prepared for `settings`; it moves into the
    /// output callback.
    pub fn start(
        input_device: &cpal::Device,
        output_device: &cpal::Device,
        settings: StreamSettings,
        mut processor: LadderProcessor,
    ) -> Result<Self> {
        info!("Creating live stream: {:?}", settings);

        let in_channels = settings.input_channels as usize;
        let out_channels = settings.channels as usize;
        let block = settings.buffer_size as usize * out_channels;

        let (mut producer, mut consumer) = sample_ring(block * RING_BLOCKS);
        // One block of silence so playback does not start on an empty ring
        producer.write_from_iter(std::iter::repeat(0.0).take(block));

        let stats = Arc::new(StreamStats::default());

        let input_stats = Arc::clone(&stats);
        let input = input_device
            .build_input_stream(
                &settings.cpal_config(settings.input_channels),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let dropped = capture_block(&mut producer, data, in_channels, out_channels);
                    if dropped > 0 {
                        input_stats
                            .overruns
                            .fetch_add(dropped as u64, Ordering::Relaxed);
                    }
                },
                |err| error!("Input stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamError(format!("Failed to build input stream: {}", e)))?;

        let output_stats = Arc::clone(&stats);
        let output = output_device
            .build_output_stream(
                &settings.cpal_config(settings.channels),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let missing = render_block(&mut consumer, &mut processor, data, out_channels);
                    if missing > 0 {
                        output_stats
                            .underruns
                            .fetch_add(missing as u64, Ordering::Relaxed);
                    }
                    output_stats.blocks.fetch_add(1, Ordering::Relaxed);
                },
                |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamError(format!("Failed to build output stream: {}", e)))?;

        input
            .play()
            .map_err(|e| AudioError::StreamError(format!("Failed to start input stream: {}", e)))?;
        output
            .play()
            .map_err(|e| AudioError::StreamError(format!("Failed to start output stream: {}", e)))?;

        debug!("Live stream running");
        Ok(Self {
            _input: input,
            _output: output,
            settings,
            stats,
        })
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<StreamStats> {
        &self.stats
    }
}
