//! Integration tests for the ladder processor
//!
//! These tests drive the processor the way a host does: prepare, feed blocks,
//! change parameters between blocks and persist state.

use ladder_core::domain::{
    db_to_gain, AudioBuffer, LadderProcessor, ParamId, ParameterSet, Preset,
};
use ladder_tests::{
    deinterleave, generate_impulse, generate_silence, generate_sine_wave, interleave, peak, rms,
};
use proptest::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

/// Largest possible ladder output: a tanh-bounded stage input of 7.002 and a
/// gain below 16 through the four stages
const OUTPUT_BOUND: f32 = 7.002 * 16.0;

fn processor(sample_rate: f32, channels: u16, block: usize) -> LadderProcessor {
    let mut processor = LadderProcessor::new();
    processor.prepare(sample_rate, block, channels).unwrap();
    processor
}

fn set_all(processor: &LadderProcessor, drive: f32, cutoff: f32, resonance: f32, trim: f32) {
    let params = processor.parameters();
    params.set(ParamId::Drive, drive);
    params.set(ParamId::Cutoff, cutoff);
    params.set(ParamId::Resonance, resonance);
    params.set(ParamId::Trim, trim);
}

fn run_mono(processor: &mut LadderProcessor, signal: &[f32], block: usize) -> Vec<f32> {
    let mut out = signal.to_vec();
    for chunk in out.chunks_mut(block) {
        processor.process_interleaved(chunk, 1);
    }
    out
}

// ============================================================================
// RESPONSE TESTS
// ============================================================================

#[test]
fn test_silence_in_silence_out() {
    let mut processor = processor(48000.0, 2, 512);
    let mut buffer = AudioBuffer::new(2, 512);

    for _ in 0..20 {
        processor.process_block(&mut buffer);
        assert!(buffer.channel(0).iter().all(|&s| s == 0.0));
        assert!(buffer.channel(1).iter().all(|&s| s == 0.0));
    }
}

#[test]
fn test_impulse_response_44k() {
    let mut processor = processor(44100.0, 1, 512);
    set_all(&processor, 0.0, 1000.0, 0.0, 0.0);

    let out = run_mono(&mut processor, &generate_impulse(10000, 1.0), 512);

    assert!(out.iter().all(|s| s.is_finite()));
    assert!(peak(&out[..100]) > 0.0);
    assert!(rms(&out[9000..]) < rms(&out[..1000]) * 1e-3);
}

#[test]
fn test_full_resonance_over_silence_is_bounded() {
    let mut processor = processor(44100.0, 1, 512);
    set_all(&processor, 0.0, 1000.0, 1.0, 0.0);

    run_mono(&mut processor, &generate_impulse(512, 1.0), 512);
    let out = run_mono(&mut processor, &generate_silence(44100), 512);

    assert!(out.iter().all(|s| s.is_finite()));
    assert!(peak(&out) <= 7.002);
}

#[test]
fn test_sine_stress_across_settings() {
    for &cutoff in &[20.0_f32, 200.0, 2000.0, 12000.0, 20000.0] {
        for &resonance in &[0.0_f32, 0.5, 1.0] {
            for &drive in &[0.0_f32, 5.0, 10.0] {
                let mut processor = processor(48000.0, 1, 256);
                set_all(&processor, drive, cutoff, resonance, 0.0);

                let out = run_mono(&mut processor, &generate_sine_wave(110.0, 48000, 250.0), 256);

                assert!(out.iter().all(|s| s.is_finite()));
                assert!(
                    peak(&out) <= OUTPUT_BOUND,
                    "cutoff {cutoff} resonance {resonance} drive {drive}"
                );
            }
        }
    }
}

#[test]
fn test_magnitude_response_non_increasing_above_cutoff() {
    let sample_rate = 44100.0;
    let cutoff = 1000.0;
    let len = 8192;
    let mut processor = processor(sample_rate, 1, len);
    set_all(&processor, 0.0, cutoff, 0.0, 0.0);

    let response = run_mono(&mut processor, &generate_impulse(len, 1e-3), len);

    let mut spectrum: Vec<Complex<f32>> = response.iter().map(|&s| Complex::new(s, 0.0)).collect();
    FftPlanner::new().plan_fft_forward(len).process(&mut spectrum);
    let magnitudes: Vec<f32> = spectrum[..len / 2].iter().map(|c| c.norm()).collect();

    let cutoff_bin = (cutoff * len as f32 / sample_rate).ceil() as usize;
    for (i, pair) in magnitudes[cutoff_bin..].windows(2).enumerate() {
        assert!(
            pair[1] <= pair[0] * (1.0 + 1e-3) + 1e-9,
            "bin {} rises: {} -> {}",
            cutoff_bin + i,
            pair[0],
            pair[1]
        );
    }
    // Well below cutoff the response is close to the passband level
    assert!(magnitudes[1] > magnitudes[cutoff_bin * 4] * 100.0);
}

#[test]
fn test_trim_scales_output() {
    let signal = generate_sine_wave(220.0, 48000, 100.0);

    let mut unity = processor(48000.0, 1, 480);
    set_all(&unity, 2.0, 3000.0, 0.3, 0.0);
    let reference = run_mono(&mut unity, &signal, 480);

    let mut trimmed = processor(48000.0, 1, 480);
    set_all(&trimmed, 2.0, 3000.0, 0.3, -6.0);
    let out = run_mono(&mut trimmed, &signal, 480);

    let gain = db_to_gain(-6.0);
    for (a, b) in reference.iter().zip(out.iter()) {
        assert!((a * gain - b).abs() < 1e-5);
    }
}

// ============================================================================
// HOST BEHAVIOUR TESTS
// ============================================================================

#[test]
fn test_block_partition_does_not_change_output() {
    let signal = generate_sine_wave(330.0, 48000, 50.0);

    let mut whole = processor(48000.0, 1, 4096);
    set_all(&whole, 3.0, 1500.0, 0.6, -3.0);
    let reference = run_mono(&mut whole, &signal, signal.len());

    let mut split = processor(48000.0, 1, 512);
    set_all(&split, 3.0, 1500.0, 0.6, -3.0);
    let mut out = signal.clone();
    let mut offset = 0;
    for size in [512, 17, 300, 1, 171, 512].iter().cycle() {
        if offset >= out.len() {
            break;
        }
        let end = (offset + size).min(out.len());
        split.process_interleaved(&mut out[offset..end], 1);
        offset = end;
    }

    for (a, b) in reference.iter().zip(out.iter()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn test_parameter_jump_has_no_discontinuity() {
    let mut processor = processor(48000.0, 1, 256);
    set_all(&processor, 0.0, 300.0, 0.2, 0.0);
    let dc = vec![0.25_f32; 256];

    let mut previous = 0.0;
    for _ in 0..40 {
        let out = run_mono(&mut processor, &dc, 256);
        previous = out[255];
    }

    processor.parameters().set(ParamId::Trim, 12.0);
    let out = run_mono(&mut processor, &dc, 256);

    let step = db_to_gain(12.0) - 1.0;
    assert!((out[0] - previous).abs() < previous.abs() * step / 100.0);
    for pair in out.windows(2) {
        assert!((pair[1] - pair[0]).abs() < previous.abs() * step / 100.0);
    }
}

#[test]
fn test_stereo_interleaved_matches_planar() {
    let left = generate_sine_wave(220.0, 48000, 20.0);
    let right = generate_sine_wave(880.0, 48000, 20.0);

    let mut planar_proc = processor(48000.0, 2, 960);
    set_all(&planar_proc, 4.0, 2500.0, 0.8, -1.0);
    let mut planar = AudioBuffer::from_channels(vec![left.clone(), right.clone()]);
    planar_proc.process_block(&mut planar);

    let mut interleaved_proc = processor(48000.0, 2, 960);
    set_all(&interleaved_proc, 4.0, 2500.0, 0.8, -1.0);
    let mut data = interleave(&[left, right]);
    interleaved_proc.process_interleaved(&mut data, 2);
    let channels = deinterleave(&data, 2);

    for ch in 0..2 {
        for (a, b) in planar.channel(ch).iter().zip(channels[ch].iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}

#[test]
fn test_mono_processor_clears_second_channel() {
    let mut processor = processor(48000.0, 1, 256);
    let signal = generate_sine_wave(440.0, 48000, 5.0);
    let mut data = interleave(&[signal.clone(), signal]);

    processor.process_interleaved(&mut data, 2);

    let channels = deinterleave(&data, 2);
    assert!(peak(&channels[0]) > 0.0);
    assert_eq!(peak(&channels[1]), 0.0);
}

#[test]
fn test_state_restore_reproduces_output() {
    let source = processor(48000.0, 1, 256);
    Preset::factory("acid").unwrap().apply_to(source.parameters());
    let state = source.get_state().unwrap();

    let mut restored = processor(48000.0, 1, 256);
    restored.set_state(&state).unwrap();
    let mut original = source;

    let signal = generate_sine_wave(110.0, 48000, 30.0);
    let a = run_mono(&mut original, &signal, 256);
    let b = run_mono(&mut restored, &signal, 256);
    assert_eq!(a, b);
}

#[test]
fn test_release_and_reprepare() {
    let mut processor = processor(48000.0, 2, 512);
    processor.release();

    let mut data = vec![0.5_f32; 64];
    processor.process_interleaved(&mut data, 2);
    assert!(data.iter().all(|&s| s == 0.0));

    processor.prepare(96000.0, 128, 1).unwrap();
    let out = run_mono(&mut processor, &generate_sine_wave(440.0, 96000, 5.0), 128);
    assert!(peak(&out) > 0.0);
}

#[test]
fn test_parameters_written_from_another_thread() {
    let parameters = Arc::new(ParameterSet::new());
    let mut processor = LadderProcessor::with_parameters(Arc::clone(&parameters));
    processor.prepare(48000.0, 128, 2).unwrap();

    let writer = {
        let parameters = Arc::clone(&parameters);
        std::thread::spawn(move || {
            for i in 0..2000 {
                let t = i as f32 / 2000.0;
                parameters.set(ParamId::Cutoff, 20.0 + 19980.0 * t);
                parameters.set(ParamId::Resonance, t);
                parameters.set(ParamId::Drive, 10.0 * t);
            }
        })
    };

    let signal = interleave(&[
        generate_sine_wave(100.0, 48000, 10.0),
        generate_sine_wave(150.0, 48000, 10.0),
    ]);
    for _ in 0..200 {
        let mut block = signal[..256].to_vec();
        processor.process_interleaved(&mut block, 2);
        assert!(block.iter().all(|s| s.is_finite() && s.abs() <= OUTPUT_BOUND));
    }

    writer.join().unwrap();
    assert!(processor.meter().peak(0) > 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_output_finite_and_bounded(
        drive in 0.0_f32..=10.0,
        cutoff in 20.0_f32..=20000.0,
        resonance in 0.0_f32..=1.0,
        trim in -36.0_f32..=36.0,
        frequency in 20.0_f32..15000.0,
    ) {
        let mut processor = processor(44100.0, 1, 512);
        set_all(&processor, drive, cutoff, resonance, trim);

        let out = run_mono(&mut processor, &generate_sine_wave(frequency, 44100, 50.0), 512);

        let bound = OUTPUT_BOUND * db_to_gain(trim) * 1.001;
        for s in &out {
            prop_assert!(s.is_finite());
            prop_assert!(s.abs() <= bound);
        }
    }
}
