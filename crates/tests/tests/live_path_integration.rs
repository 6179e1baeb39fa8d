//! The live host's callback path without audio devices: capture callback into
//! the ring, output callback out of it through the processor.

use ladder_core::domain::{LadderProcessor, ParamId};
use ladder_infra::audio::stream::{capture_block, render_block};
use ladder_infra::audio::sample_ring;
use ladder_tests::{deinterleave, generate_sine_wave, interleave, peak};

const BLOCK_FRAMES: usize = 256;

#[test]
fn test_capture_to_render_matches_direct_processing() {
    let (mut producer, mut consumer) = sample_ring(BLOCK_FRAMES * 2 * 4);
    let input = interleave(&[
        generate_sine_wave(220.0, 48000, 32.0),
        generate_sine_wave(660.0, 48000, 32.0),
    ]);

    let mut live = LadderProcessor::new();
    live.prepare(48000.0, BLOCK_FRAMES, 2).unwrap();
    live.parameters().set(ParamId::Cutoff, 1800.0);

    let mut direct = LadderProcessor::new();
    direct.prepare(48000.0, BLOCK_FRAMES, 2).unwrap();
    direct.parameters().set(ParamId::Cutoff, 1800.0);

    for block in input.chunks(BLOCK_FRAMES * 2) {
        assert_eq!(capture_block(&mut producer, block, 2, 2), 0);

        let mut out = vec![0.0; block.len()];
        assert_eq!(render_block(&mut consumer, &mut live, &mut out, 2), 0);

        let mut expected = block.to_vec();
        direct.process_interleaved(&mut expected, 2);
        assert_eq!(out, expected);
    }
}

#[test]
fn test_mono_capture_into_stereo_output() {
    let (mut producer, mut consumer) = sample_ring(BLOCK_FRAMES * 2 * 4);
    let mono = generate_sine_wave(440.0, 48000, 5.0);
    let frames = mono.len().min(BLOCK_FRAMES);

    let mut processor = LadderProcessor::new();
    processor.prepare(48000.0, BLOCK_FRAMES, 2).unwrap();

    capture_block(&mut producer, &mono[..frames], 1, 2);
    let mut out = vec![0.0; frames * 2];
    render_block(&mut consumer, &mut processor, &mut out, 2);

    let channels = deinterleave(&out, 2);
    assert!(peak(&channels[0]) > 0.0);
    assert_eq!(peak(&channels[1]), 0.0);
}

#[test]
fn test_underrun_renders_silence_then_recovers() {
    let (mut producer, mut consumer) = sample_ring(BLOCK_FRAMES * 4);
    let mut processor = LadderProcessor::new();
    processor.prepare(44100.0, BLOCK_FRAMES, 1).unwrap();

    let mut out = vec![1.0; BLOCK_FRAMES];
    let missing = render_block(&mut consumer, &mut processor, &mut out, 1);
    assert_eq!(missing, BLOCK_FRAMES);
    assert!(out.iter().all(|&s| s == 0.0));

    let tone = generate_sine_wave(440.0, 44100, 10.0);
    capture_block(&mut producer, &tone[..BLOCK_FRAMES], 1, 1);
    let missing = render_block(&mut consumer, &mut processor, &mut out, 1);
    assert_eq!(missing, 0);
    assert!(peak(&out) > 0.0);
}
