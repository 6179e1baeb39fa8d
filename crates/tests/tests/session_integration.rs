//! Offline render and persisted session tests
//!
//! Covers the paths the CLI takes: config and presets on disk, parameters
//! applied to a processor, and a WAV file rendered through it.

use ladder_app::render::{read_wav, render_file, write_wav, WavData};
use ladder_core::domain::{
    ConfigManager, LadderConfig, LadderProcessor, ParamId, ParameterSet, Preset, PresetManager,
};
use ladder_tests::{generate_sine_wave, interleave, peak, rms};
use tempfile::TempDir;

fn stereo_wav(sample_rate: u32, duration_ms: f32) -> WavData {
    let low = generate_sine_wave(110.0, sample_rate, duration_ms);
    let high = generate_sine_wave(8000.0, sample_rate, duration_ms);
    let mix: Vec<f32> = low.iter().zip(&high).map(|(l, h)| 0.4 * l + 0.4 * h).collect();
    WavData {
        samples: interleave(&[mix.clone(), mix]),
        channels: 2,
        sample_rate,
    }
}

#[test]
fn test_render_dark_preset_removes_highs() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    let sample_rate = 44100;
    let high_only = WavData {
        samples: generate_sine_wave(8000.0, sample_rate, 200.0)
            .into_iter()
            .map(|s| s * 0.4)
            .collect(),
        channels: 1,
        sample_rate,
    };
    write_wav(&input, &high_only).unwrap();

    let mut processor = LadderProcessor::new();
    processor.parameters().set(ParamId::Cutoff, 200.0);
    processor.parameters().set(ParamId::Resonance, 0.0);
    render_file(&input, &output, &mut processor, 256).unwrap();

    let rendered = read_wav(&output).unwrap();
    let tail = &rendered.samples[rendered.samples.len() / 2..];
    assert!(rms(tail) < rms(&high_only.samples) * 0.01);
}

#[test]
fn test_render_stereo_keeps_format() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("stereo.wav");
    let output = dir.path().join("stereo_out.wav");
    let source = stereo_wav(48000, 100.0);
    write_wav(&input, &source).unwrap();

    let mut processor = LadderProcessor::new();
    let summary = render_file(&input, &output, &mut processor, 333).unwrap();

    let rendered = read_wav(&output).unwrap();
    assert_eq!(rendered.channels, 2);
    assert_eq!(rendered.sample_rate, 48000);
    assert_eq!(rendered.frames(), source.frames());
    assert_eq!(summary.blocks, source.frames().div_ceil(333));
    assert!((summary.peak - peak(&rendered.samples)).abs() < 1e-6);
}

#[tokio::test]
async fn test_saved_preset_drives_render() {
    let dir = TempDir::new().unwrap();
    let config_manager = ConfigManager::new(dir.path().join("config"));
    let config = config_manager.load().await;
    assert!(config_manager.exists());

    let presets = PresetManager::new(config_manager.preset_dir(&config.app));
    let source = ParameterSet::new();
    source.set(ParamId::Cutoff, 400.0);
    source.set(ParamId::Trim, -12.0);
    presets
        .save_preset(&Preset::capture("quiet", &source).with_description("Low and quiet"))
        .await
        .unwrap();

    assert_eq!(presets.list_presets().await.unwrap(), vec!["quiet".to_string()]);

    let mut processor = LadderProcessor::new();
    processor.parameters().apply(&config.parameters);
    presets
        .load_preset("quiet")
        .await
        .unwrap()
        .apply_to(processor.parameters());
    assert_eq!(processor.parameters().get(ParamId::Cutoff), 400.0);

    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    let source_wav = stereo_wav(44100, 50.0);
    write_wav(&input, &source_wav).unwrap();
    render_file(&input, &output, &mut processor, 512).unwrap();

    let rendered = read_wav(&output).unwrap();
    assert!(peak(&rendered.samples) < peak(&source_wav.samples) * 0.5);
}

#[tokio::test]
async fn test_factory_presets_load_without_files() {
    let dir = TempDir::new().unwrap();
    let presets = PresetManager::new(dir.path().join("missing"));

    assert!(presets.list_presets().await.unwrap().is_empty());
    for factory in Preset::factory_presets() {
        let loaded = presets.load_preset(&factory.name).await.unwrap();
        assert_eq!(loaded, factory);
    }
    assert!(presets.load_preset("nope").await.is_err());
}

#[test]
fn test_render_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let mut processor = LadderProcessor::new();
    let result = render_file(
        &dir.path().join("absent.wav"),
        &dir.path().join("out.wav"),
        &mut processor,
        512,
    );
    assert!(result.is_err());
    assert!(!dir.path().join("out.wav").exists());
}

#[tokio::test]
async fn test_config_reset_restores_factory_default() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(dir.path().to_path_buf());

    let mut custom = LadderConfig::factory_default();
    custom.app.buffer_size = 128;
    custom.parameters.cutoff_hz = 2500.0;
    manager.save(&custom).await.unwrap();
    assert_eq!(manager.load().await, custom);

    manager.clear().await.unwrap();
    assert!(!manager.exists());
    manager.save(&LadderConfig::factory_default()).await.unwrap();

    assert_eq!(manager.load().await, LadderConfig::factory_default());
}
