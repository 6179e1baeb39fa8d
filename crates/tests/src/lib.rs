//! Signal helpers for the integration tests

pub fn generate_sine_wave(frequency: f32, sample_rate: u32, duration_ms: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_ms / 1000.0) as usize;
    (0..num_samples)
        .map(|i| 2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32)
        .map(|phase| phase.sin())
        .collect()
}

pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

pub fn generate_impulse(num_samples: usize, amplitude: f32) -> Vec<f32> {
    let mut signal = generate_silence(num_samples);
    if let Some(first) = signal.first_mut() {
        *first = amplitude;
    }
    signal
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Interleave equally long channels into frames
pub fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    (0..frames)
        .flat_map(|i| channels.iter().map(move |ch| ch[i]))
        .collect()
}

pub fn deinterleave(data: &[f32], channels: usize) -> Vec<Vec<f32>> {
    (0..channels)
        .map(|ch| data.iter().skip(ch).step_by(channels).copied().collect())
        .collect()
}
