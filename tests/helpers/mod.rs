//! Test helpers and fixtures for HARP integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (float round trip, unity gain)
//! - `DSP_EPSILON` (1e-4): Sample math (gain)
//! - `INT16_EPSILON`: One 16-bit quantization step

#![allow(dead_code)]

pub mod tolerances;

use std::path::{Path, PathBuf};

/// Default test sample rate
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (0.5 * (2.0 * std::f64::consts::PI * frequency * t).sin()) as f32
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}

/// Write a 16-bit PCM mono WAV the way a host would hand one over.
pub fn write_pcm16_fixture(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create fixture");
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .expect("Failed to write fixture sample");
    }
    writer.finalize().expect("Failed to finalize fixture");
}

/// A fresh scratch directory containing a 0.1 s sine fixture named `a.wav`.
pub fn fixture_dir() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("a.wav");
    let samples = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_SAMPLE_RATE as usize / 10);
    write_pcm16_fixture(&path, &samples, TEST_SAMPLE_RATE);
    (dir, path)
}
