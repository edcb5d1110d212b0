//! WAV codec using hound
//!
//! Supports 16-bit, 24-bit, and 32-bit float WAV files.

use crate::error::{ExportError, Result};
use crate::options::BitDepth;
use crate::signal::Signal;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::OpenOptions;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

/// WAV encoder configuration
#[derive(Debug, Clone)]
pub struct WavConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bit depth
    pub bit_depth: BitDepth,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for WavConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bit_depth: BitDepth::Float32,
            channels: 2,
        }
    }
}

impl WavConfig {
    /// Config matching a signal's layout
    pub fn for_signal(signal: &Signal, bit_depth: BitDepth) -> Self {
        Self {
            sample_rate: signal.sample_rate(),
            bit_depth,
            channels: signal.num_channels(),
        }
    }
}

/// Encode a signal into a new WAV file.
///
/// Fails with `AlreadyExists` instead of truncating an existing file.
pub fn encode_wav_new_file(signal: &Signal, path: &Path, bit_depth: BitDepth) -> Result<()> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let config = WavConfig::for_signal(signal, bit_depth);

    let mut writer = WavWriter::new(BufWriter::new(file), create_wav_spec(&config))?;
    write_samples(&mut writer, signal, &config)?;
    writer.finalize()?;

    Ok(())
}

/// Encode a signal to WAV in memory
///
/// # Returns
/// WAV file bytes
pub fn encode_wav_memory(signal: &Signal, bit_depth: BitDepth) -> Result<Vec<u8>> {
    let config = WavConfig::for_signal(signal, bit_depth);
    let mut buffer = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, create_wav_spec(&config))?;

        write_samples(&mut writer, signal, &config)?;

        // Finalize writes the header and flushes
        writer.finalize()?;
    }

    Ok(buffer)
}

/// Decode a WAV file into a normalized planar signal.
pub fn decode_wav_file(path: &Path) -> Result<Signal> {
    let reader = WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => ExportError::Decode(format!("{}: {}", path.display(), io)),
        other => ExportError::Decode(format!("{}: {}", path.display(), other)),
    })?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| ExportError::Decode(e.to_string()))?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample)?;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| ExportError::Decode(e.to_string()))?
        }
    };

    Signal::from_interleaved(&interleaved, spec.channels, spec.sample_rate)
}

fn int_scale(bits: u16) -> Result<f32> {
    match bits {
        1..=32 => Ok((1u64 << (bits - 1)) as f32),
        _ => Err(ExportError::UnsupportedFormat(format!(
            "{}-bit integer WAV",
            bits
        ))),
    }
}

/// Create hound WavSpec from our config
fn create_wav_spec(config: &WavConfig) -> WavSpec {
    let (bits_per_sample, sample_format) = match config.bit_depth {
        BitDepth::Int16 => (16, SampleFormat::Int),
        BitDepth::Int24 => (24, SampleFormat::Int),
        BitDepth::Float32 => (32, SampleFormat::Float),
    };

    WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample,
        sample_format,
    }
}

/// Write interleaved samples to the writer
fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    signal: &Signal,
    config: &WavConfig,
) -> Result<()> {
    let channels = signal.channels();
    for i in 0..signal.len() {
        for channel in channels {
            let sample = channel[i];
            match config.bit_depth {
                BitDepth::Int16 => writer.write_sample(float_to_i16(sample))?,
                BitDepth::Int24 => writer.write_sample(float_to_i24(sample))?,
                BitDepth::Float32 => writer.write_sample(sample)?,
            }
        }
    }

    Ok(())
}

/// Convert float sample to 16-bit integer with clipping
#[inline]
fn float_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 32767.0) as i16
}

/// Convert float sample to 24-bit integer (stored as i32) with clipping
#[inline]
fn float_to_i24(sample: f32) -> i32 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 8388607.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp() -> Signal {
        Signal::stereo(vec![0.0, 0.5, -0.5, 1.0], vec![0.1, -0.1, 0.0, -1.0], 48000).unwrap()
    }

    #[test]
    fn test_float_to_i16() {
        assert_eq!(float_to_i16(0.0), 0);
        assert_eq!(float_to_i16(1.0), 32767);
        assert_eq!(float_to_i16(-1.0), -32767);
        // Test clipping
        assert_eq!(float_to_i16(1.5), 32767);
        assert_eq!(float_to_i16(-1.5), -32767);
    }

    #[test]
    fn test_float_to_i24() {
        assert_eq!(float_to_i24(0.0), 0);
        assert_eq!(float_to_i24(1.0), 8388607);
        assert_eq!(float_to_i24(-1.0), -8388607);
    }

    #[test]
    fn test_encode_wav_memory_header() {
        let bytes = encode_wav_memory(&ramp(), BitDepth::Int16).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert!(bytes.len() > 44);
    }

    #[test]
    fn test_float_file_roundtrip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.wav");

        encode_wav_new_file(&ramp(), &path, BitDepth::Float32).unwrap();
        let decoded = decode_wav_file(&path).unwrap();
        assert_eq!(decoded, ramp());
    }

    #[test]
    fn test_int24_file_roundtrip_is_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int24.wav");

        encode_wav_new_file(&ramp(), &path, BitDepth::Int24).unwrap();
        let decoded = decode_wav_file(&path).unwrap();
        assert_eq!(decoded.num_channels(), 2);
        assert_eq!(decoded.sample_rate(), 48000);
        for (a, b) in decoded.interleaved().iter().zip(ramp().interleaved()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_new_file_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.wav");
        std::fs::write(&path, b"keep me").unwrap();

        let err = encode_wav_new_file(&ramp(), &path, BitDepth::Float32).unwrap_err();
        assert!(matches!(err, ExportError::IoWrite(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let err = decode_wav_file(&path).unwrap_err();
        assert!(matches!(err, ExportError::Decode(_)));
    }
}
