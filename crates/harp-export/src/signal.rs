//! In-memory decoded audio.

use crate::error::{ExportError, Result};

/// Planar `f32` audio plus its sample rate.
///
/// Samples are normalized to `-1.0..=1.0`. All channels have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Signal {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(ExportError::InvalidData("signal has no channels".into()));
        }
        if channels.len() > u16::MAX as usize {
            return Err(ExportError::InvalidData(format!(
                "too many channels: {}",
                channels.len()
            )));
        }
        if sample_rate == 0 {
            return Err(ExportError::InvalidData("sample rate must be non-zero".into()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(ExportError::InvalidData(
                "channels have different lengths".into(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![left, right], sample_rate)
    }

    /// Split interleaved frames into planar channels.
    pub fn from_interleaved(samples: &[f32], num_channels: u16, sample_rate: u32) -> Result<Self> {
        let n = num_channels as usize;
        if n == 0 {
            return Err(ExportError::InvalidData("signal has no channels".into()));
        }
        if samples.len() % n != 0 {
            return Err(ExportError::InvalidData(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                n
            )));
        }
        let frames = samples.len() / n;
        let mut channels = vec![Vec::with_capacity(frames); n];
        for frame in samples.chunks_exact(n) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn num_channels(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.channels.len());
        for i in 0..self.len() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Apply `f` to every sample in place.
    pub fn map_samples(&mut self, mut f: impl FnMut(f32) -> f32) {
        for channel in &mut self.channels {
            for sample in channel.iter_mut() {
                *sample = f(*sample);
            }
        }
    }
}
