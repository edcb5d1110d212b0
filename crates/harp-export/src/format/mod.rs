//! Audio format codecs
//!
//! Each codec is feature-gated:
//! - `wav`: WAV via hound (pure Rust)

#[cfg(feature = "wav")]
pub mod wav;

use crate::error::{ExportError, Result};
use crate::options::{AudioFormat, BitDepth};
use crate::signal::Signal;
use std::path::Path;

/// Write `signal` to a path that must not exist yet.
pub(crate) fn write_new_file(
    signal: &Signal,
    path: &Path,
    format: AudioFormat,
    bit_depth: BitDepth,
) -> Result<()> {
    match format {
        #[cfg(feature = "wav")]
        AudioFormat::Wav => wav::encode_wav_new_file(signal, path, bit_depth),
        #[cfg(not(feature = "wav"))]
        AudioFormat::Wav => {
            let _ = (signal, path, bit_depth);
            Err(ExportError::UnsupportedFormat(
                "WAV support not enabled (enable 'wav' feature)".into(),
            ))
        }
    }
}

/// Decode a file, picking the codec from its extension.
pub(crate) fn read_file(path: &Path) -> Result<Signal> {
    match AudioFormat::from_path(path) {
        #[cfg(feature = "wav")]
        Some(AudioFormat::Wav) => wav::decode_wav_file(path),
        #[cfg(not(feature = "wav"))]
        Some(AudioFormat::Wav) => Err(ExportError::UnsupportedFormat(
            "WAV support not enabled (enable 'wav' feature)".into(),
        )),
        None => Err(ExportError::UnsupportedFormat(format!(
            "unknown audio extension: {}",
            path.display()
        ))),
    }
}
