//! # HARP Export
//!
//! Audio file bridge for HARP endpoints.
//!
//! Processing functions receive the host's audio as a file path and must
//! answer with a file path. This crate covers both directions:
//! - **Input**: [`load_audio`] decodes a file into a planar [`Signal`]
//! - **Output**: [`save_and_return_filepath`] writes a [`Signal`] to a fresh,
//!   uniquely named file in a process-scoped output directory
//!
//! ```ignore
//! use harp_export::{load_audio, save_and_return_filepath};
//!
//! fn gain(audio: std::path::PathBuf, db: f64) -> harp_export::Result<std::path::PathBuf> {
//!     let mut signal = load_audio(&audio)?;
//!     let g = 10f32.powf(db as f32 / 20.0);
//!     signal.map_samples(|s| s * g);
//!     save_and_return_filepath(&signal)
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `wav` (default): WAV encode/decode via hound (pure Rust)

pub mod error;
mod options;
mod signal;

pub mod bridge;
pub mod format;

pub use bridge::{load_audio, save_and_return_filepath, OutputDir};
pub use error::{ExportError, Result};
pub use options::{AudioFormat, BitDepth};
pub use signal::Signal;

#[cfg(feature = "wav")]
pub use format::wav::{decode_wav_file, encode_wav_memory, WavConfig};
