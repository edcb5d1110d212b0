//! Audio file bridge
//!
//! Moves audio between the host's file paths and in-memory [`Signal`]s.
//! Every write lands on a fresh, uniquely named file inside an output
//! directory; nothing is ever overwritten and nothing is cleaned up.

use crate::error::{ExportError, Result};
use crate::format;
use crate::options::{AudioFormat, BitDepth};
use crate::signal::Signal;
use std::fs::{self, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

/// Attempts before giving up on finding an unused file name.
const MAX_NAME_ATTEMPTS: usize = 8;

/// Append-only directory that receives processed audio.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
    prefix: String,
    format: AudioFormat,
    bit_depth: BitDepth,
}

impl OutputDir {
    /// Output directory rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: String::from("harp-"),
            format: AudioFormat::default(),
            bit_depth: BitDepth::default(),
        }
    }

    /// The process-wide default: `<temp>/harp-outputs/<pid>`.
    pub fn process_default() -> &'static OutputDir {
        static DEFAULT: OnceLock<OutputDir> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            let root = std::env::temp_dir()
                .join("harp-outputs")
                .join(std::process::id().to_string());
            OutputDir::new(root)
        })
    }

    /// File name prefix (default `harp-`).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn bit_depth(mut self, bit_depth: BitDepth) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory (and parents) if absent.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn fresh_path(&self) -> PathBuf {
        self.root.join(format!(
            "{}{}.{}",
            self.prefix,
            Uuid::new_v4().simple(),
            self.format.extension()
        ))
    }

    /// Encode `signal` into a new file and return its path.
    pub fn save(&self, signal: &Signal) -> Result<PathBuf> {
        self.ensure()?;
        self.create_with(|path| format::write_new_file(signal, path, self.format, self.bit_depth))
            .inspect(|path| {
                log::debug!(
                    "Saved {} frames x {} channels @ {} Hz to {}",
                    signal.len(),
                    signal.num_channels(),
                    signal.sample_rate(),
                    path.display()
                )
            })
    }

    /// Copy an existing file byte-for-byte into a new file in this directory.
    pub fn copy_file(&self, src: &Path) -> Result<PathBuf> {
        self.ensure()?;
        let source = fs::File::open(src).map_err(|source| ExportError::Read {
            path: src.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(source);
        let path = self.create_with(|path| {
            let file = OpenOptions::new().write(true).create_new(true).open(path)?;
            let mut writer = BufWriter::new(file);
            io::copy(&mut reader, &mut writer)?;
            writer.flush()?;
            Ok(())
        })?;
        log::debug!("Copied {} to {}", src.display(), path.display());
        Ok(path)
    }

    // Retries only on name collisions. Any other failure is returned as-is.
    fn create_with(&self, mut write: impl FnMut(&Path) -> Result<()>) -> Result<PathBuf> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.fresh_path();
            match write(&path) {
                Ok(()) => return Ok(path),
                Err(ExportError::IoWrite(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                    log::warn!("Output name collision at {}, retrying", path.display());
                }
                Err(e) => {
                    log::error!("Failed to write {}: {}", path.display(), e);
                    return Err(e);
                }
            }
        }
        Err(ExportError::IoWrite(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "no free output name in {} after {} attempts",
                self.root.display(),
                MAX_NAME_ATTEMPTS
            ),
        )))
    }
}

/// Write `signal` into the process-wide output directory and return the new path.
///
/// Every call returns a distinct path. Existing files are never touched.
pub fn save_and_return_filepath(signal: &Signal) -> Result<PathBuf> {
    OutputDir::process_default().save(signal)
}

/// Decode the audio file at `path`.
pub fn load_audio(path: impl AsRef<Path>) -> Result<Signal> {
    let path = path.as_ref();
    let signal = format::read_file(path)?;
    log::debug!(
        "Loaded {} ({} frames, {} Hz)",
        path.display(),
        signal.len(),
        signal.sample_rate()
    );
    Ok(signal)
}
