//! Error types for the endpoint contract

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Where in the endpoint lifecycle an error can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    /// Descriptor validation (startup)
    Descriptor,
    /// Contract validation (startup)
    Contract,
    /// Per-job invocation
    Invocation,
}

impl std::fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorStage::Descriptor => write!(f, "descriptor validation"),
            ErrorStage::Contract => write!(f, "contract validation"),
            ErrorStage::Invocation => write!(f, "invocation"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported control kind: {0}")]
    UnsupportedControlKind(String),

    #[error("Audio control '{label}' uses transport mode '{mode}', expected 'filepath'")]
    InvalidAudioMode { label: String, mode: String },

    #[error("Slider '{label}' default {default} is outside [{minimum}, {maximum}]")]
    InvalidDefault {
        label: String,
        default: f64,
        minimum: f64,
        maximum: f64,
    },

    #[error("Slider '{label}' has an invalid range: {reason}")]
    InvalidRange { label: String, reason: String },

    #[error("Endpoint inputs contain no audio input")]
    MissingAudioInput,

    #[error("Endpoint inputs contain {count} audio inputs, expected exactly one")]
    MultipleAudioInputs { count: usize },

    #[error("Endpoint output must be an audio output, got {kind}")]
    InvalidOutputKind { kind: String },

    #[error("Processing function takes {actual} arguments but {expected} inputs are declared")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Parameter {position} expects {expected} but control '{label}' is {found}")]
    SignatureMismatch {
        position: usize,
        label: String,
        expected: String,
        found: String,
    },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Processing failed: {0}")]
    Processing(String),

    /// Only raised for failed filesystem writes of output audio.
    #[error("Failed to write audio: {0}")]
    IoWrite(#[source] io::Error),

    #[error("Job {0} was cancelled")]
    Cancelled(u64),
}

impl Error {
    /// Stable snake_case identifier used in structured error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedControlKind(_) => "unsupported_control_kind",
            Error::InvalidAudioMode { .. } => "invalid_audio_mode",
            Error::InvalidDefault { .. } => "invalid_default",
            Error::InvalidRange { .. } => "invalid_range",
            Error::MissingAudioInput => "missing_audio_input",
            Error::MultipleAudioInputs { .. } => "multiple_audio_inputs",
            Error::InvalidOutputKind { .. } => "invalid_output_kind",
            Error::ArityMismatch { .. } => "arity_mismatch",
            Error::SignatureMismatch { .. } => "signature_mismatch",
            Error::InvalidArguments(_) => "invalid_arguments",
            Error::Processing(_) => "processing_error",
            Error::IoWrite(_) => "io_write_error",
            Error::Cancelled(_) => "cancelled",
        }
    }

    pub fn stage(&self) -> ErrorStage {
        match self {
            Error::UnsupportedControlKind(_)
            | Error::InvalidAudioMode { .. }
            | Error::InvalidDefault { .. }
            | Error::InvalidRange { .. } => ErrorStage::Descriptor,
            Error::MissingAudioInput
            | Error::MultipleAudioInputs { .. }
            | Error::InvalidOutputKind { .. }
            | Error::ArityMismatch { .. }
            | Error::SignatureMismatch { .. } => ErrorStage::Contract,
            Error::InvalidArguments(_)
            | Error::Processing(_)
            | Error::IoWrite(_)
            | Error::Cancelled(_) => ErrorStage::Invocation,
        }
    }

    /// Build-time errors are fatal to the endpoint definition.
    pub fn is_fatal(&self) -> bool {
        self.stage() != ErrorStage::Invocation
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Processing(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Processing(message.to_string())
    }
}

/// Structured `{kind, message}` error sent back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
