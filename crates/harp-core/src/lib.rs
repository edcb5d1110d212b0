//! Endpoint contract for hosted audio processing.
//!
//! Exposes an offline audio-processing function to a desktop audio host:
//! the host fetches a metadata document describing the endpoint's controls,
//! renders a panel, and invokes the process operation with an audio file path
//! plus one value per control.
//!
//! ## Usage
//!
//! ```ignore
//! use harp_core::{build, ControlDescriptor, JobContext, ModelCard, ProcessRequest};
//! use std::path::PathBuf;
//!
//! let contract = build(
//!     vec![
//!         ControlDescriptor::audio_input("Input"),
//!         ControlDescriptor::slider("Semitones", -24.0, 24.0, 1.0, 0.0),
//!     ],
//!     ControlDescriptor::audio_output("Output"),
//!     |audio: PathBuf, semitones: f64| pitch_shift(audio, semitones),
//!     ModelCard::new("Pitch Shifter", "Shifts pitch", "HARP"),
//! )?;
//!
//! let doc = contract.metadata_document();
//! let out = contract.process(&JobContext::detached(), ProcessRequest::new("in.wav").value(3.0))?;
//! ```
//!
//! The core is synchronous and owns no threads. Queueing and cancellation
//! bookkeeping belong to the hosting runtime, which hands each invocation a
//! [`JobContext`].

pub mod error;
pub use error::{Error, ErrorReport, ErrorStage, Result};

mod card;
pub use card::ModelCard;

pub mod control;
pub use control::{
    describe, ControlDescriptor, ControlRole, ControlValue, PathMode, ToolkitControl, ValueKind,
};

mod context;
pub use context::{CancellationToken, JobContext, JobId, JobState};

pub mod process;
pub use process::{FromControlValue, IntoProcessOutput, ParamKind, ProcessFn, Processor};

mod contract;
pub use contract::{build, EndpointBuilder, EndpointContract, EndpointMetadata, ProcessRequest};
