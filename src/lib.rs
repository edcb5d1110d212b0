//! # HARP - Hosted Audio Processing Endpoints
//!
//! Expose an offline audio-processing function to a desktop audio host.
//!
//! ## Architecture
//!
//! HARP is an umbrella crate that coordinates:
//! - **harp-core** - Control descriptors, model card, endpoint contract
//! - **harp-export** - Audio file bridge (decode inputs, save outputs)
//! - **harp-server** - Job queue, cancellation, Unix-socket host protocol
//!
//! ## Quick Start
//!
//! ```ignore
//! use harp::prelude::*;
//!
//! let contract = build(
//!     vec![
//!         ControlDescriptor::audio_input("Input"),
//!         ControlDescriptor::slider("Gain (dB)", -24.0, 24.0, 0.5, 0.0),
//!     ],
//!     ControlDescriptor::audio_output("Output"),
//!     |audio: PathBuf, gain_db: f64| -> harp::export::Result<PathBuf> {
//!         let mut signal = load_audio(&audio)?;
//!         let g = 10f32.powf(gain_db as f32 / 20.0);
//!         signal.map_samples(|s| s * g);
//!         save_and_return_filepath(&signal)
//!     },
//!     ModelCard::new("Gain", "Scales the input", "Me"),
//! )?;
//!
//! // Serve it to a host
//! let mut server = EndpointServer::new(contract, ServerConfig::from_env()?)?;
//! server.run().await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - `export` + `server`
//! - `export` - Audio file bridge (WAV)
//! - `server` - Reference runtime and socket protocol

/// Re-export of harp-core for direct access
pub use harp_core as core;

// Core types
pub use harp_core::{
    build,
    describe,
    // Cancellation
    CancellationToken,
    // Controls
    ControlDescriptor,
    ControlRole,
    ControlValue,
    // Contract
    EndpointBuilder,
    EndpointContract,
    EndpointMetadata,
    ErrorReport,
    ErrorStage,
    JobContext,
    JobId,
    JobState,
    // Card
    ModelCard,
    PathMode,
    ProcessFn,
    ProcessRequest,
    Processor,
    ToolkitControl,
    ValueKind,
};

// Audio file bridge
#[cfg(feature = "export")]
pub use harp_export as export;
#[cfg(feature = "export")]
pub use harp_export::{load_audio, save_and_return_filepath, BitDepth, OutputDir, Signal};

// Runtime
#[cfg(feature = "server")]
pub use harp_server as server;
#[cfg(feature = "server")]
pub use harp_server::{JobQueue, JobStatus, ServerConfig};
#[cfg(all(feature = "server", unix))]
pub use harp_server::EndpointServer;

mod error;
pub use error::{Error, Result};

/// Convenient imports for endpoint authors.
pub mod prelude {
    pub use crate::{
        build, ControlDescriptor, EndpointContract, JobContext, ModelCard, ProcessRequest,
    };
    pub use std::path::PathBuf;

    // Bridge
    #[cfg(feature = "export")]
    pub use crate::export::{load_audio, save_and_return_filepath, OutputDir, Signal};

    // Runtime
    #[cfg(feature = "server")]
    pub use crate::server::{JobQueue, ServerConfig};
    #[cfg(all(feature = "server", unix))]
    pub use crate::server::EndpointServer;
}
