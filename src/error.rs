//! Centralized error type for the harp umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] harp_core::Error),

    #[cfg(feature = "export")]
    #[error("Export: {0}")]
    Export(#[from] harp_export::ExportError),

    #[cfg(feature = "server")]
    #[error("Server: {0}")]
    Server(#[from] harp_server::ServerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable snake_case identifier, as reported to the host.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Core(e) => e.kind(),
            #[cfg(feature = "export")]
            Error::Export(e) => match e {
                harp_export::ExportError::IoWrite(_) => "io_write_error",
                _ => "processing_error",
            },
            #[cfg(feature = "server")]
            Error::Server(e) => e.kind(),
            Error::Io(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
