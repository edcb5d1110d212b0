//! Reference runtime for HARP endpoints
//!
//! Hosts one [`EndpointContract`](harp_core::EndpointContract) behind a
//! Unix socket: a [`JobQueue`] runs process invocations on worker threads
//! and tracks each job through `Queued → Running → Succeeded | Failed |
//! Cancelled`, while [`EndpointServer`] answers host messages.
//!
//! Used by the `harp-endpoint` binary. Embed it directly to serve your own
//! contract:
//!
//! ```ignore
//! let contract = harp_core::build(inputs, output, my_fn, card)?;
//! let mut server = EndpointServer::new(contract, ServerConfig::from_env()?)?;
//! server.run().await?;
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod protocol;
pub mod queue;

#[cfg(unix)]
pub mod server;
#[cfg(unix)]
pub mod transport;

// Re-exports
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use protocol::{EndpointMessage, HostMessage};
pub use queue::{JobQueue, JobStatus};

#[cfg(unix)]
pub use server::EndpointServer;
#[cfg(unix)]
pub use transport::{MessageTransport, TransportListener};
