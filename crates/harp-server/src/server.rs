//! Endpoint server
//!
//! Serves one endpoint contract to a host over a Unix socket. Hosts connect
//! one at a time; a host disconnecting leaves the server waiting for the
//! next connection. Jobs keep running across reconnects.

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::protocol::{EndpointMessage, HostMessage};
use crate::queue::{join_workers, JobQueue};
use crate::transport::{is_disconnect, TransportListener};
use harp_core::{EndpointContract, ProcessRequest};

pub struct EndpointServer {
    config: ServerConfig,
    queue: JobQueue,
    shutdown_requested: bool,
}

impl EndpointServer {
    pub fn new(contract: EndpointContract, config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let queue = JobQueue::start(contract, config.workers, config.queue_capacity)?
            .retain_finished(config.retained_jobs);
        Ok(Self {
            config,
            queue,
            shutdown_requested: false,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub async fn run(&mut self) -> Result<()> {
        let listener = TransportListener::bind(&self.config.socket_path)
            .await?
            .with_max_frame_len(self.config.max_frame_len);
        tracing::info!(
            "Serving '{}' on {}",
            self.queue.contract().card().name,
            self.config.socket_path.display()
        );

        while !self.shutdown_requested {
            let mut transport = listener.accept().await?;
            tracing::info!("Host connected");

            loop {
                let msg = match transport.recv_host_message().await {
                    Ok(msg) => msg,
                    Err(e) if is_disconnect(&e) => {
                        tracing::info!("Host disconnected");
                        break;
                    }
                    // The frame was fully consumed, so the stream is still in sync.
                    Err(e @ ServerError::Serialization(_)) => {
                        tracing::warn!("Malformed host message: {}", e);
                        transport
                            .send_endpoint_message(&EndpointMessage::Error(e.report()))
                            .await?;
                        continue;
                    }
                    Err(e @ ServerError::FrameTooLarge { .. }) => {
                        tracing::warn!("Dropping host connection: {}", e);
                        let _ = transport
                            .send_endpoint_message(&EndpointMessage::Error(e.report()))
                            .await;
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Transport failure: {}", e);
                        break;
                    }
                };

                if let Some(response) = self.handle_message(msg) {
                    if let Err(e) = transport.send_endpoint_message(&response).await {
                        tracing::warn!("Failed to reply to host: {}", e);
                        break;
                    }
                }

                if self.shutdown_requested {
                    break;
                }
            }
        }

        // Running jobs may take a while; join them off the async runtime.
        let workers = self.queue.close();
        if let Err(e) = tokio::task::spawn_blocking(move || join_workers(workers)).await {
            tracing::warn!("Failed to join job workers: {}", e);
        }
        let _ = std::fs::remove_file(&self.config.socket_path);
        tracing::info!("Endpoint server stopped");
        Ok(())
    }

    fn handle_message(&mut self, msg: HostMessage) -> Option<EndpointMessage> {
        let response = match msg {
            HostMessage::Metadata => Ok(EndpointMessage::Metadata {
                document: self.queue.contract().metadata_document().clone(),
            }),

            HostMessage::Process { audio_path, values } => self
                .queue
                .enqueue(ProcessRequest { audio_path, values })
                .map(|job| EndpointMessage::Enqueued { job }),

            HostMessage::Cancel { job } => self
                .queue
                .cancel(job)
                .map(|accepted| EndpointMessage::Cancel { job, accepted }),

            HostMessage::Status { job } => self.queue.status(job).map(EndpointMessage::Status),

            HostMessage::Shutdown => {
                tracing::info!("Shutdown requested by host");
                self.shutdown_requested = true;
                return None;
            }
        };

        Some(response.unwrap_or_else(|e| {
            tracing::debug!("Request failed: {}", e);
            EndpointMessage::Error(e.report())
        }))
    }
}
