//! Endpoint server binary. Serves the built-in gain endpoint to a host.

use harp_export::OutputDir;
use harp_server::demo::gain_endpoint;
use harp_server::{EndpointServer, Result, ServerConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = ServerConfig::from_env()?;
    if let Some(socket_path) = env::args().nth(1) {
        config = config.socket_path(socket_path);
    }

    let output = match &config.output_dir {
        Some(dir) => OutputDir::new(dir),
        None => OutputDir::process_default().clone(),
    };
    tracing::info!("Writing outputs to {}", output.root().display());

    let contract = gain_endpoint(output)?;
    let mut server = EndpointServer::new(contract, config)?;
    server.run().await
}
