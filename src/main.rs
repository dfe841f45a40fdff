mod app;
mod config;
mod discovery;
mod error;
mod flow;
mod genai;
mod image;
mod inference;
mod logger;
mod models;
mod profiles;
mod router;
mod session;
mod signer;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use app::OcrApp;
use config::{default_config_path, load_or_init};
use genai::OciGenAiClient;
use router::{run_router, RouterState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config_path = default_config_path()?;
  let config = load_or_init(&config_path)?;
  logger::init(config.log_file.as_deref())?;
  tracing::info!(config = %config_path.display(), "oci-vision-ocr starting up");

  let service = OciGenAiClient::new(&config).context("cannot create Generative AI client")?;

  let listener = std::net::TcpListener::bind(&config.listen_addr)
    .with_context(|| format!("cannot bind {}", config.listen_addr))?;
  let addr = listener.local_addr()?;
  tracing::info!(
    oci_config = %config.oci_config_path().display(),
    endpoint = %config.inference_endpoint,
    "open http://{addr}/ in a browser"
  );

  let state = RouterState {
    started_at: Instant::now(),
    app: OcrApp::new(config, Arc::new(service)),
  };
  run_router(listener, state).await
}
