use cursor_relay::config::Config;
use cursor_relay::server::telemetry::{init_telemetry, shutdown_telemetry};
use cursor_relay::server::{shutdown_signal, WebSocketServer};
use cursor_relay::Result;
use tracing::{debug, error};

#[tokio::main]
pub async fn main() -> Result<()> {
    let config = Config::from_args()?;
    init_telemetry(&config)?;
    debug!(?config, "Loaded configuration");

    let server = WebSocketServer::new(config.clone());
    let listener = server.bind().await?;
    let result = server.run(listener, shutdown_signal()).await;
    if let Err(e) = &result {
        error!(error = ?e, "Relay terminated with error");
    }

    shutdown_telemetry(&config);
    result
}
