use folio_config::Config;
use tracing::{info, warn};

use crate::{
    email,
    environment::{ConfigProvider, Provider},
};

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let config_provider = ConfigProvider::new(&config)?;

    let email = match &config_provider.email_service_config {
        Some(email_service_config) => {
            info!(
                from = %email_service_config.from(),
                "Using SendGrid for email delivery"
            );
            Some(email::connect(email_service_config)?)
        }
        None => {
            warn!(
                "Email delivery is not configured (missing {}), contact messages cannot be sent",
                config.email.missing().join(", ")
            );
            None
        }
    };

    if config.http.allowed_origins.is_empty() {
        warn!("No allowed origins configured, browser requests from any origin will be rejected");
    }

    let provider = Provider::new(config_provider, email);
    let server = provider.rest_server();
    info!(
        mode = ?config.http.mode,
        "Starting http server on {}:{}", config.http.host, config.http.port
    );
    server.serve(config.http.host, config.http.port).await
}
