use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, Router};
use folio_core_contact_contracts::ContactFeatureService;
use folio_utils::Apply;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub mod errors;
mod middlewares;
mod models;
mod routes;

pub use middlewares::{client_ip::ClientIp, request_id::RequestId};

/// Maximum accepted size of a request body.
const BODY_LIMIT: usize = 100 * 1024;

#[derive(Debug, Clone)]
pub struct RestServer<Contact> {
    contact: Contact,
    config: RestServerConfig,
}

#[derive(Debug, Clone)]
pub struct RestServerConfig {
    /// Origins which may call the API from a browser. Requests with any other
    /// `Origin` header are rejected.
    pub allowed_origins: Vec<String>,
    /// Log every request and response.
    pub request_logging: bool,
    pub rate_limit: RateLimitConfig,
    pub real_ip: Option<RealIpConfig>,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: NonZeroU32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct RealIpConfig {
    pub header: String,
    pub set_from: IpAddr,
}

impl<Contact> RestServer<Contact>
where
    Contact: ContactFeatureService,
{
    pub fn new(contact: Contact, config: RestServerConfig) -> Self {
        Self { contact, config }
    }

    pub async fn serve(self, host: IpAddr, port: u16) -> anyhow::Result<()> {
        let router = self.router();

        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind to {host}:{port}"))?;
        info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start HTTP server")
    }

    /// Builds the router with all routes and middlewares.
    ///
    /// The router expects [`ConnectInfo<SocketAddr>`](axum::extract::ConnectInfo)
    /// to be available.
    pub fn router(self) -> Router<()> {
        let RestServerConfig {
            allowed_origins,
            request_logging,
            rate_limit,
            real_ip,
        } = self.config;

        Router::new()
            .merge(routes::health::router())
            .merge(
                routes::contact::router(self.contact.into())
                    .apply(middlewares::rate_limit::add(rate_limit)),
            )
            .fallback(errors::not_found)
            .layer(DefaultBodyLimit::max(BODY_LIMIT))
            .apply(middlewares::cors::add(&allowed_origins))
            .apply(middlewares::panic_handler::add)
            .apply(middlewares::security_headers::add)
            .apply_if(request_logging, middlewares::trace::add)
            .apply(middlewares::client_ip::add(real_ip.map(Arc::new)))
            .apply(middlewares::request_id::add)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl+c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
}
