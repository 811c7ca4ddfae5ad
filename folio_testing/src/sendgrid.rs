//! Fake implementation of the SendGrid v3 mail send API.

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::{
        atomic::{AtomicU16, Ordering},
        Arc,
    },
};

use anyhow::Context;
pub use axum::http::StatusCode;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};
use tracing::{error, info};
use url::Url;

pub const MAIL_SEND_ROUTE: &str = "/v3/mail/send";

pub async fn start_server(host: IpAddr, port: u16, api_key: String) -> anyhow::Result<()> {
    info!("Starting sendgrid testing server on {host}:{port}");
    info!("Mail send endpoint: http://{host}:{port}{MAIL_SEND_ROUTE}");
    info!("API key: {api_key:?}");

    let state = Arc::new(StateInner::new(api_key, true));

    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind to {host}:{port}"))?;
    axum::serve(listener, router(state))
        .await
        .context("Failed to start HTTP server")
}

/// A fake SendGrid server running in the background of the current tokio
/// runtime. It listens on an ephemeral port on localhost and is stopped when
/// dropped.
#[derive(Debug)]
pub struct FakeSendgrid {
    endpoint: Url,
    state: Arc<StateInner>,
    server: JoinHandle<()>,
}

impl FakeSendgrid {
    pub async fn spawn(api_key: impl Into<String>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .context("Failed to bind fake sendgrid server")?;
        let addr = listener.local_addr()?;
        let endpoint = format!("http://{addr}{MAIL_SEND_ROUTE}").parse()?;

        let state = Arc::new(StateInner::new(api_key.into(), false));
        let router = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                error!("fake sendgrid server failed: {err}");
            }
        });

        Ok(Self {
            endpoint,
            state,
            server,
        })
    }

    /// The url of the mail send endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// All messages accepted so far.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.messages.lock().await.clone()
    }

    /// Answer every following request with `status` instead of accepting it.
    pub fn fail_with(&self, status: StatusCode) {
        self.state.failure.store(status.as_u16(), Ordering::Relaxed);
    }

    pub fn accept(&self) {
        self.state.failure.store(0, Ordering::Relaxed);
    }
}

impl Drop for FakeSendgrid {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub personalizations: Vec<Personalization>,
    pub from: Address,
    #[serde(default)]
    pub reply_to: Option<Address>,
    pub subject: String,
    pub content: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personalization {
    pub to: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

impl Message {
    pub fn recipients(&self) -> Vec<&str> {
        self.personalizations
            .iter()
            .flat_map(|personalization| &personalization.to)
            .map(|address| address.email.as_str())
            .collect()
    }

    pub fn text(&self) -> Option<&str> {
        self.content_of("text/plain")
    }

    pub fn html(&self) -> Option<&str> {
        self.content_of("text/html")
    }

    fn content_of(&self, content_type: &str) -> Option<&str> {
        self.content
            .iter()
            .find(|content| content.content_type == content_type)
            .map(|content| content.value.as_str())
    }
}

fn router(state: Arc<StateInner>) -> Router<()> {
    Router::new()
        .route(MAIL_SEND_ROUTE, routing::post(mail_send))
        .with_state(state)
}

#[derive(Debug)]
struct StateInner {
    api_key: String,
    messages: Mutex<Vec<Message>>,
    failure: AtomicU16,
    log_messages: bool,
}

impl StateInner {
    fn new(api_key: String, log_messages: bool) -> Self {
        Self {
            api_key,
            messages: Default::default(),
            failure: AtomicU16::new(0),
            log_messages,
        }
    }
}

#[derive(Serialize)]
struct ErrorsResponse {
    errors: [ErrorDetail; 1],
}

#[derive(Serialize)]
struct ErrorDetail {
    message: &'static str,
}

fn errors(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        Json(ErrorsResponse {
            errors: [ErrorDetail { message }],
        }),
    )
        .into_response()
}

async fn mail_send(
    state: State<Arc<StateInner>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Json(message): Json<Message>,
) -> Response {
    if auth.as_ref().map(|auth| auth.0.token()) != Some(state.api_key.as_str()) {
        return errors(
            StatusCode::UNAUTHORIZED,
            "The provided authorization grant is invalid, expired, or revoked",
        );
    }

    match state.failure.load(Ordering::Relaxed) {
        0 => {}
        status => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return errors(status, "Simulated failure");
        }
    }

    if message.recipients().is_empty() {
        return errors(StatusCode::BAD_REQUEST, "The to field is required");
    }
    if message.content.is_empty() {
        return errors(StatusCode::BAD_REQUEST, "The content field is required");
    }

    if state.log_messages {
        info!(
            to = ?message.recipients(),
            from = %message.from.email,
            subject = %message.subject,
            "received message\n{}",
            message.text().unwrap_or_default()
        );
    }

    state.messages.lock().await.push(message);

    StatusCode::ACCEPTED.into_response()
}
