//! Client side of the contact form: local form state and the request to the
//! contact backend.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use anyhow::Context;
use folio_models::contact::ContactField;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3033";
pub const SEND_PATH: &str = "/api/send";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS_FALLBACK: &str = "Message sent successfully!";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactFormFields {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ContactFormError {
    #[error("A submission is already in progress")]
    AlreadySubmitting,
    /// The server answered with an error and explained why.
    #[error("{message}")]
    Server {
        status: StatusCode,
        message: String,
        errors: Vec<FieldError>,
    },
    #[error("Network/Client error: Request failed with status code {}", .0.as_u16())]
    Status(StatusCode),
    #[error("Network/Client error: {0}")]
    Network(#[source] reqwest::Error),
}

impl ContactFormError {
    /// The text to show to the user.
    ///
    /// This is the server's explanation if it sent one, otherwise the status
    /// code or the transport error.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Sends contact form submissions to the backend.
#[derive(Debug, Clone)]
pub struct ContactFormClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl ContactFormClient {
    /// `base_url` may end with a `/`.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let endpoint = format!("{}{SEND_PATH}", base_url.trim().trim_end_matches('/'))
            .parse()
            .with_context(|| format!("Invalid base url {base_url:?}"))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build http client")?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submits `fields` and returns the confirmation message.
    pub async fn send(&self, fields: &ContactFormFields) -> Result<String, ContactFormError> {
        debug!(endpoint = %self.endpoint, ?fields, "sending contact form");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(fields)
            .send()
            .await
            .map_err(ContactFormError::Network)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ContactFormError::Network)?;
        let body = serde_json::from_slice::<ResponseBody>(&body).unwrap_or_default();

        if status.is_success() {
            debug!(%status, ?body, "contact form accepted");
            return Ok(body.message.unwrap_or_else(|| SUCCESS_FALLBACK.into()));
        }

        debug!(%status, ?body, "contact form rejected");
        match body.error.or(body.message) {
            Some(message) if !message.is_empty() => Err(ContactFormError::Server {
                status,
                message,
                errors: body.errors,
            }),
            _ => Err(ContactFormError::Status(status)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResponseBody {
    message: Option<String>,
    error: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// The state of a contact form.
///
/// Only one submission can be in flight at a time. Fields are cleared after a
/// successful submission and kept otherwise.
#[derive(Debug)]
pub struct ContactForm {
    client: ContactFormClient,
    fields: Mutex<ContactFormFields>,
    submitting: AtomicBool,
}

impl ContactForm {
    pub fn new(client: ContactFormClient) -> Self {
        Self {
            client,
            fields: Default::default(),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn set(&self, field: ContactField, value: impl Into<String>) {
        let mut fields = self.lock_fields();
        let slot = match field {
            ContactField::Name => &mut fields.name,
            ContactField::Email => &mut fields.email,
            ContactField::Message => &mut fields.message,
        };
        *slot = value.into();
    }

    pub fn fields(&self) -> ContactFormFields {
        self.lock_fields().clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub async fn submit(&self) -> Result<String, ContactFormError> {
        let Some(_guard) = SubmittingGuard::acquire(&self.submitting) else {
            return Err(ContactFormError::AlreadySubmitting);
        };

        let fields = self.fields();
        match self.client.send(&fields).await {
            Ok(message) => {
                info!(%message, "contact form sent");
                *self.lock_fields() = ContactFormFields::default();
                Ok(message)
            }
            Err(err) => {
                error!("failed to send contact form: {err}");
                Err(err)
            }
        }
    }

    fn lock_fields(&self) -> std::sync::MutexGuard<'_, ContactFormFields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the submitting flag when dropped.
struct SubmittingGuard<'a>(&'a AtomicBool);

impl<'a> SubmittingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
