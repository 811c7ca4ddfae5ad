use std::{sync::Arc, time::Duration};

use anyhow::Context;
use folio_email_contracts::{Email, EmailService};
use folio_models::{email_address::EmailAddressWithName, Sensitive};
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

use crate::http::HttpClient;

pub mod http;

pub const SENDGRID_MAIL_SEND_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Sends emails through the SendGrid v3 mail send API.
#[derive(Debug, Clone)]
pub struct EmailServiceImpl {
    client: HttpClient,
    config: EmailServiceConfig,
}

#[derive(Debug, Clone)]
pub struct EmailServiceConfig {
    endpoint: Arc<Url>,
    api_key: Arc<Sensitive<String>>,
    from: Arc<EmailAddressWithName>,
    timeout: Duration,
}

impl EmailServiceConfig {
    pub fn new(
        api_key: String,
        from: EmailAddressWithName,
        endpoint_override: Option<Url>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let endpoint = match endpoint_override {
            Some(endpoint) => endpoint,
            None => SENDGRID_MAIL_SEND_ENDPOINT
                .parse()
                .context("Failed to parse SendGrid endpoint")?,
        };

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: Arc::new(api_key.into()),
            from: from.into(),
            timeout,
        })
    }

    pub fn from(&self) -> &EmailAddressWithName {
        &self.from
    }
}

impl EmailServiceImpl {
    pub fn new(client: HttpClient, config: EmailServiceConfig) -> Self {
        Self { client, config }
    }
}

impl EmailService for EmailServiceImpl {
    async fn send(&self, email: Email) -> anyhow::Result<bool> {
        let request = MailSendRequest::new(&self.config.from, &email);

        let response = self
            .client
            .post((*self.config.endpoint).clone())
            .bearer_auth(&***self.config.api_key)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to SendGrid")?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "email accepted by sendgrid");
            return Ok(true);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|err| format!("<failed to read response body: {err}>"));
        error!(%status, body, "sendgrid rejected email");

        Ok(false)
    }
}

#[derive(Serialize)]
struct MailSendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: MailAddress<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<MailAddress<'a>>,
    subject: &'a str,
    content: Vec<MailContent<'a>>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [MailAddress<'a>; 1],
}

#[derive(Serialize)]
struct MailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct MailContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

impl<'a> MailSendRequest<'a> {
    fn new(from: &'a EmailAddressWithName, email: &'a Email) -> Self {
        // text/plain has to come first
        let content = [
            Some(MailContent {
                content_type: "text/plain",
                value: &email.text,
            }),
            email.html.as_deref().map(|html| MailContent {
                content_type: "text/html",
                value: html,
            }),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            personalizations: [Personalization {
                to: [(&email.recipient).into()],
            }],
            from: from.into(),
            reply_to: email.reply_to.as_ref().map(Into::into),
            subject: &email.subject,
            content,
        }
    }
}

impl<'a> From<&'a EmailAddressWithName> for MailAddress<'a> {
    fn from(value: &'a EmailAddressWithName) -> Self {
        Self {
            email: value.0.email.as_ref(),
            name: value.name(),
        }
    }
}
