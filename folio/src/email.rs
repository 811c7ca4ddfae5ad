use anyhow::Context;
use folio_email_impl::{http::HttpClient, EmailServiceConfig, EmailServiceImpl};

/// Create the SendGrid client
pub fn connect(config: &EmailServiceConfig) -> anyhow::Result<EmailServiceImpl> {
    let client = HttpClient::new().context("Failed to create http client for SendGrid")?;
    Ok(EmailServiceImpl::new(client, config.clone()))
}
