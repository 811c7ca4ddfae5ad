use std::sync::Arc;

use anyhow::anyhow;
use folio_core_contact_contracts::{ContactFeatureService, ContactSendMessageError};
use folio_email_contracts::{Email, EmailService};
use folio_models::{
    contact::{ContactSubmission, ContactSubmissionRequest},
    email_address::EmailAddressWithName,
};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ContactFeatureServiceImpl<Email> {
    /// `None` if no delivery credentials or sender are configured.
    email: Option<Email>,
    config: ContactFeatureConfig,
}

#[derive(Debug, Clone)]
pub struct ContactFeatureConfig {
    pub recipient: Option<Arc<EmailAddressWithName>>,
}

impl<Email> ContactFeatureServiceImpl<Email> {
    pub fn new(email: Option<Email>, config: ContactFeatureConfig) -> Self {
        Self { email, config }
    }
}

impl<EmailS> ContactFeatureService for ContactFeatureServiceImpl<EmailS>
where
    EmailS: EmailService,
{
    async fn send_message(
        &self,
        request: ContactSubmissionRequest,
    ) -> Result<(), ContactSendMessageError> {
        let submission =
            ContactSubmission::validate(&request).map_err(ContactSendMessageError::Invalid)?;
        debug!(email = %submission.email, "received valid contact submission");

        let Some(email_service) = &self.email else {
            return Err(ContactSendMessageError::NotConfigured(
                "email.api_key or email.from",
            ));
        };
        let Some(recipient) = &self.config.recipient else {
            return Err(ContactSendMessageError::NotConfigured("email.to"));
        };

        let email = compose(&submission, recipient);

        match email_service.send(email).await {
            Ok(true) => {
                info!(email = %submission.email, "forwarded contact message");
                Ok(())
            }
            Ok(false) => Err(ContactSendMessageError::Send(anyhow!(
                "email was rejected by the delivery provider"
            ))),
            Err(err) => Err(ContactSendMessageError::Send(err)),
        }
    }
}

/// Builds the notification email for a validated submission.
///
/// Name and message are inserted in their escaped form. The submitter is set
/// as reply-to address.
pub fn compose(submission: &ContactSubmission, recipient: &EmailAddressWithName) -> Email {
    let name = submission.escaped_name();
    let email = submission.email.as_str();
    let message = submission.escaped_message();

    let html = format!(
        "<div style=\"font-family:Arial,sans-serif\">\
         <h3>Portfolio Contact</h3>\
         <p><strong>Name:</strong> {name}</p>\
         <p><strong>Email:</strong> {email}</p>\
         <p><strong>Message:</strong></p>\
         <div>{message}</div>\
         </div>",
        email = tera::escape_html(email),
        message = message.replace('\n', "<br/>"),
    );

    Email {
        recipient: recipient.clone(),
        subject: format!("Portfolio Contact — {name}"),
        text: format!("Name: {name}\nEmail: {email}\n\n{message}"),
        html: Some(html),
        reply_to: Some(submission.email.clone().into()),
    }
}
