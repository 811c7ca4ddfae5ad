use std::future::Future;

use folio_models::contact::{ContactSubmissionRequest, ContactSubmissionViolations};
use thiserror::Error;

#[cfg_attr(feature = "mock", mockall::automock)]
pub trait ContactFeatureService: Send + Sync + 'static {
    /// Validates a contact form submission and forwards it by email.
    fn send_message(
        &self,
        request: ContactSubmissionRequest,
    ) -> impl Future<Output = Result<(), ContactSendMessageError>> + Send;
}

#[derive(Debug, Error)]
pub enum ContactSendMessageError {
    #[error("Invalid contact submission.")]
    Invalid(ContactSubmissionViolations),
    #[error("Email delivery is not configured: missing {0}.")]
    NotConfigured(&'static str),
    #[error("Failed to send message: {0:#}")]
    Send(anyhow::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(feature = "mock")]
impl MockContactFeatureService {
    pub fn with_send_message(
        mut self,
        request: ContactSubmissionRequest,
        result: Result<(), ContactSendMessageError>,
    ) -> Self {
        self.expect_send_message()
            .once()
            .with(mockall::predicate::eq(request))
            .return_once(|_| Box::pin(std::future::ready(result)));
        self
    }
}
