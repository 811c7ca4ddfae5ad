use serde::Serialize;

use crate::{email_address::EmailAddress, macros::nutype_string};

nutype_string!(ContactName(
    sanitize(trim),
    validate(len_char_min = 2, len_char_max = 100)
));

nutype_string!(ContactMessageContent(
    sanitize(trim),
    validate(len_char_min = 2, len_char_max = 5000)
));

/// A contact form submission as it arrives from the client, before any
/// validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSubmissionRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// A fully validated contact form submission.
///
/// `name` and `message` are trimmed, `email` is normalized. Use
/// [`escaped_name`](Self::escaped_name) and
/// [`escaped_message`](Self::escaped_message) whenever the text ends up in a
/// message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: ContactName,
    pub email: EmailAddress,
    pub message: ContactMessageContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactField {
    Name,
    Email,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContactFieldViolation {
    pub field: ContactField,
    pub message: &'static str,
}

/// Non-empty list of field violations, ordered by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmissionViolations(Vec<ContactFieldViolation>);

impl ContactSubmission {
    /// Validates all fields of `request`.
    ///
    /// A submission is either accepted as a whole or rejected with one
    /// violation per invalid field.
    pub fn validate(request: &ContactSubmissionRequest) -> Result<Self, ContactSubmissionViolations> {
        let name = ContactName::try_new(request.name.clone())
            .map_err(|_| ContactFieldViolation::NAME_LENGTH);
        let email = EmailAddress::parse_strict(&request.email)
            .map(|email| email.normalize())
            .map_err(|_| ContactFieldViolation::EMAIL_INVALID);
        let message = ContactMessageContent::try_new(request.message.clone())
            .map_err(|_| ContactFieldViolation::MESSAGE_LENGTH);

        match (name, email, message) {
            (Ok(name), Ok(email), Ok(message)) => Ok(Self {
                name,
                email,
                message,
            }),
            (name, email, message) => Err(ContactSubmissionViolations(
                [name.err(), email.err(), message.err()]
                    .into_iter()
                    .flatten()
                    .collect(),
            )),
        }
    }

    pub fn escaped_name(&self) -> String {
        escape(&self.name)
    }

    pub fn escaped_message(&self) -> String {
        escape(&self.message)
    }
}

/// Escapes HTML special characters, backslashes and backticks.
fn escape(input: &str) -> String {
    tera::escape_html(input)
        .replace('\\', "&#x5C;")
        .replace('`', "&#96;")
}

impl ContactFieldViolation {
    pub const NAME_LENGTH: Self = Self {
        field: ContactField::Name,
        message: "Name must be between 2 and 100 characters",
    };
    pub const EMAIL_INVALID: Self = Self {
        field: ContactField::Email,
        message: "Invalid email address",
    };
    pub const MESSAGE_LENGTH: Self = Self {
        field: ContactField::Message,
        message: "Message must be between 2 and 5000 characters",
    };
}

impl ContactSubmissionViolations {
    pub fn iter(&self) -> impl Iterator<Item = &ContactFieldViolation> {
        self.0.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = ContactField> + '_ {
        self.0.iter().map(|violation| violation.field)
    }

    pub fn into_inner(self) -> Vec<ContactFieldViolation> {
        self.0
    }
}

impl std::fmt::Display for ContactField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Message => "message",
        })
    }
}
