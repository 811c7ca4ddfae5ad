use std::{fmt::Display, str::FromStr};

use lettre::{message::Mailbox, Address};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GMAIL_DOMAINS: &[&str] = &["gmail.com", "googlemail.com"];
const OUTLOOK_DOMAINS: &[&str] = &[
    "hotmail.com",
    "hotmail.co.uk",
    "hotmail.de",
    "hotmail.fr",
    "hotmail.it",
    "live.com",
    "live.co.uk",
    "live.de",
    "msn.com",
    "outlook.com",
    "outlook.de",
    "outlook.fr",
    "passport.com",
];
const ICLOUD_DOMAINS: &[&str] = &["icloud.com", "me.com", "mac.com"];
const YAHOO_DOMAINS: &[&str] = &[
    "yahoo.com",
    "yahoo.co.uk",
    "yahoo.de",
    "yahoo.fr",
    "ymail.com",
    "rocketmail.com",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress(pub Address);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddressWithName(pub Mailbox);

#[derive(Debug, Error)]
pub enum EmailAddressError {
    #[error("Invalid email address: {0}")]
    Syntax(#[from] lettre::address::AddressError),
    #[error("Email address domain has no top-level domain")]
    MissingTld,
}

impl EmailAddress {
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    pub fn user(&self) -> &str {
        self.0.user()
    }

    pub fn domain(&self) -> &str {
        self.0.domain()
    }

    pub fn with_name(self, name: impl Into<String>) -> EmailAddressWithName {
        EmailAddressWithName(Mailbox::new(Some(name.into()), self.0))
    }

    /// Parses an address the way a contact form expects it: surrounding
    /// whitespace is ignored and the domain must be a dotted host name with a
    /// top-level domain of at least two letters.
    pub fn parse_strict(s: &str) -> Result<Self, EmailAddressError> {
        let address = s.trim().parse::<Address>()?;

        let domain = address.domain();
        let mut labels = domain.split('.');
        let tld = labels.next_back().unwrap_or_default();
        let has_tld = domain.contains('.')
            && !domain.starts_with('[')
            && labels.all(|label| !label.is_empty())
            && tld.len() >= 2
            && tld.chars().all(|c| c.is_ascii_alphabetic());
        if !has_tld {
            return Err(EmailAddressError::MissingTld);
        }

        Ok(Self(address))
    }

    /// Folds case and provider specific aliases so that the same mailbox is
    /// always represented by the same address.
    ///
    /// - the whole address is lower-cased
    /// - Gmail: dots and `+tag` suffixes are removed from the local part and
    ///   `googlemail.com` becomes `gmail.com`
    /// - Outlook and iCloud: `+tag` suffixes are removed
    /// - Yahoo: `-tag` suffixes are removed
    pub fn normalize(&self) -> Self {
        let user = self.user().to_lowercase();
        let domain = self.domain().to_lowercase();

        let (user, domain) = if GMAIL_DOMAINS.contains(&domain.as_str()) {
            (strip_tag(&user, '+').replace('.', ""), "gmail.com".into())
        } else if OUTLOOK_DOMAINS.contains(&domain.as_str())
            || ICLOUD_DOMAINS.contains(&domain.as_str())
        {
            (strip_tag(&user, '+').into(), domain)
        } else if YAHOO_DOMAINS.contains(&domain.as_str()) {
            (strip_tag(&user, '-').into(), domain)
        } else {
            (user, domain)
        };

        Address::new(user, domain)
            .or_else(|_| Address::new(self.user().to_lowercase(), self.domain().to_lowercase()))
            .map(Self)
            .unwrap_or_else(|_| self.clone())
    }
}

fn strip_tag(user: &str, separator: char) -> &str {
    user.split_once(separator).map_or(user, |(user, _)| user)
}

impl EmailAddressWithName {
    pub fn email(&self) -> EmailAddress {
        EmailAddress(self.0.email.clone())
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn into_email_address(self) -> EmailAddress {
        EmailAddress(self.0.email)
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Display for EmailAddressWithName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EmailAddress {
    type Err = <Address as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl FromStr for EmailAddressWithName {
    type Err = <Mailbox as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<EmailAddress> for EmailAddressWithName {
    fn from(value: EmailAddress) -> Self {
        Self(Mailbox::new(None, value.0))
    }
}
