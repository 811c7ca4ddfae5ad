use anyhow::{anyhow, ensure};
use clap::Subcommand;
use folio_config::Config;
use folio_email_contracts::{Email, EmailService};
use folio_models::email_address::EmailAddressWithName;

use crate::{email, environment::ConfigProvider};

#[derive(Debug, Subcommand)]
pub enum EmailCommand {
    /// Test email deliverability
    Test { recipient: EmailAddressWithName },
}

impl EmailCommand {
    pub async fn invoke(self, config: Config) -> anyhow::Result<()> {
        match self {
            EmailCommand::Test { recipient } => test(config, recipient).await,
        }
    }
}

async fn test(config: Config, recipient: EmailAddressWithName) -> anyhow::Result<()> {
    let email_service_config = ConfigProvider::new(&config)?
        .email_service_config
        .ok_or_else(|| {
            anyhow!(
                "Email delivery is not configured, missing {}",
                config.email.missing().join(", ")
            )
        })?;
    let email_service = email::connect(&email_service_config)?;

    let ok = email_service
        .send(Email {
            recipient,
            subject: "Email Deliverability Test".into(),
            text: "Email deliverability seems to be working!".into(),
            html: None,
            reply_to: None,
        })
        .await?;

    ensure!(ok, "Failed to send email");

    Ok(())
}
