use anyhow::bail;
use clap::Subcommand;
use folio_client::{ContactForm, ContactFormClient, ContactFormError, DEFAULT_BASE_URL};
use folio_models::contact::ContactField;

#[derive(Debug, Subcommand)]
pub enum ContactCommand {
    /// Submit a message through the contact form of a running server
    #[command(aliases(["s"]))]
    Send {
        /// Base url of the contact backend
        #[arg(long, env = "FOLIO_URL", default_value = DEFAULT_BASE_URL)]
        url: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
}

impl ContactCommand {
    pub async fn invoke(self) -> anyhow::Result<()> {
        match self {
            ContactCommand::Send {
                url,
                name,
                email,
                message,
            } => send(&url, name, email, message).await,
        }
    }
}

async fn send(url: &str, name: String, email: String, message: String) -> anyhow::Result<()> {
    let form = ContactForm::new(ContactFormClient::new(url)?);
    form.set(ContactField::Name, name);
    form.set(ContactField::Email, email);
    form.set(ContactField::Message, message);

    match form.submit().await {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            if let ContactFormError::Server { errors, .. } = &err {
                for error in errors {
                    eprintln!("{}: {}", error.field, error.message);
                }
            }
            bail!("{}", err.user_message())
        }
    }
}
