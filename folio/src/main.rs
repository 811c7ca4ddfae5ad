use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use folio::commands::{contact::ContactCommand, email::EmailCommand, serve::serve};
use folio_config::Config;
use folio_utils::folio_version;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();

    match cli.command {
        Command::Serve => serve(load_config()?).await?,
        Command::Email { command } => command.invoke(load_config()?).await?,
        // talks to a remote server and does not need the local config
        Command::Contact { command } => command.invoke().await?,
        Command::CheckConfig { verbose } => check_config(&load_config()?, verbose),
        Command::Completion { shell } => clap_complete::generate(
            shell,
            &mut Cli::command(),
            env!("CARGO_BIN_NAME"),
            &mut std::io::stdout(),
        ),
    }

    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    folio_config::load().context("Failed to load config")
}

fn check_config(config: &Config, verbose: bool) {
    let missing = config.email.missing();
    if !missing.is_empty() {
        eprintln!(
            "warning: email delivery is not configured, missing {}",
            missing.join(", ")
        );
    }
    if verbose {
        println!("{config:#?}");
    }
}

#[derive(Debug, Parser)]
#[command(version = folio_version())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the REST API server of the portfolio contact backend
    #[command(aliases(["run", "start", "r", "s"]))]
    Serve,
    /// Test email deliverability
    #[command(aliases(["e"]))]
    Email {
        #[command(subcommand)]
        command: EmailCommand,
    },
    /// Use the contact form of a running server
    #[command(aliases(["c"]))]
    Contact {
        #[command(subcommand)]
        command: ContactCommand,
    },
    /// Validate configuration
    CheckConfig {
        /// Print a debug representation of the config
        #[arg(short, long)]
        verbose: bool,
    },
    /// Generate shell completions
    Completion {
        /// The shell to generate completions for
        #[clap(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    #[cfg(tracing_pretty)]
    let fmt_layer = fmt_layer.pretty();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use folio_utils::assert_matches;

    use super::*;

    #[test]
    fn cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_commands() {
        let cli = Cli::try_parse_from(["folio", "check-config", "-v"]).unwrap();
        assert_matches!(cli.command, Command::CheckConfig { verbose: true });

        let cli = Cli::try_parse_from([
            "folio", "contact", "send", "--name", "Al", "--email", "a@b.com", "--message", "Hi",
        ])
        .unwrap();
        assert_matches!(
            cli.command,
            Command::Contact {
                command: ContactCommand::Send { .. }
            }
        );

        let cli = Cli::try_parse_from(["folio", "completion", "bash"]).unwrap();
        assert_matches!(cli.command, Command::Completion { shell: Shell::Bash });
    }

    #[test]
    fn check_unconfigured_email() {
        let config = folio_config::load_from(&[] as &[&str], &HashMap::new()).unwrap();

        check_config(&config, true);
        check_config(&config, false);
    }
}
