use std::{collections::HashMap, net::IpAddr, num::NonZeroU32, path::Path};

use anyhow::Context;
use config::{File, FileFormat};
use folio_models::email_address::EmailAddressWithName;
use serde::{Deserialize, Deserializer};
use url::Url;

pub use duration::{Duration, ParseDurationError};

mod duration;

/// The default configuration, compiled into the binary.
pub const DEFAULT_CONFIG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../config.toml"));

/// Colon separated list of additional config files, applied in order.
pub const CONFIG_PATHS_ENV: &str = "FOLIO_CONFIG";

/// Environment variables which override single config keys.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SENDGRID_API_KEY", "email.api_key"),
    ("SENDGRID_API_URL", "email.endpoint_override"),
    ("MAIL_FROM", "email.from"),
    ("MAIL_TO", "email.to"),
    ("ALLOWED_ORIGINS", "http.allowed_origins"),
    ("RATE_LIMIT_MAX", "rate_limit.max_requests"),
    ("HOST", "http.host"),
    ("PORT", "http.port"),
    ("APP_ENV", "http.mode"),
];

/// Loads the config from the default config, the files listed in
/// [`CONFIG_PATHS_ENV`] and the process environment.
pub fn load() -> anyhow::Result<Config> {
    let paths = std::env::var(CONFIG_PATHS_ENV).unwrap_or_default();
    let paths = paths
        .split(':')
        .filter(|path| !path.is_empty())
        .collect::<Vec<_>>();
    let env = std::env::vars().collect();
    load_from(&paths, &env)
}

pub fn load_from(
    paths: &[impl AsRef<Path>],
    env: &HashMap<String, String>,
) -> anyhow::Result<Config> {
    let builder = config::Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

    let builder = paths.iter().try_fold(builder, |builder, path| {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let source = File::from_str(&content, FileFormat::Toml);
        anyhow::Ok(builder.add_source(source))
    })?;

    let builder = ENV_OVERRIDES
        .iter()
        .try_fold(builder, |builder, &(var, key)| {
            let value = env
                .get(var)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty());
            builder
                .set_override_option(key, value)
                .with_context(|| format!("Failed to apply {var}"))
        })?;

    builder
        .build()?
        .try_deserialize()
        .context("Failed to load config")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub email: EmailConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
    pub mode: Mode,
    #[serde(deserialize_with = "comma_separated")]
    pub allowed_origins: Vec<String>,
    pub real_ip: Option<RealIpConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealIpConfig {
    pub header: String,
    pub set_from: IpAddr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub from: Option<EmailAddressWithName>,
    pub to: Option<EmailAddressWithName>,
    pub endpoint_override: Option<Url>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: NonZeroU32,
    pub window: Duration,
}

impl EmailConfig {
    /// The address contact messages are delivered to. Defaults to the sender.
    pub fn recipient(&self) -> Option<&EmailAddressWithName> {
        self.to.as_ref().or(self.from.as_ref())
    }

    /// Names the settings that are required for sending emails but missing.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            self.api_key.is_none().then_some("email.api_key"),
            self.from.is_none().then_some("email.from"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mode = String::deserialize(deserializer)?;
        Ok(if mode.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        })
    }
}

fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        String(String),
    }

    let items = match ListOrString::deserialize(deserializer)? {
        ListOrString::List(items) => items,
        ListOrString::String(s) => s.split(',').map(Into::into).collect(),
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect())
}
