use std::sync::Arc;

use folio_api_rest::{RateLimitConfig, RealIpConfig, RestServerConfig};
use folio_config::{Config, Mode};
use folio_core_contact_impl::{ContactFeatureConfig, ContactFeatureServiceImpl};
use folio_email_impl::EmailServiceConfig;
use types::{Email, RestServer};

pub mod types;

/// Provides the services of the application.
#[derive(Debug)]
pub struct Provider {
    config: ConfigProvider,
    /// `None` if email delivery is not configured.
    email: Option<Email>,
}

impl Provider {
    pub fn new(config: ConfigProvider, email: Option<Email>) -> Self {
        Self { config, email }
    }

    pub fn rest_server(&self) -> RestServer {
        let contact = ContactFeatureServiceImpl::new(
            self.email.clone(),
            self.config.contact_feature_config.clone(),
        );
        RestServer::new(contact, self.config.rest_server_config.clone())
    }
}

/// Service configs derived from the application [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigProvider {
    // API
    pub rest_server_config: RestServerConfig,

    // Email
    /// `None` if the api key or the sender address is missing.
    pub email_service_config: Option<EmailServiceConfig>,

    // Core
    pub contact_feature_config: ContactFeatureConfig,
}

impl ConfigProvider {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        // API
        let rest_server_config = RestServerConfig {
            allowed_origins: config.http.allowed_origins.clone(),
            request_logging: config.http.mode == Mode::Development,
            rate_limit: RateLimitConfig {
                max_requests: config.rate_limit.max_requests,
                window: config.rate_limit.window.into(),
            },
            real_ip: config.http.real_ip.as_ref().map(|real_ip| RealIpConfig {
                header: real_ip.header.clone(),
                set_from: real_ip.set_from,
            }),
        };

        // Email
        let email_service_config = match (&config.email.api_key, &config.email.from) {
            (Some(api_key), Some(from)) => Some(EmailServiceConfig::new(
                api_key.clone(),
                from.clone(),
                config.email.endpoint_override.clone(),
                config.email.timeout.into(),
            )?),
            _ => None,
        };

        // Core
        let contact_feature_config = ContactFeatureConfig {
            recipient: config.email.recipient().cloned().map(Arc::new),
        };

        Ok(Self {
            rest_server_config,
            email_service_config,
            contact_feature_config,
        })
    }
}
