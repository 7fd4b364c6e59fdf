pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use hive_config::{EmailProvider, EmailSettings};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound notification transport. Delivery happens outside any storage
/// transaction, so callers compensate on failure.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()>;
}

pub fn build_mailer(settings: &EmailSettings) -> Arc<dyn Mailer> {
    match settings.provider {
        EmailProvider::Log => Arc::new(LogMailer),
        EmailProvider::Http => Arc::new(HttpMailer::new(settings)),
    }
}

/// Writes mail to the log. Development default.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email (log transport)");
        debug!(body = %email.body, "Email body");
        Ok(())
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Delivers through a Resend-style JSON API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(settings: &EmailSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            from: settings.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()> {
        let mut request = self.client.post(&self.api_url).json(&SendRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            text: &email.body,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await?.error_for_status()?;
        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}
