use axum::async_trait;
use serde_json::json;
use tracing::info;

use crate::config::MailConfig;

/// Mail delivery abstraction. The auth flows only depend on
/// `send(to, subject, html) -> Result`; transport is a deployment detail.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// Sends through a JSON mail API (`POST {api_url}` with a bearer token).
pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_token: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_token: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_token,
            from,
        }
    }

    pub fn from_config(cfg: &MailConfig) -> Option<Self> {
        cfg.api_url.as_ref().map(|url| {
            Self::new(url.clone(), cfg.api_token.clone(), cfg.from.clone())
        })
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html_body,
            }))
            .send()
            .await?;

        if !res.status().is_success() {
            anyhow::bail!("mail api returned {}", res.status());
        }
        Ok(())
    }
}

/// Local dev sender that logs the message instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, "mail send stub");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        mailer
            .send("ada@x.com", "Verification code", "<h1>123456</h1>")
            .await
            .expect("log mailer never fails");
    }

    #[test]
    fn http_mailer_requires_configured_url() {
        let cfg = MailConfig {
            api_url: None,
            api_token: String::new(),
            from: "noreply@example.com".into(),
        };
        assert!(HttpMailer::from_config(&cfg).is_none());
    }
}
