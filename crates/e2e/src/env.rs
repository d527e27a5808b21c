//! Environment-supplied credentials and the test mailbox
//!
//! Both are read from the process environment each time they are asked for
//! and never stored in [`HarnessConfig`](crate::config::HarnessConfig).

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::config::ENV_PREFIX;
use crate::error::{E2eError, E2eResult};
use crate::wait::{Polled, Poller};

static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>)\]]+"#).expect("link regex"));

/// Login for one of the preprovisioned users
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Read `STUDIO_E2E_USER{slot}_EMAIL` and `..._PASSWORD`
    pub fn from_env(slot: u8) -> E2eResult<Self> {
        Self::from_lookup(slot, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(slot: u8, lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |suffix: &str| {
            let key = format!("{ENV_PREFIX}USER{slot}_{suffix}");
            lookup(&key)
                .filter(|v| !v.is_empty())
                .ok_or(E2eError::MissingEnv(key))
        };
        Ok(Self {
            email: read("EMAIL")?,
            password: read("PASSWORD")?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Message summary as listed by the mailbox
#[derive(Debug, Clone, Deserialize)]
pub struct MailMessage {
    pub id: u64,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub subject: String,
}

#[derive(Debug, Clone)]
pub struct ReceivedMail {
    pub message: MailMessage,
    pub body: String,
    pub links: Vec<String>,
}

/// Every http(s) link in `body`, in order
pub fn extract_links(body: &str) -> Vec<String> {
    LINK.find_iter(body)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
        .collect()
}

/// MailCatcher-style HTTP mailbox used by invitation and signup scenarios
pub struct Mailbox {
    client: reqwest::Client,
    base_url: String,
}

impl Mailbox {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Read `STUDIO_E2E_MAILBOX_URL`
    pub fn from_env() -> E2eResult<Self> {
        let key = format!("{ENV_PREFIX}MAILBOX_URL");
        let url = std::env::var(&key).map_err(|_| E2eError::MissingEnv(key))?;
        Self::new(&url)
    }

    pub async fn messages(&self) -> E2eResult<Vec<MailMessage>> {
        let url = format!("{}/messages", self.base_url);
        let messages = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(messages)
    }

    pub async fn body(&self, id: u64) -> E2eResult<String> {
        let url = format!("{}/messages/{}.plain", self.base_url, id);
        Ok(self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    /// Poll until a message to `to` whose subject contains `subject` arrives
    pub async fn wait_for_message(
        &self,
        to: &str,
        subject: &str,
        timeout: Duration,
    ) -> E2eResult<ReceivedMail> {
        let poller = Poller::new(timeout, Duration::from_millis(500));
        let outcome = poller
            .until(|| async {
                let found = self.messages().await?.into_iter().find(|message| {
                    message.subject.contains(subject)
                        && message
                            .recipients
                            .iter()
                            .any(|r| r.trim_matches(['<', '>']).eq_ignore_ascii_case(to))
                });
                Ok(found)
            })
            .await?;

        match outcome {
            Polled::Ready(message) => {
                debug!("mail {} for {}: {}", message.id, to, message.subject);
                let body = self.body(message.id).await?;
                let links = extract_links(&body);
                Ok(ReceivedMail {
                    message,
                    body,
                    links,
                })
            }
            Polled::TimedOut { attempts, .. } => Err(E2eError::Timeout(format!(
                "no mail to {to} with subject containing \"{subject}\" after {attempts} checks"
            ))),
        }
    }
}
