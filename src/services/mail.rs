//! Outgoing mail
//!
//! The dispatcher talks to a [`MailTransport`]. Production uses SMTP through
//! lettre; the `log` backend only writes mail to the tracing output, which is
//! the default for development.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{MailBackend, MailConfig};

/// One e-mail ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub from: String,
    /// Recipients in the order given
    pub to: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid mail address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport failed: {0}")]
    Transport(String),
}

/// Sends one message. Failures are reported, never retried here.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|_| DeliveryError::InvalidAddress(address.to_string()))
}

/// Build a plain-text lettre message from `mail`
pub fn build_message(mail: &OutgoingMail) -> Result<Message, DeliveryError> {
    if mail.to.is_empty() {
        return Err(DeliveryError::Build("no recipients".to_string()));
    }

    let mut builder = Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    for to in &mail.to {
        builder = builder.to(parse_mailbox(to)?);
    }

    builder
        .body(mail.body.clone())
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

/// SMTP relay transport
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Port 465 uses implicit TLS, every other port STARTTLS.
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow!("SMTP host not configured"))?;

        let builder = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
        .port(config.smtp_port);

        let builder = match &config.smtp_username {
            Some(username) => builder.credentials(Credentials::new(
                username.clone(),
                config.smtp_password.clone().unwrap_or_default(),
            )),
            None => builder,
        };

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let message = build_message(mail)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Writes mail to the log instead of sending it
#[derive(Debug, Default)]
pub struct LogMailTransport;

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        // Same address checks as the SMTP path
        build_message(mail)?;
        tracing::info!(
            from = %mail.from,
            to = %mail.to.join(", "),
            subject = %mail.subject,
            "Mail (log backend)"
        );
        tracing::debug!(body = %mail.body, "Mail body");
        Ok(())
    }
}

/// Transport that keeps sent mail in memory, for tests
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("connection refused".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| DeliveryError::Transport("recorder poisoned".to_string()))?
            .push(mail.clone());
        Ok(())
    }
}

/// Transport selected by `mail.backend`
pub fn build_transport(config: &MailConfig) -> anyhow::Result<Arc<dyn MailTransport>> {
    match config.backend {
        MailBackend::Log => {
            tracing::info!("Mail backend: log");
            Ok(Arc::new(LogMailTransport))
        }
        MailBackend::Smtp => {
            let transport = SmtpMailTransport::from_config(config)?;
            tracing::info!(
                "Mail backend: smtp ({}:{})",
                config.smtp_host.as_deref().unwrap_or_default(),
                config.smtp_port
            );
            Ok(Arc::new(transport))
        }
    }
}
