//! Outgoing mail for contact submissions.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use html_escape::encode_text;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::form::ContactForm;
use crate::config::{MailConfig, MailProvider};
use crate::error::{ContactGateError, Result};

/// An email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    #[serde(rename = "text")]
    pub text_body: String,
    #[serde(rename = "html")]
    pub html_body: String,
}

impl EmailMessage {
    /// Build the notification for a validated contact submission.
    pub fn contact_submission(
        form: &ContactForm,
        client_ip: &str,
        from: &str,
        to: &str,
        submitted_at: DateTime<Utc>,
        reference: Uuid,
    ) -> Self {
        let timestamp = submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let message = form.message_text().unwrap_or("No message provided");

        let text_body = format!(
            "Name: {}\nEmail: {}\nCompany: {}\nPhone: {}\nMessage: {}\n\n\
             Submitted from IP: {}\nTimestamp: {}\nReference: {}\n",
            form.name,
            form.email,
            form.company,
            form.phone,
            message,
            client_ip,
            timestamp,
            reference,
        );

        let html_body = format!(
            "<h2>New Contact Form Submission</h2>\n\
             <p><strong>Name:</strong> {}</p>\n\
             <p><strong>Email:</strong> {}</p>\n\
             <p><strong>Company:</strong> {}</p>\n\
             <p><strong>Phone:</strong> {}</p>\n\
             <p><strong>Message:</strong> {}</p>\n\
             <hr>\n\
             <p><small>Submitted from IP: {}</small></p>\n\
             <p><small>Timestamp: {}</small></p>\n\
             <p><small>Reference: {}</small></p>\n",
            encode_text(&form.name),
            encode_text(&form.email),
            encode_text(&form.company),
            encode_text(&form.phone),
            encode_text(message),
            encode_text(client_ip),
            timestamp,
            reference,
        );

        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: format!("New Contact Form Submission from {}", form.name),
            text_body,
            html_body,
        }
    }
}

/// Delivery capability for outgoing mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Mailer that writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.text_body,
            "Contact email (log delivery)"
        );
        Ok(())
    }
}

/// Mailer that POSTs messages as JSON to an HTTP mail API.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMailer {
    /// Create a mailer for `endpoint`, authenticating with `api_key` if given.
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ContactGateError::Mail(format!(
                "mail API responded with {}",
                status
            )));
        }

        debug!(endpoint = %self.endpoint, status = %status, "Contact email delivered");
        Ok(())
    }
}

/// Mailer that relays messages over SMTP with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl SmtpMailer {
    /// Create a mailer for the relay at `host:port`.
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ContactGateError::Mail(format!("invalid SMTP relay {}: {}", host, e)))?
            .port(port)
            .timeout(Some(timeout));

        if let Some(credentials) = credentials {
            builder = builder.credentials(credentials);
        }

        Ok(Self {
            transport: builder.build(),
            relay: format!("{}:{}", host, port),
        })
    }

    /// Convert an outgoing message into a multipart text/HTML email.
    pub fn build_message(message: &EmailMessage) -> Result<Message> {
        let from = parse_mailbox(&message.from)?;
        let to = parse_mailbox(&message.to)?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| ContactGateError::Mail(format!("failed to build email: {}", e)))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| ContactGateError::Mail(format!("invalid address {:?}: {}", address, e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Self::build_message(message)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| ContactGateError::Mail(format!("SMTP delivery failed: {}", e)))?;

        debug!(relay = %self.relay, code = %response.code(), "Contact email delivered");
        Ok(())
    }
}

/// SMTP interface host of Amazon SES in `region`.
pub fn ses_smtp_host(region: &str) -> String {
    format!("email-smtp.{}.amazonaws.com", region)
}

/// Build the mailer selected by configuration.
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.provider {
        MailProvider::Log => Ok(Arc::new(LogMailer)),
        MailProvider::Http => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                ContactGateError::Config("mail.endpoint is required for http delivery".to_string())
            })?;
            let mailer = HttpMailer::new(
                endpoint,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(mailer))
        }
        MailProvider::Smtp => {
            let host = config.smtp_host.as_deref().ok_or_else(|| {
                ContactGateError::Config("mail.smtp_host is required for smtp delivery".to_string())
            })?;
            let mailer = SmtpMailer::new(
                host,
                config.smtp_port,
                smtp_credentials(config),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(mailer))
        }
        MailProvider::Ses => {
            let credentials = smtp_credentials(config).ok_or_else(|| {
                ContactGateError::Config(
                    "mail.smtp_username and mail.smtp_password are required for ses delivery"
                        .to_string(),
                )
            })?;
            let mailer = SmtpMailer::new(
                &ses_smtp_host(&config.region),
                config.smtp_port,
                Some(credentials),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(mailer))
        }
    }
}

fn smtp_credentials(config: &MailConfig) -> Option<Credentials> {
    match (&config.smtp_username, &config.smtp_password) {
        (Some(username), Some(password)) => {
            Some(Credentials::new(username.clone(), password.clone()))
        }
        _ => None,
    }
}
