//! The contact form action: rate limit, validate, deliver.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, Span};
use uuid::Uuid;

use super::form::ContactForm;
use super::mailer::{EmailMessage, Mailer};
use crate::ratelimit::{
    derive_identifier, BackoffRateLimiter, Clock, HeaderLookup, SystemClock,
};

const SENT_MESSAGE: &str = "Your message has been sent successfully!";
const DELIVERY_FAILED_MESSAGE: &str = "Failed to send your message. Please try again later.";

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Sent,
    RateLimited,
    Invalid,
    DeliveryFailed,
}

/// Result of a contact submission, as reported back to the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub success: bool,
    pub message: String,
    pub rate_limited: bool,
    #[serde(rename = "waitTime")]
    pub wait_time_ms: u64,
    #[serde(skip)]
    pub kind: OutcomeKind,
}

impl SubmissionOutcome {
    fn sent() -> Self {
        Self {
            success: true,
            message: SENT_MESSAGE.to_string(),
            rate_limited: false,
            wait_time_ms: 0,
            kind: OutcomeKind::Sent,
        }
    }

    fn failed(kind: OutcomeKind, message: String) -> Self {
        Self {
            success: false,
            message,
            rate_limited: false,
            wait_time_ms: 0,
            kind,
        }
    }

    fn rate_limited(message: String, wait_time_ms: u64) -> Self {
        Self {
            success: false,
            message,
            rate_limited: true,
            wait_time_ms,
            kind: OutcomeKind::RateLimited,
        }
    }
}

/// Handles contact form submissions.
pub struct ContactService<C: Clock = SystemClock> {
    limiter: Arc<BackoffRateLimiter<C>>,
    mailer: Arc<dyn Mailer>,
    from: String,
    to: String,
}

impl<C: Clock> ContactService<C> {
    /// Create a service that sends submissions from `from` to `to`.
    pub fn new(
        limiter: Arc<BackoffRateLimiter<C>>,
        mailer: Arc<dyn Mailer>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            limiter,
            mailer,
            from: from.into(),
            to: to.into(),
        }
    }

    /// The rate limiter guarding submissions.
    pub fn limiter(&self) -> &Arc<BackoffRateLimiter<C>> {
        &self.limiter
    }

    /// Process one submission.
    ///
    /// The rate limit is checked before validation, so rejected forms still
    /// count as attempts. Delivery failures are logged and reported to the
    /// visitor only generically.
    #[instrument(
        skip(self, headers, form),
        fields(identifier = tracing::field::Empty, reference = tracing::field::Empty)
    )]
    pub async fn submit<H: HeaderLookup + ?Sized>(
        &self,
        headers: &H,
        form: ContactForm,
    ) -> SubmissionOutcome {
        let identifier = derive_identifier(headers);
        Span::current().record("identifier", identifier.as_str());
        debug!("Derived client identifier");

        let decision = self.limiter.check_rate_limit(&identifier);
        if !decision.allowed {
            info!(wait_time_ms = decision.wait_time_ms(), "Contact submission rate limited");
            return SubmissionOutcome::rate_limited(
                decision.message.clone(),
                decision.wait_time_ms(),
            );
        }

        if let Err(errors) = form.validate() {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            debug!(errors = ?details, "Contact submission failed validation");
            return SubmissionOutcome::failed(
                OutcomeKind::Invalid,
                format!("Validation error: {}", details.join(", ")),
            );
        }

        let reference = Uuid::new_v4();
        Span::current().record("reference", tracing::field::display(reference));

        let email = EmailMessage::contact_submission(
            &form,
            &identifier,
            &self.from,
            &self.to,
            Utc::now(),
            reference,
        );

        match self.mailer.send(&email).await {
            Ok(()) => {
                info!("Contact submission delivered");
                SubmissionOutcome::sent()
            }
            Err(e) => {
                error!(error = %e, "Error sending contact email");
                SubmissionOutcome::failed(
                    OutcomeKind::DeliveryFailed,
                    DELIVERY_FAILED_MESSAGE.to_string(),
                )
            }
        }
    }
}
