//! Contact form handling: validation, mail delivery and the submission action.

mod form;
mod mailer;
mod service;

pub use form::{ContactForm, FieldError};
pub use mailer::{
    build_mailer, ses_smtp_host, EmailMessage, HttpMailer, LogMailer, Mailer, SmtpMailer,
};
pub use service::{ContactService, OutcomeKind, SubmissionOutcome};
