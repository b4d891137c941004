//! Contact form fields and validation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use validator::Validate;

/// Address shape accepted by the site's form: dot-separated local part
/// without leading, trailing or doubled dots, and a domain whose TLD has at
/// least two letters.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?i)(?:[a-z0-9_'+\-]+\.)*[a-z0-9_'+\-]*[a-z0-9_+\-]",
        r"@(?:[a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$",
    ))
    .expect("email pattern is valid")
});

/// Fields in the order errors are reported.
const FIELD_ORDER: [&str; 4] = ["name", "email", "company", "phone"];

/// A contact form submission as posted by the browser.
///
/// Missing fields deserialize as empty strings so that validation, not
/// extraction, reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContactForm {
    #[serde(default)]
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(
        email(message = "Please enter a valid email address"),
        regex(path = *EMAIL_PATTERN, message = "Please enter a valid email address")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company: String,
    #[serde(default)]
    #[validate(length(min = 5, message = "Please enter a valid phone number"))]
    pub phone: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field the error applies to
    pub field: &'static str,
    /// Human readable explanation
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ContactForm {
    /// Check every field, reporting one error per failing field in field order.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let Err(errors) = Validate::validate(self) else {
            return Ok(());
        };

        let by_field = errors.field_errors();
        let failures = FIELD_ORDER
            .iter()
            .filter_map(|&field| {
                let first = by_field.get(field)?.first()?;
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                Some(FieldError { field, message })
            })
            .collect();

        Err(failures)
    }

    /// The free-text message, if the visitor wrote one.
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ContactForm {
        ContactForm {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            company: "Analytical Engines".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            message: None,
        }
    }

    fn with_email(email: &str) -> ContactForm {
        ContactForm {
            email: email.to_string(),
            ..valid_form()
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_all_errors_collected_in_order() {
        let errors = ContactForm::default().validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();

        assert_eq!(fields, vec!["name", "email", "company", "phone"]);
    }

    #[test]
    fn test_one_error_per_field() {
        let errors = with_email("not an email").validate().unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "email: Please enter a valid email address");
    }

    #[test]
    fn test_short_name_rejected() {
        let form = ContactForm {
            name: "A".to_string(),
            ..valid_form()
        };

        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "name: Name must be at least 2 characters");
    }

    #[test]
    fn test_short_phone_rejected() {
        let form = ContactForm {
            phone: "1234".to_string(),
            ..valid_form()
        };

        let errors = form.validate().unwrap_err();
        assert_eq!(errors[0].to_string(), "phone: Please enter a valid phone number");
    }

    #[test]
    fn test_accepted_email_addresses() {
        let accepted = [
            "a@b.co",
            "first.last+tag@sub.example.org",
            "o'neil@example.ie",
            "x_y-z@my-host.io",
        ];

        for email in accepted {
            assert!(with_email(email).validate().is_ok(), "{} should be accepted", email);
        }
    }

    #[test]
    fn test_malformed_email_addresses_rejected() {
        let malformed = [
            "",
            "no-at-sign.example.com",
            "@example.com",
            "user@localhost",
            "user@example..com",
            "user@@example.com",
            "user name@example.com",
            "a..b@example.com",
            ".a@example.com",
            "a.@example.com",
            "a@example.c",
            "a<b>@example.com",
            "a@-x.com",
        ];

        for email in malformed {
            let errors = with_email(email).validate().unwrap_err();
            assert_eq!(errors.len(), 1, "{} should be rejected", email);
            assert_eq!(errors[0].field, "email");
        }
    }

    #[test]
    fn test_blank_message_treated_as_absent() {
        let mut form = valid_form();
        assert_eq!(form.message_text(), None);

        form.message = Some("   ".to_string());
        assert_eq!(form.message_text(), None);

        form.message = Some("Call me".to_string());
        assert_eq!(form.message_text(), Some("Call me"));
    }
}
