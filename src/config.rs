//! Configuration management for Contactgate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{ContactGateError, Result};
use crate::ratelimit::BackoffPolicy;

/// Prefix for environment variable overrides, e.g. `CONTACTGATE__MAIL__TO`.
const ENV_PREFIX: &str = "CONTACTGATE";

/// Main configuration for the Contactgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactGateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Mail delivery configuration
    #[serde(default)]
    pub mail: MailConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// How often stale rate limit entries are swept, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl ServerConfig {
    /// Interval between cleanup sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_cleanup_interval() -> u64 {
    3600
}

/// Rate limiting configuration.
///
/// Defaults give three free attempts, then cooldowns of 5, 10, 20, 40 and
/// 80 minutes, never longer than a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Free attempts before backoff begins
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Unit of backoff in milliseconds
    #[serde(default = "default_base_window_ms")]
    pub base_window_ms: u64,

    /// Successive multiples of the base window
    #[serde(default = "default_backoff_multipliers")]
    pub backoff_multipliers: Vec<u32>,

    /// Ceiling on any computed wait time, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_window_ms: default_base_window_ms(),
            backoff_multipliers: default_backoff_multipliers(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RateLimitingConfig {
    /// Build the backoff policy described by this configuration.
    pub fn policy(&self) -> Result<BackoffPolicy> {
        let policy = BackoffPolicy {
            max_attempts: self.max_attempts,
            base_window: Duration::from_millis(self.base_window_ms),
            backoff_multipliers: self.backoff_multipliers.clone(),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        };
        policy.validate()?;
        Ok(policy)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_window_ms() -> u64 {
    5 * 60 * 1000
}

fn default_backoff_multipliers() -> Vec<u32> {
    vec![1, 2, 4, 8, 16]
}

fn default_max_backoff_ms() -> u64 {
    24 * 60 * 60 * 1000
}

/// Which mail transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    /// Write messages to the log instead of delivering them
    #[default]
    Log,
    /// POST messages as JSON to an HTTP mail API
    Http,
    /// Relay messages through an SMTP server
    Smtp,
    /// Relay messages through the Amazon SES SMTP interface for `region`
    Ses,
}

/// Mail delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Transport used for outgoing mail
    #[serde(default)]
    pub provider: MailProvider,

    /// Sender address
    #[serde(default = "default_mail_from")]
    pub from: String,

    /// Recipient address for contact submissions
    #[serde(default = "default_mail_to")]
    pub to: String,

    /// Endpoint of the HTTP mail API
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token for the HTTP mail API
    #[serde(default)]
    pub api_key: Option<String>,

    /// AWS region of the SES SMTP interface
    #[serde(default = "default_mail_region")]
    pub region: String,

    /// SMTP relay host
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP relay port (STARTTLS)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP user name; for SES, the SMTP credential user name
    #[serde(default)]
    pub smtp_username: Option<String>,

    /// SMTP password
    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Delivery timeout in seconds
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::default(),
            from: default_mail_from(),
            to: default_mail_to(),
            endpoint: None,
            api_key: None,
            region: default_mail_region(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            timeout_secs: default_mail_timeout(),
        }
    }
}

fn default_mail_from() -> String {
    "noreply@mawaad.co".to_string()
}

fn default_mail_to() -> String {
    "contact@mawaad.co".to_string()
}

fn default_mail_region() -> String {
    "us-east-1".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_timeout() -> u64 {
    10
}

impl ContactGateConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration file");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ContactGateError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Load configuration from an optional YAML file, then apply
    /// `CONTACTGATE__<SECTION>__<KEY>` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("rate_limiting.backoff_multipliers"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.policy()?;

        if self.server.cleanup_interval_secs == 0 {
            return Err(ContactGateError::Config(
                "server.cleanup_interval_secs must be greater than zero".to_string(),
            ));
        }

        self.mail.validate()
    }
}

impl MailConfig {
    /// Check that the selected provider has the settings it needs.
    pub fn validate(&self) -> Result<()> {
        let missing = match self.provider {
            MailProvider::Log => None,
            MailProvider::Http if self.endpoint.is_none() => Some("mail.endpoint"),
            MailProvider::Http => None,
            MailProvider::Smtp if self.smtp_host.is_none() => Some("mail.smtp_host"),
            MailProvider::Smtp => None,
            MailProvider::Ses if self.region.trim().is_empty() => Some("mail.region"),
            MailProvider::Ses if self.smtp_username.is_none() || self.smtp_password.is_none() => {
                Some("mail.smtp_username and mail.smtp_password")
            }
            MailProvider::Ses => None,
        };

        if let Some(setting) = missing {
            return Err(ContactGateError::Config(format!(
                "{} is required when mail.provider is {:?}",
                setting, self.provider
            )));
        }

        if self.from.trim().is_empty() || self.to.trim().is_empty() {
            return Err(ContactGateError::Config(
                "mail.from and mail.to must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(prefix: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("{}-{}.yaml", prefix, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_defaults() {
        let config = ContactGateConfig::default();

        assert_eq!(config.server.http_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.server.cleanup_interval(), Duration::from_secs(3600));
        assert_eq!(config.rate_limiting.max_attempts, 3);
        assert_eq!(config.rate_limiting.base_window_ms, 300_000);
        assert_eq!(config.rate_limiting.backoff_multipliers, vec![1, 2, 4, 8, 16]);
        assert_eq!(config.rate_limiting.max_backoff_ms, 86_400_000);
        assert_eq!(config.mail.provider, MailProvider::Log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
server:
  http_addr: "0.0.0.0:8080"
rate_limiting:
  max_attempts: 5
mail:
  to: sales@example.com
"#;

        let config = ContactGateConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.http_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.server.cleanup_interval_secs, 3600);
        assert_eq!(config.rate_limiting.max_attempts, 5);
        assert_eq!(config.rate_limiting.base_window_ms, 300_000);
        assert_eq!(config.mail.to, "sales@example.com");
        assert_eq!(config.mail.from, "noreply@mawaad.co");
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = ContactGateConfig::from_yaml("server: [not, a, map]");
        assert!(matches!(result, Err(ContactGateError::Config(_))));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RateLimitingConfig::default().policy().unwrap();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_window, Duration::from_secs(300));
        assert_eq!(policy.max_backoff, Duration::from_secs(86_400));
    }

    #[test]
    fn test_http_provider_requires_endpoint() {
        let yaml = r#"
mail:
  provider: http
"#;
        let config = ContactGateConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
mail:
  provider: http
  endpoint: https://mail.example.com/send
"#;
        let config = ContactGateConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_smtp_provider_requires_host() {
        let config = ContactGateConfig::from_yaml("mail:\n  provider: smtp\n").unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
mail:
  provider: smtp
  smtp_host: smtp.example.com
  smtp_port: 2525
"#;
        let config = ContactGateConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.mail.smtp_port, 2525);
    }

    #[test]
    fn test_ses_provider_settings() {
        let yaml = r#"
mail:
  provider: ses
  region: eu-west-1
"#;
        let config = ContactGateConfig::from_yaml(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ContactGateError::Config(_))));

        let yaml = r#"
mail:
  provider: ses
  region: eu-west-1
  from: noreply@example.com
  to: contact@example.com
  smtp_username: AKIAEXAMPLE
  smtp_password: secret
"#;
        let config = ContactGateConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.mail.provider, MailProvider::Ses);
        assert_eq!(config.mail.region, "eu-west-1");
        assert_eq!(config.mail.smtp_port, 587);

        let config = MailConfig {
            region: " ".to_string(),
            ..config.mail
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let yaml = r#"
rate_limiting:
  backoff_multipliers: []
"#;
        let config = ContactGateConfig::from_yaml(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ContactGateError::Config(_))));
    }

    #[test]
    fn test_zero_cleanup_interval_rejected() {
        let yaml = "server:\n  cleanup_interval_secs: 0\n";
        let config = ContactGateConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = temp_config_path("contactgate");
        std::fs::write(
            &path,
            "server:\n  cleanup_interval_secs: 60\nrate_limiting:\n  max_attempts: 4\n",
        )
        .unwrap();

        let config = ContactGateConfig::load(Some(path.as_path()));
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.server.cleanup_interval_secs, 60);
        assert_eq!(config.rate_limiting.max_attempts, 4);
        assert_eq!(config.rate_limiting.backoff_multipliers, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_from_file() {
        let path = temp_config_path("contactgate");
        std::fs::write(
            &path,
            "mail:\n  provider: http\n  endpoint: http://localhost:9000/send\n",
        )
        .unwrap();

        let config = ContactGateConfig::from_file(&path);
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.mail.provider, MailProvider::Http);
        assert_eq!(config.mail.endpoint.as_deref(), Some("http://localhost:9000/send"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = temp_config_path("contactgate-missing");
        assert!(ContactGateConfig::load(Some(path.as_path())).is_err());
    }
}
