//! Sender, recipient and SMTP settings, read from the environment once at startup.

use anyhow::{Context, Result};

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Upgrade a plain connection with STARTTLS.
    StartTls,
    /// TLS from the first byte (usually port 465).
    Wrapper,
    /// No TLS. Only meant for local test servers.
    Plain,
}

impl SmtpSecurity {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starttls" | "" => Ok(Self::StartTls),
            "tls" | "wrapper" => Ok(Self::Wrapper),
            "none" | "plain" => Ok(Self::Plain),
            other => Err(anyhow::anyhow!("Unknown SMTP_TLS mode '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: SmtpSecurity,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("security", &self.security)
            .finish()
    }
}

impl SmtpConfig {
    /// # Required Environment Variables
    /// - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`
    ///
    /// # Optional Environment Variables
    /// - `SMTP_PORT` (default: 587)
    /// - `SMTP_TLS`: `starttls` (default), `tls` or `none`
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST environment variable not set")?;
        let username =
            std::env::var("SMTP_USERNAME").context("SMTP_USERNAME environment variable not set")?;
        let password =
            std::env::var("SMTP_PASSWORD").context("SMTP_PASSWORD environment variable not set")?;

        let port = match std::env::var("SMTP_PORT") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("SMTP_PORT '{}' is not a valid port", value))?,
            Err(_) => DEFAULT_SMTP_PORT,
        };

        let security = match std::env::var("SMTP_TLS") {
            Ok(value) => SmtpSecurity::parse(&value)?,
            Err(_) => SmtpSecurity::StartTls,
        };

        Ok(Self {
            host,
            port,
            username,
            password,
            security,
        })
    }
}

/// Who the newsletter comes from and who receives it.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub newsletter_name: String,
    pub source_email: String,
    pub recipients: Vec<String>,
}

impl DispatchConfig {
    pub fn new(
        newsletter_name: impl Into<String>,
        source_email: impl Into<String>,
        recipients: Vec<String>,
    ) -> Result<Self> {
        if recipients.is_empty() {
            return Err(anyhow::anyhow!("Recipient list is empty"));
        }
        Ok(Self {
            newsletter_name: newsletter_name.into(),
            source_email: source_email.into(),
            recipients,
        })
    }

    /// # Required Environment Variables
    /// - `SOURCE_EMAIL`: sender address
    /// - `SUBSCRIBERS`: comma-separated recipient addresses
    pub fn from_env(newsletter_name: &str) -> Result<Self> {
        let source_email =
            std::env::var("SOURCE_EMAIL").context("SOURCE_EMAIL environment variable not set")?;
        let subscribers =
            std::env::var("SUBSCRIBERS").context("SUBSCRIBERS environment variable not set")?;

        Self::new(newsletter_name, source_email, parse_recipients(&subscribers))
    }
}

/// Split a comma-separated subscriber list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}
