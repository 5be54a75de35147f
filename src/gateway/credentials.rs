//! Gateway proxy credentials.
//!
//! Clients authenticate to the gateway with `username_vport:api_key`,
//! usually sent as `Proxy-Authorization: Basic base64(...)`. The virtual
//! port selects which of the user's allocations to route through.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Errors while parsing gateway credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Invalid auth header format")]
    InvalidHeader,

    #[error("Failed to decode auth: {0}")]
    Decode(String),

    #[error("Invalid credentials format")]
    MissingSeparator,

    #[error("Invalid username format: missing underscore")]
    MissingPort,

    #[error("Username is empty")]
    EmptyUsername,

    #[error("Invalid vport number: {0}")]
    InvalidPort(String),
}

/// Parsed gateway credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCredentials {
    pub username: String,
    pub api_key: String,
    pub vport: u16,
}

impl GatewayCredentials {
    /// Parse the decoded `username_vport:api_key` form.
    ///
    /// The port is taken after the *last* underscore, so usernames may
    /// contain underscores themselves.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let (user_part, api_key) = raw.split_once(':').ok_or(CredentialError::MissingSeparator)?;
        let (username, vport) = user_part.rsplit_once('_').ok_or(CredentialError::MissingPort)?;
        let vport: u16 = vport
            .parse()
            .map_err(|_| CredentialError::InvalidPort(vport.to_string()))?;
        if username.is_empty() {
            return Err(CredentialError::EmptyUsername);
        }

        Ok(Self {
            username: username.to_string(),
            api_key: api_key.to_string(),
            vport,
        })
    }

    /// Parse a `Proxy-Authorization: Basic ...` header value.
    pub fn from_basic_header(header: &str) -> Result<Self, CredentialError> {
        let encoded = header.strip_prefix("Basic ").ok_or(CredentialError::InvalidHeader)?;
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialError::Decode(e.to_string()))?;
        let raw = String::from_utf8(decoded).map_err(|e| CredentialError::Decode(e.to_string()))?;
        Self::parse(&raw)
    }

    /// Encode as a Basic header value.
    pub fn to_basic_header(&self) -> String {
        let raw = format!("{}_{}:{}", self.username, self.vport, self.api_key);
        format!("Basic {}", STANDARD.encode(raw))
    }
}
