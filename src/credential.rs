use std::{env, fmt};

use crate::Error;

const REDACTED: &str = "[REDACTED]";

/// An opaque API token.
///
/// A `Credential` is never empty, never printed by `Debug` and has no
/// `Display` implementation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Validates and wraps a token.
    ///
    /// Fails with [`Error::ConfigurationError`] if the token is empty,
    /// whitespace only or contains control characters.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let token = token.into();

        if token.trim().is_empty() {
            return Err(Error::ConfigurationError("Missing api token".into()));
        }

        if token.chars().any(char::is_control) {
            return Err(Error::ConfigurationError(
                "The api token contains control characters".into(),
            ));
        }

        Ok(Self(token))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    /// Removes every occurrence of the token from `text`.
    pub(crate) fn redact(&self, text: &str) -> String {
        text.replace(&self.0, REDACTED)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&REDACTED).finish()
    }
}

/// Supplies the credential a [`Client`](crate::Client) is built with.
pub trait CredentialProvider {
    fn credential(&self) -> Result<Credential, Error>;
}

impl CredentialProvider for Credential {
    fn credential(&self) -> Result<Credential, Error> {
        Ok(self.clone())
    }
}

/// Reads the token from one environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(crate::INFERENCE_API_KEY)
    }
}

impl CredentialProvider for EnvCredential {
    fn credential(&self) -> Result<Credential, Error> {
        let token = env::var(&self.var).map_err(|e| {
            Error::ConfigurationError(format!("Cannot read {}: {}", self.var, e))
        })?;

        Credential::new(token)
    }
}
