//! Access tokens for the remote store.
//!
//! Acquiring and refreshing tokens (the OAuth consent flow, token files) is
//! outside this crate; a [`Credentials`] implementation only hands out the
//! bearer token to use.

use crate::config::SheetConfig;
use crate::store::TransportError;
use async_trait::async_trait;
use std::env;

#[async_trait]
pub trait Credentials: Send + Sync {
    /// Returns a bearer token valid for the spreadsheet scope.
    async fn access_token(&self) -> Result<String, TransportError>;
}

/// A token fixed at construction time.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_owned(),
        }
    }

    /// Reads the token from an environment variable.
    pub fn from_env(variable: &str) -> Result<Self, TransportError> {
        env::var(variable)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(|token| Self::new(token.trim()))
            .ok_or_else(|| {
                TransportError::CredentialsError(format!("environment variable '{}' is not set", variable))
            })
    }

    /// Uses `access_token` from the configuration, falling back to the
    /// environment variable named by `token_env`.
    pub fn from_config(config: &SheetConfig) -> Result<Self, TransportError> {
        match config.access_token.as_deref().filter(|token| !token.is_empty()) {
            Some(token) => Ok(Self::new(token)),
            None => Self::from_env(&config.token_env),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl Credentials for StaticToken {
    async fn access_token(&self) -> Result<String, TransportError> {
        Ok(self.token.to_owned())
    }
}
