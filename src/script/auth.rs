use std::path::Path;

use error_stack::{report, Result, ResultExt};
use thiserror::Error;
use yup_oauth2::{authenticator::DefaultAuthenticator, ServiceAccountAuthenticator};

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/script.projects",
    "https://www.googleapis.com/auth/script.deployments",
];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not read service account key at '{0}'")]
    ReadKey(String),
    #[error("could not create an authenticator")]
    Authenticator,
    #[error("could not obtain an access token")]
    Token,
}

/// Hands out bearer tokens for the Apps Script API.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<String, AuthError>;
}

/// Service account credentials scoped to managing and deploying script
/// projects.
pub struct ServiceAccountAuth {
    authenticator: DefaultAuthenticator,
}

impl ServiceAccountAuth {
    pub async fn from_key_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let secret = yup_oauth2::read_service_account_key(path)
            .await
            .change_context_lazy(|| AuthError::ReadKey(path.display().to_string()))?;

        log::debug!(
            "Loaded service account {} from '{}'",
            secret.client_email,
            path.display()
        );

        let authenticator = ServiceAccountAuthenticator::builder(secret)
            .build()
            .await
            .change_context(AuthError::Authenticator)?;

        Ok(ServiceAccountAuth { authenticator })
    }
}

#[async_trait::async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        let token = self
            .authenticator
            .token(&SCOPES)
            .await
            .change_context(AuthError::Token)?;

        token
            .token()
            .map(str::to_owned)
            .ok_or_else(|| report!(AuthError::Token).attach_printable("token response was empty"))
    }
}
