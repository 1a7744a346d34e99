use error_stack::Result;
use thiserror::Error;

use super::api::{
    Content, CreateDeploymentRequest, CreateProjectRequest, CreateVersionRequest, Deployment,
    Project, Version,
};

#[derive(Debug, Error)]
pub enum ScriptApiError {
    #[error("could not authenticate against the Apps Script API")]
    Auth,
    #[error("request to {0} could not be sent")]
    Request(String),
    #[error("{endpoint} answered {status}")]
    Status { endpoint: String, status: u16 },
    #[error("response from {0} could not be decoded")]
    Decode(String),
}

/// The four Apps Script operations a deployment needs.
#[async_trait::async_trait]
pub trait ScriptService: Send + Sync {
    async fn create_project(&self, request: &CreateProjectRequest)
        -> Result<Project, ScriptApiError>;

    /// Replaces the whole content of `script_id`.
    async fn update_content(&self, script_id: &str, content: &Content)
        -> Result<(), ScriptApiError>;

    async fn create_version(
        &self,
        script_id: &str,
        request: &CreateVersionRequest,
    ) -> Result<Version, ScriptApiError>;

    async fn create_deployment(
        &self,
        script_id: &str,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, ScriptApiError>;
}
