use error_stack::{report, Result, ResultExt};
use reqwest::Method;
use serde::{de::DeserializeOwned, de::IgnoredAny, Serialize};

use super::{
    api::{
        Content, CreateDeploymentRequest, CreateProjectRequest, CreateVersionRequest, Deployment,
        Project, Version,
    },
    auth::TokenSource,
    service::{ScriptApiError, ScriptService},
};

/// `ScriptService` over the Apps Script REST API.
pub struct ScriptClient {
    http: reqwest::Client,
    base_url: Box<str>,
    auth: Box<dyn TokenSource>,
}

impl ScriptClient {
    pub fn new(base_url: &str, auth: impl TokenSource + 'static) -> Self {
        ScriptClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').into(),
            auth: Box::new(auth),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<B, R>(&self, method: Method, path: &str, body: &B) -> Result<R, ScriptApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = self
            .auth
            .bearer_token()
            .await
            .change_context(ScriptApiError::Auth)?;

        let url = self.endpoint(path);
        log::trace!("{} {}", method, url);

        let response = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .change_context_lazy(|| ScriptApiError::Request(url.clone()))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(report!(ScriptApiError::Status {
                endpoint: url,
                status: status.as_u16(),
            })
            .attach_printable(details));
        }

        response
            .json::<R>()
            .await
            .change_context(ScriptApiError::Decode(url))
    }
}

#[async_trait::async_trait]
impl ScriptService for ScriptClient {
    async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> Result<Project, ScriptApiError> {
        self.send(Method::POST, "projects", request).await
    }

    async fn update_content(
        &self,
        script_id: &str,
        content: &Content,
    ) -> Result<(), ScriptApiError> {
        self.send::<_, IgnoredAny>(Method::PUT, &format!("projects/{script_id}/content"), content)
            .await
            .map(|_| ())
    }

    async fn create_version(
        &self,
        script_id: &str,
        request: &CreateVersionRequest,
    ) -> Result<Version, ScriptApiError> {
        self.send(
            Method::POST,
            &format!("projects/{script_id}/versions"),
            request,
        )
        .await
    }

    async fn create_deployment(
        &self,
        script_id: &str,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, ScriptApiError> {
        self.send(
            Method::POST,
            &format!("projects/{script_id}/deployments"),
            request,
        )
        .await
    }
}
