use std::{fmt, path::PathBuf};

use error_stack::{report, Result, ResultExt};
use thiserror::Error;

use crate::{
    cli::progress::StageProgress,
    config::{app_config::AppConfig, business_config::BusinessConfig},
    script::{
        api::{Content, CreateDeploymentRequest, CreateProjectRequest, CreateVersionRequest},
        auth::ServiceAccountAuth,
        client::ScriptClient,
        service::ScriptService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    LoadConfig,
    LoadCredentials,
    CreateProject,
    ReadSource,
    UpdateContent,
    CreateVersion,
    CreateDeployment,
    SaveConfig,
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            DeployStep::LoadConfig => "load the business config",
            DeployStep::LoadCredentials => "load service account credentials",
            DeployStep::CreateProject => "create the script project",
            DeployStep::ReadSource => "read the script source",
            DeployStep::UpdateContent => "upload the project content",
            DeployStep::CreateVersion => "create a version",
            DeployStep::CreateDeployment => "create the web app deployment",
            DeployStep::SaveConfig => "save the web app URL",
        };
        f.write_str(step)
    }
}

#[derive(Debug, Error)]
#[error("deployment failed: could not {step}")]
pub struct DeployError {
    pub step: DeployStep,
}

impl DeployError {
    pub fn at(step: DeployStep) -> Self {
        DeployError { step }
    }
}

/// Outcome of a successful run. `config` already carries the new URL but
/// has not been written yet.
#[derive(Debug, Clone)]
pub struct Deployed {
    pub business_name: String,
    pub script_id: String,
    pub version_number: i32,
    pub web_app_url: String,
    pub config: BusinessConfig,
}

impl Deployed {
    pub fn save(&self, settings: &AppConfig) -> Result<(), DeployError> {
        self.config
            .write(&settings.files.business_config)
            .change_context(DeployError::at(DeployStep::SaveConfig))
    }

    pub fn confirmation(&self) -> String {
        format!(
            "Deployed Apps Script for {}. Web App URL: {}",
            self.business_name, self.web_app_url
        )
    }
}

/// Remote calls made per run, one progress stage each.
const REMOTE_STAGES: u64 = 4;

/// Creates a project bound to the business sheet, uploads the source with
/// the fixed manifest, cuts a version and publishes it as a web app.
///
/// Every run creates a new project. A failure past project creation leaves
/// that project behind.
pub struct DeployRoutine<S> {
    service: S,
    source_path: PathBuf,
}

impl<S: ScriptService> DeployRoutine<S> {
    pub fn new(service: S, source_path: impl Into<PathBuf>) -> Self {
        DeployRoutine {
            service,
            source_path: source_path.into(),
        }
    }

    pub async fn run(
        &self,
        business_name: &str,
        config: BusinessConfig,
    ) -> Result<Deployed, DeployError> {
        let progress = StageProgress::new(REMOTE_STAGES);

        let result = self.publish(&progress, business_name, config).await;
        if result.is_err() {
            log::debug!("Stopped during stage {} of {REMOTE_STAGES}", progress.position());
        }

        progress.finish();
        result
    }

    async fn publish(
        &self,
        progress: &StageProgress,
        business_name: &str,
        config: BusinessConfig,
    ) -> Result<Deployed, DeployError> {
        progress.stage(format!("☁️  Creating script project for {business_name}"));
        let project = self
            .service
            .create_project(&CreateProjectRequest::order_backend(
                business_name,
                config.sheet_id(),
            ))
            .await
            .change_context(DeployError::at(DeployStep::CreateProject))?;
        let script_id = project.script_id;
        log::info!("Created script project {script_id}");

        progress.detail(format!("📋 Reading {}", self.source_path.display()));
        let code = tokio::fs::read_to_string(&self.source_path)
            .await
            .change_context(DeployError::at(DeployStep::ReadSource))
            .attach_printable_lazy(|| format!("source file: {}", self.source_path.display()))?;

        let content = Content::with_manifest(code)
            .change_context(DeployError::at(DeployStep::UpdateContent))?;
        if let Some(manifest) = content.manifest() {
            log::debug!("Manifest: {}", manifest.source);
        }

        progress.stage(format!("📝 Uploading {} file(s)", content.files.len()));
        self.service
            .update_content(&script_id, &content)
            .await
            .change_context(DeployError::at(DeployStep::UpdateContent))?;

        progress.stage("🏷️  Creating version");
        let version = self
            .service
            .create_version(&script_id, &CreateVersionRequest::default())
            .await
            .change_context(DeployError::at(DeployStep::CreateVersion))?;
        log::info!("Created version {}", version.version_number);

        progress.stage(format!(
            "🚀 Deploying version {} as a web app",
            version.version_number
        ));
        let deployment = self
            .service
            .create_deployment(
                &script_id,
                &CreateDeploymentRequest::public_web_app(version.version_number),
            )
            .await
            .change_context(DeployError::at(DeployStep::CreateDeployment))?;

        let web_app_url = deployment
            .web_app_url()
            .map(str::to_owned)
            .ok_or_else(|| {
                report!(DeployError::at(DeployStep::CreateDeployment))
                    .attach_printable("deployment response carried no web app URL")
            })?;

        if let Some(deployment_id) = &deployment.deployment_id {
            log::debug!("Deployment id {deployment_id}");
        }
        log::info!("✅ Web app published at {web_app_url}");

        Ok(Deployed {
            business_name: business_name.to_owned(),
            script_id,
            version_number: version.version_number,
            config: config.with_web_app_url(web_app_url.clone()),
            web_app_url,
        })
    }
}

/// Runs the whole deployment against the live API and writes the URL back.
pub async fn deploy(settings: &AppConfig, business_name: &str) -> Result<Deployed, DeployError> {
    let config = BusinessConfig::load(&settings.files.business_config)
        .change_context(DeployError::at(DeployStep::LoadConfig))?;
    log::debug!("Deploying against sheet {}", config.sheet_id());
    if let Some(previous) = config.web_app_url() {
        log::info!("Replacing previous web app URL {previous}");
    }

    let auth = ServiceAccountAuth::from_key_file(&settings.files.service_account)
        .await
        .change_context(DeployError::at(DeployStep::LoadCredentials))?;
    let client = ScriptClient::new(&settings.script.base_url, auth);

    let deployed = DeployRoutine::new(client, &settings.files.source)
        .run(business_name, config)
        .await?;

    deployed.save(settings)?;
    Ok(deployed)
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::Path,
        sync::{
            atomic::{AtomicU32, Ordering},
            Mutex,
        },
    };

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        config::app_config::{FilesConfig, ScriptApiConfig},
        script::{
            api::{Deployment, DeploymentConfigEcho, Project, Version, WebAppUrl},
            service::ScriptApiError,
        },
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateProject { title: String, parent_id: String },
        UpdateContent { script_id: String, content: Value },
        CreateVersion { script_id: String, description: String },
        CreateDeployment { script_id: String, version_number: i32 },
    }

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<Call>>,
        projects: AtomicU32,
        fail_at: Option<DeployStep>,
        omit_url: bool,
    }

    impl RecordingService {
        fn failing_at(step: DeployStep) -> Self {
            RecordingService {
                fail_at: Some(step),
                ..Default::default()
            }
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn check(&self, step: DeployStep) -> Result<(), ScriptApiError> {
            if self.fail_at == Some(step) {
                return Err(report!(ScriptApiError::Status {
                    endpoint: step.to_string(),
                    status: 500,
                }));
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ScriptService for RecordingService {
        async fn create_project(
            &self,
            request: &CreateProjectRequest,
        ) -> Result<Project, ScriptApiError> {
            self.record(Call::CreateProject {
                title: request.title.clone(),
                parent_id: request.parent_id.clone(),
            });
            self.check(DeployStep::CreateProject)?;
            let n = self.projects.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Project {
                script_id: format!("script-{n}"),
            })
        }

        async fn update_content(
            &self,
            script_id: &str,
            content: &Content,
        ) -> Result<(), ScriptApiError> {
            self.record(Call::UpdateContent {
                script_id: script_id.to_owned(),
                content: serde_json::to_value(content).unwrap(),
            });
            self.check(DeployStep::UpdateContent)
        }

        async fn create_version(
            &self,
            script_id: &str,
            request: &CreateVersionRequest,
        ) -> Result<Version, ScriptApiError> {
            self.record(Call::CreateVersion {
                script_id: script_id.to_owned(),
                description: request.description.clone(),
            });
            self.check(DeployStep::CreateVersion)?;
            Ok(Version { version_number: 7 })
        }

        async fn create_deployment(
            &self,
            script_id: &str,
            request: &CreateDeploymentRequest,
        ) -> Result<Deployment, ScriptApiError> {
            self.record(Call::CreateDeployment {
                script_id: script_id.to_owned(),
                version_number: request.version_number,
            });
            self.check(DeployStep::CreateDeployment)?;

            let url = (!self.omit_url)
                .then(|| format!("https://script.google.com/macros/s/{script_id}/exec"));
            Ok(Deployment {
                deployment_id: Some(format!("deployment-of-{script_id}")),
                deployment_config: Some(DeploymentConfigEcho {
                    web_app: Some(WebAppUrl { url }),
                }),
                entry_points: Vec::new(),
            })
        }
    }

    struct Workspace {
        dir: tempfile::TempDir,
        settings: AppConfig,
    }

    impl Workspace {
        fn new(config: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("config.json"), config).unwrap();
            fs::write(dir.path().join("Code.gs"), "function doPost(e) {}").unwrap();

            let settings = AppConfig {
                files: FilesConfig {
                    business_config: dir.path().join("config.json"),
                    service_account: dir.path().join("service_account.json"),
                    source: dir.path().join("Code.gs"),
                },
                script: ScriptApiConfig {
                    base_url: "http://127.0.0.1:9".into(),
                },
            };

            Workspace { dir, settings }
        }

        fn path(&self, name: &str) -> std::path::PathBuf {
            self.dir.path().join(name)
        }

        fn business_config(&self) -> BusinessConfig {
            BusinessConfig::load(&self.settings.files.business_config).unwrap()
        }

        fn routine(&self, service: RecordingService) -> DeployRoutine<RecordingService> {
            DeployRoutine::new(service, &self.settings.files.source)
        }

        fn config_json(&self) -> Value {
            read_json(&self.settings.files.business_config)
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn calls_run_in_order_and_chain_identifiers() {
        let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);
        let routine = workspace.routine(RecordingService::default());

        let deployed = routine
            .run("Chai Point", workspace.business_config())
            .await
            .unwrap();

        let calls = routine.service.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[0],
            Call::CreateProject {
                title: "Chai Point Order Backend".to_owned(),
                parent_id: "sheet-42".to_owned(),
            }
        );
        assert!(matches!(
            &calls[1],
            Call::UpdateContent { script_id, .. } if script_id == "script-1"
        ));
        assert_eq!(
            calls[2],
            Call::CreateVersion {
                script_id: "script-1".to_owned(),
                description: "Initial deploy".to_owned(),
            }
        );
        assert_eq!(
            calls[3],
            Call::CreateDeployment {
                script_id: "script-1".to_owned(),
                version_number: 7,
            }
        );

        assert_eq!(deployed.script_id, "script-1");
        assert_eq!(deployed.version_number, 7);
        assert_eq!(
            deployed.web_app_url,
            "https://script.google.com/macros/s/script-1/exec"
        );
    }

    #[tokio::test]
    async fn uploads_source_and_fixed_manifest() {
        let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);
        let routine = workspace.routine(RecordingService::default());

        routine
            .run("Chai Point", workspace.business_config())
            .await
            .unwrap();

        let Call::UpdateContent { content, .. } = &routine.service.calls()[1] else {
            panic!("second call should upload content");
        };
        assert_eq!(
            content,
            &json!({"files": [
                {"name": "Code", "type": "SERVER_JS", "source": "function doPost(e) {}"},
                {
                    "name": "appsscript",
                    "type": "JSON",
                    "source": "{\"timeZone\":\"Asia/Kolkata\",\"exceptionLogging\":\"STACKDRIVER\"}"
                }
            ]})
        );
    }

    #[tokio::test]
    async fn manifest_does_not_depend_on_business_name() {
        let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);
        let mut manifests = Vec::new();

        for name in ["Acme", "Chai Point", ""] {
            let routine = workspace.routine(RecordingService::default());
            routine.run(name, workspace.business_config()).await.unwrap();

            let Call::UpdateContent { content, .. } = &routine.service.calls()[1] else {
                panic!("second call should upload content");
            };
            manifests.push(content["files"][1].clone());
        }

        assert!(manifests.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn saved_config_keeps_keys_and_adds_url() {
        let workspace = Workspace::new(
            r#"{"business": "Chai Point", "sheet_id": "sheet-42", "currency": "INR"}"#,
        );
        let routine = workspace.routine(RecordingService::default());

        let deployed = routine
            .run("Chai Point", workspace.business_config())
            .await
            .unwrap();
        deployed.save(&workspace.settings).unwrap();

        assert_eq!(
            workspace.config_json(),
            json!({
                "business": "Chai Point",
                "sheet_id": "sheet-42",
                "currency": "INR",
                "web_app_url": "https://script.google.com/macros/s/script-1/exec",
            })
        );
        assert_eq!(
            deployed.confirmation(),
            "Deployed Apps Script for Chai Point. Web App URL: \
             https://script.google.com/macros/s/script-1/exec"
        );
    }

    #[tokio::test]
    async fn running_twice_creates_two_projects() {
        let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);
        let routine = workspace.routine(RecordingService::default());

        let first = routine
            .run("Acme", workspace.business_config())
            .await
            .unwrap();
        let second = routine
            .run("Acme", workspace.business_config())
            .await
            .unwrap();

        assert_ne!(first.script_id, second.script_id);
        assert_ne!(first.web_app_url, second.web_app_url);
        assert_eq!(routine.service.calls().len(), 8);
    }

    #[tokio::test]
    async fn failing_step_is_named_and_later_calls_are_skipped() {
        let cases = [
            (DeployStep::CreateProject, 1),
            (DeployStep::UpdateContent, 2),
            (DeployStep::CreateVersion, 3),
            (DeployStep::CreateDeployment, 4),
        ];

        for (step, expected_calls) in cases {
            let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);
            let routine = workspace.routine(RecordingService::failing_at(step));

            let report = routine
                .run("Acme", workspace.business_config())
                .await
                .unwrap_err();

            assert_eq!(report.current_context().step, step);
            assert_eq!(routine.service.calls().len(), expected_calls);
            assert_eq!(workspace.config_json(), json!({"sheet_id": "sheet-42"}));
        }
    }

    #[tokio::test]
    async fn missing_source_fails_after_project_creation() {
        let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);
        fs::remove_file(workspace.path("Code.gs")).unwrap();
        let routine = workspace.routine(RecordingService::default());

        let report = routine
            .run("Acme", workspace.business_config())
            .await
            .unwrap_err();

        assert_eq!(report.current_context().step, DeployStep::ReadSource);
        assert_eq!(routine.service.calls().len(), 1);
    }

    #[tokio::test]
    async fn deployment_without_url_is_an_error() {
        let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);
        let routine = workspace.routine(RecordingService {
            omit_url: true,
            ..Default::default()
        });

        let report = routine
            .run("Acme", workspace.business_config())
            .await
            .unwrap_err();

        assert_eq!(report.current_context().step, DeployStep::CreateDeployment);
    }

    #[tokio::test]
    async fn config_without_sheet_id_stops_before_remote_calls() {
        let workspace = Workspace::new(r#"{"business": "Acme"}"#);

        let report = deploy(&workspace.settings, "Acme").await.unwrap_err();

        assert_eq!(report.current_context().step, DeployStep::LoadConfig);
        assert_eq!(workspace.config_json(), json!({"business": "Acme"}));
    }

    #[tokio::test]
    async fn missing_credentials_stop_before_remote_calls() {
        let workspace = Workspace::new(r#"{"sheet_id": "sheet-42"}"#);

        let report = deploy(&workspace.settings, "Acme").await.unwrap_err();

        assert_eq!(report.current_context().step, DeployStep::LoadCredentials);
        assert_eq!(workspace.config_json(), json!({"sheet_id": "sheet-42"}));
    }
}
