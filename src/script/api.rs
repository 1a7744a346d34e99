//! Request and response bodies of the Apps Script REST API calls this tool
//! makes, plus the fixed manifest every project is deployed with.

use serde::{Deserialize, Serialize};

pub const SOURCE_FILE_NAME: &str = "Code";
pub const MANIFEST_FILE_NAME: &str = "appsscript";
pub const MANIFEST_TIME_ZONE: &str = "Asia/Kolkata";
pub const INITIAL_VERSION_DESCRIPTION: &str = "Initial deploy";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub parent_id: String,
}

impl CreateProjectRequest {
    /// A project titled after the business and bound to its spreadsheet.
    pub fn order_backend(business_name: &str, sheet_id: &str) -> Self {
        CreateProjectRequest {
            title: format!("{business_name} Order Backend"),
            parent_id: sheet_id.to_owned(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub script_id: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    ServerJs,
    Json,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub source: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionLogging {
    Stackdriver,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub time_zone: String,
    pub exception_logging: ExceptionLogging,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            time_zone: MANIFEST_TIME_ZONE.to_owned(),
            exception_logging: ExceptionLogging::Stackdriver,
        }
    }
}

/// Full project content. Uploading it replaces every file already in the
/// project.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub files: Vec<ScriptFile>,
}

impl Content {
    pub fn with_manifest(code: String) -> serde_json::Result<Self> {
        Ok(Content {
            files: vec![
                ScriptFile {
                    name: SOURCE_FILE_NAME.to_owned(),
                    file_type: FileType::ServerJs,
                    source: code,
                },
                ScriptFile {
                    name: MANIFEST_FILE_NAME.to_owned(),
                    file_type: FileType::Json,
                    source: serde_json::to_string(&Manifest::default())?,
                },
            ],
        })
    }

    pub fn manifest(&self) -> Option<&ScriptFile> {
        self.files
            .iter()
            .find(|file| file.name == MANIFEST_FILE_NAME && file.file_type == FileType::Json)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateVersionRequest {
    pub description: String,
}

impl Default for CreateVersionRequest {
    fn default() -> Self {
        CreateVersionRequest {
            description: INITIAL_VERSION_DESCRIPTION.to_owned(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version_number: i32,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Access {
    Anyone,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecuteAs {
    UserDeploying,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebAppSettings {
    pub access: Access,
    pub execute_as: ExecuteAs,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSettings {
    pub web_app: WebAppSettings,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    pub version_number: i32,
    pub manifest_file_name: String,
    pub deployment_config: DeploymentSettings,
}

impl CreateDeploymentRequest {
    /// A web app open to anyone, running as the deploying account.
    pub fn public_web_app(version_number: i32) -> Self {
        CreateDeploymentRequest {
            version_number,
            manifest_file_name: MANIFEST_FILE_NAME.to_owned(),
            deployment_config: DeploymentSettings {
                web_app: WebAppSettings {
                    access: Access::Anyone,
                    execute_as: ExecuteAs::UserDeploying,
                },
            },
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct WebAppUrl {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigEcho {
    #[serde(default)]
    pub web_app: Option<WebAppUrl>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    #[serde(default)]
    pub entry_point_type: Option<String>,
    #[serde(default)]
    pub web_app: Option<WebAppUrl>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[serde(default)]
    pub deployment_id: Option<String>,
    #[serde(default)]
    pub deployment_config: Option<DeploymentConfigEcho>,
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
}

impl Deployment {
    /// The published URL, taken from the echoed deployment config first and
    /// from the first web app entry point otherwise.
    pub fn web_app_url(&self) -> Option<&str> {
        let from_config = self
            .deployment_config
            .as_ref()
            .and_then(|config| config.web_app.as_ref())
            .and_then(|web_app| web_app.url.as_deref());

        from_config.or_else(|| {
            self.entry_points
                .iter()
                .filter(|entry| {
                    entry
                        .entry_point_type
                        .as_deref()
                        .map_or(true, |kind| kind == "WEB_APP")
                })
                .find_map(|entry| entry.web_app.as_ref()?.url.as_deref())
        })
    }
}
