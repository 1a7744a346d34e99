use std::{fs, io::BufReader, path::Path};

use error_stack::{report, Result, ResultExt};
use serde_json::{Map, Value};
use thiserror::Error;

/// The per-business record kept in `config.json`.
///
/// The whole object is kept in file order, so writing it back only adds or
/// updates `web_app_url` in place.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessConfig {
    sheet_id: String,
    record: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum BusinessConfigError {
    #[error("could not open '{0}'")]
    Open(String),
    #[error("'{0}' is not a JSON object with a string `sheet_id`")]
    Parse(String),
    #[error("could not write '{0}'")]
    Write(String),
}

const SHEET_ID: &str = "sheet_id";
const WEB_APP_URL: &str = "web_app_url";

impl BusinessConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BusinessConfigError> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .change_context_lazy(|| BusinessConfigError::Open(path.display().to_string()))?;

        let record: Map<String, Value> = serde_json::from_reader(BufReader::new(file))
            .change_context_lazy(|| BusinessConfigError::Parse(path.display().to_string()))?;

        Self::from_record(record).ok_or_else(|| {
            report!(BusinessConfigError::Parse(path.display().to_string()))
                .attach_printable(format!("missing string `{SHEET_ID}`"))
        })
    }

    fn from_record(record: Map<String, Value>) -> Option<Self> {
        let sheet_id = record.get(SHEET_ID).and_then(Value::as_str)?.to_owned();
        Some(BusinessConfig { sheet_id, record })
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    pub fn web_app_url(&self) -> Option<&str> {
        self.record.get(WEB_APP_URL).and_then(Value::as_str)
    }

    pub fn with_web_app_url(mut self, url: impl Into<String>) -> Self {
        self.record.insert(WEB_APP_URL.to_owned(), Value::String(url.into()));
        self
    }

    /// Overwrites `path` with the whole record, pretty-printed.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), BusinessConfigError> {
        let path = path.as_ref();
        let file = fs::File::create(path)
            .change_context_lazy(|| BusinessConfigError::Write(path.display().to_string()))?;

        serde_json::to_writer_pretty(file, &self.record)
            .change_context_lazy(|| BusinessConfigError::Write(path.display().to_string()))
    }
}
