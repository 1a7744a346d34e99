use std::path::PathBuf;

use clap::{error::ErrorKind, CommandFactory, Parser};

use crate::config::app_config::AppConfig;

/// Publish a sheet-bound Apps Script order backend as a web app
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Business the backend is deployed for, used in the project title
    #[arg(allow_hyphen_values = true)]
    pub business_name: String,

    /// Business config file holding `sheet_id` [default: config.json]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Service account key file [default: service_account.json]
    #[arg(long, value_name = "PATH")]
    pub service_account: Option<PathBuf>,

    /// Server-side source uploaded as the project's code [default: Code.gs]
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Anything after the business name is accepted and ignored
    #[arg(hide = true)]
    pub extra: Vec<String>,
}

pub const USAGE_EXIT_CODE: i32 = 1;

impl Args {
    /// Parses the command line. A missing or malformed argument prints the
    /// usage line and exits with status 1; `--help` and `--version` exit as
    /// clap does.
    pub fn parse_or_exit() -> Self {
        match Args::try_parse() {
            Ok(args) => args,
            Err(error) => match error.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => error.exit(),
                _ => {
                    log::debug!("{}", error);
                    println!("{}", Args::command().render_usage());
                    std::process::exit(USAGE_EXIT_CODE);
                }
            },
        }
    }

    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(path) = &self.config {
            config.files.business_config = path.clone();
        }
        if let Some(path) = &self.service_account {
            config.files.service_account = path.clone();
        }
        if let Some(path) = &self.source {
            config.files.source = path.clone();
        }
    }
}
