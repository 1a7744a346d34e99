mod cli;
mod config;
mod routines;
mod script;

use error_stack::ResultExt;

use crate::cli::args::Args;
use crate::config::app_config::AppConfig;
use crate::routines::deploy_routine::{self, DeployError, DeployStep};

#[tokio::main]
async fn main() -> error_stack::Result<(), DeployError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse_or_exit();
    if !args.extra.is_empty() {
        log::warn!("Ignoring extra arguments: {}", args.extra.join(" "));
    }

    let mut settings =
        AppConfig::load().change_context(DeployError::at(DeployStep::LoadConfig))?;
    args.apply_overrides(&mut settings);
    log::debug!("Settings: {:?}", settings);

    let deployed = deploy_routine::deploy(&settings, &args.business_name).await?;
    log::info!(
        "Project {} serves version {} of {}",
        deployed.script_id,
        deployed.version_number,
        settings.files.source.display()
    );

    println!("{}", deployed.confirmation());
    Ok(())
}
