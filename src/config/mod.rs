pub mod app_config;
pub mod business_config;
