pub mod args;
pub mod progress;
