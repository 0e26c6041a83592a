mod config_cmd;
mod dump;
mod link;
mod log;

use clap::ValueEnum;

pub use config_cmd::ConfigCommand;
pub use dump::{ExportCommand, ImportCommand};
pub use link::LinkCommand;
pub use log::LogCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
