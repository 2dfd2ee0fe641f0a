//! CLI command implementations

pub mod error;
pub mod scrape;
pub mod serve;

pub use error::CliError;
pub use scrape::{Cli, Commands, OutputFormat, ScrapeArgs};
pub use serve::ServeArgs;
