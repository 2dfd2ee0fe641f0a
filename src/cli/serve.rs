//! Serve command implementation

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::shutdown::SharedShutdown;

use super::{Cli, CliError};

/// Serve command arguments
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Listen port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

impl ServeArgs {
    /// Execute the serve command.
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"));
        if !data_dir.is_dir() {
            return Err(CliError::ConfigurationError(format!(
                "Data directory does not exist: {}",
                data_dir.display()
            )));
        }

        let addr = SocketAddr::new(self.host, self.port);
        crate::serve::serve(data_dir, addr, shutdown).await?;
        Ok(())
    }
}
