//! `satcat-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use anyhow::Result;

use satcat_api::config::Config;
use satcat_api::server::Server;
use satcat_core::observability::{LogFormat, init_logging};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));

    let server = Server::open(config)?;
    server.serve().await?;
    Ok(())
}
