//! `autofix serve`: HTTP trigger proxy and log stream.

use anyhow::Result;
use autofix::config::AutofixConfig;
use autofix::server::{ServeOptions, start_server};

pub async fn cmd_serve(config: &AutofixConfig, port: Option<u16>, dev: bool) -> Result<()> {
    start_server(
        config,
        ServeOptions {
            port: port.unwrap_or(config.server.port),
            dev_mode: dev,
        },
    )
    .await
}
