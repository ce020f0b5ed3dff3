use anyhow::{Context, Result};
use wgagent_core::{Config, Request, WireFormat};
use wgagent_daemon::{Client, ClientError};

/// Returns whether the agent replied `OK`
pub fn run(
    config: &Config,
    subcommand: Option<String>,
    params: Vec<String>,
    addr: Option<String>,
    format: Option<WireFormat>,
    bye: bool,
) -> Result<bool> {
    let mut client_config = config.client.clone();
    if let Some(addr) = addr {
        client_config.addr = addr;
    }
    if let Some(format) = format {
        client_config.wire_format = format;
    }
    let client = Client::from_config(&client_config);

    let request = match subcommand {
        Some(name) if !bye => Request::hello(name, params),
        _ => Request::bye(),
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let outcome = runtime.block_on(client.expect_ok(&request));

    match outcome {
        Ok(()) => {
            println!("OK");
            Ok(true)
        }
        Err(ClientError::Rejected(reply)) => {
            println!("{}", reply);
            Ok(false)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(false)
        }
    }
}
