use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use wgagent_core::{Config, WireFormat};
use wgagent_daemon::Daemon;

pub fn run(
    mut config: Config,
    listen: Option<String>,
    format: Option<WireFormat>,
    dry_run: bool,
) -> Result<()> {
    if let Some(listen) = listen {
        config.server.listen_addr = listen;
    }
    if let Some(format) = format {
        config.server.wire_format = format;
    }
    if dry_run {
        config.executor.dry_run = true;
    }

    tracing::info!(
        "wgagent {} starting (executor: {})",
        env!("CARGO_PKG_VERSION"),
        if config.executor.dry_run {
            "dry run".to_string()
        } else {
            config.executor.vtysh_path.display().to_string()
        }
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let server = Daemon::from_config(&config)
            .bind()
            .await
            .context("Failed to start listener")?;

        let shutdown = CancellationToken::new();
        tokio::spawn(wait_for_signal(shutdown.clone()));

        server.run(shutdown).await?;
        tracing::info!("wgagent stopped");
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(unix)]
async fn wait_for_signal(shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut quit) = match (signal(SignalKind::terminate()), signal(SignalKind::quit())) {
        (Ok(term), Ok(quit)) => (term, quit),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Failed to install signal handlers: {}", e);
            return;
        }
    };

    let name = tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    tracing::info!("Received {}, shutting down", name);
    shutdown.cancel();
}

#[cfg(not(unix))]
async fn wait_for_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    tracing::info!("Received Ctrl-C, shutting down");
    shutdown.cancel();
}
