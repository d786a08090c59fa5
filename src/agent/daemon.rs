use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use crate::agent::config::Config;
use crate::agent::logger::MessageLogger;
use crate::agent::output_log::OutputLog;
use crate::comms::local_api::{self, AppState};

/// Run the logger until Ctrl+C or the connection ends.
pub async fn run(cfg: Config) -> Result<()> {
    run_until(cfg, async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Run the logger until `shutdown` resolves or the connection ends.
pub async fn run_until<F>(cfg: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let endpoint = cfg.validate()?;
    info!(endpoint = %endpoint, output = %cfg.output_path.display(), "message logger starting");

    let logger = Arc::new(
        MessageLogger::new(OutputLog::new(&cfg.output_path))
            .with_connect_timeout(cfg.connect_timeout()),
    );

    let status_handle = cfg.status_port.map(|port| {
        let state = Arc::new(AppState::new(Arc::new(cfg.clone()), logger.clone()));
        tokio::spawn(async move {
            if let Err(e) = local_api::serve(state, port).await {
                error!(port, error = %e, "status API stopped");
            }
        })
    });

    let mut ingest = {
        let logger = logger.clone();
        let endpoint = endpoint.to_string();
        tokio::spawn(async move { logger.start(&endpoint).await })
    };

    let finished = tokio::select! {
        joined = &mut ingest => Some(joined),
        _ = shutdown => None,
    };
    let outcome = match finished {
        Some(joined) => joined,
        None => {
            info!("shutdown signal received, closing connection");
            logger.stop();
            ingest.await
        }
    };

    if let Some(handle) = status_handle {
        handle.abort();
        let _ = handle.await; // Ignore cancellation errors
    }

    let stats = logger.stats();
    match outcome.context("receive task panicked")? {
        Ok(()) => {
            info!(
                state = %logger.state(),
                messages = stats.messages_appended,
                "message logger stopped"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                state = %logger.state(),
                messages = stats.messages_appended,
                error = %e,
                "message logger failed"
            );
            Err(e).context("message logger failed")
        }
    }
}
