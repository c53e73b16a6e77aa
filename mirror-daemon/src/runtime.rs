use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use mirror_core::MirrorConfig;
use mirror_sync::{EventSink, LogSink, SyncEngine};

use crate::error::{io_err, DaemonError};
use crate::scheduler::{Scheduler, SchedulerStats};

/// Validate `config`, install logging, and block the current thread until
/// ctrl-c stops the scheduler.
pub fn start_blocking(config: MirrorConfig) -> Result<SchedulerStats, DaemonError> {
    config.validate()?;
    init_tracing(config.log_file.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, Arc::new(LogSink)))
}

/// Run the scheduler until ctrl-c.
pub async fn run(
    config: MirrorConfig,
    sink: Arc<dyn EventSink>,
) -> Result<SchedulerStats, DaemonError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    run_until_shutdown(config, sink, shutdown_tx).await
}

/// Run the scheduler until ctrl-c or until something is sent on `shutdown_tx`.
pub async fn run_until_shutdown(
    config: MirrorConfig,
    sink: Arc<dyn EventSink>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<SchedulerStats, DaemonError> {
    let engine = Arc::new(SyncEngine::from_config(&config, sink.clone()));
    let scheduler = Scheduler::new(engine, config.interval(), sink.clone())?;

    sink.info(format!(
        "sync service started: {} -> {} every {} ms",
        config.source.display(),
        config.replica.display(),
        config.interval_ms
    ));

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let stats = scheduler.run(shutdown_rx).await;
            let _ = shutdown.send(());
            stats
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => {
                            let _ = shutdown.send(());
                            Err(DaemonError::Signal(err.to_string()))
                        }
                    }
                }
            }
        })
    };

    let (scheduler_result, signal_result) = tokio::join!(scheduler_handle, signal_handle);

    let stats = scheduler_result.map_err(|err| DaemonError::Join {
        task: "scheduler",
        reason: err.to_string(),
    })?;
    handle_join("signal_handler", signal_result)?;

    sink.info(format!("sync service stopped after {} passes", stats.passes));
    Ok(stats)
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            reason: err.to_string(),
        }),
    }
}

/// Install the global subscriber: console always, plus `log_file` when given.
///
/// `RUST_LOG` overrides the default `info` filter. Records emitted through
/// the `log` facade (the sync engine's [`LogSink`]) are bridged in. Calling
/// this twice is harmless; the second subscriber is ignored.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), DaemonError> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
                }
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| io_err(path, e))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();
    Ok(())
}
