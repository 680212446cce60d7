use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use parking_lot::Mutex;
use rama::{
    error::BoxError,
    graceful::{self, ShutdownGuard},
    net::socket::Interface,
    telemetry::tracing::{self, Instrument as _},
};

use crate::{server, utils};

/// CLI arguments for configuring the stutter server.
#[derive(Debug, Clone, Parser)]
#[command(name = "stutter")]
#[command(bin_name = "stutter")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// network interface to bind the http server to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:7778"
    )]
    pub bind: Interface,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// directory in which the bound socket address is written (as `stutter.addr.txt`)
    #[arg(long, short = 'D')]
    pub data: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 1.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

/// Runs the stutter http server and blocks until
/// a critical error occurs or the (graceful) shutdown has been initiated.
///
/// Used by the binary as well as by the e2e test suite.
pub async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let (error_tx, error_rx) = tokio::sync::mpsc::channel::<BoxError>(1);
    let fatal_error = Arc::new(Mutex::new(None));
    let graceful = graceful::Shutdown::new(new_shutdown_signal(
        error_rx,
        fatal_error.clone(),
        base_shutdown_signal,
    ));

    graceful.spawn_task_fn(move |guard| run_http_server(args, guard, error_tx));

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::info!("gracefully shutdown with a delay of: {delay:?}");

    let fatal_error = fatal_error.lock().take();
    match fatal_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn run_http_server(
    args: Args,
    guard: ShutdownGuard,
    error_tx: tokio::sync::mpsc::Sender<BoxError>,
) {
    tracing::info!("spawning stutter http server...");
    if let Err(err) = server::run_server(args, guard)
        .instrument(tracing::debug_span!(
            "http server lifetime",
            server.service.name = utils::env::project_name(),
            otel.kind = "server",
            network.protocol.name = "http",
        ))
        .await
    {
        tracing::error!("http server exited with an error: {err}");
        let _ = error_tx.send(err).await;
    }
}

fn new_shutdown_signal(
    error_rx: tokio::sync::mpsc::Receiver<BoxError>,
    fatal_error: Arc<Mutex<Option<BoxError>>>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        let mut mut_error_rx = error_rx;
        let mut signal = Box::pin(base_shutdown_signal);

        tokio::select! {
            _ = signal.as_mut() => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            err = mut_error_rx.recv() => {
                if let Some(err) = err {
                    tracing::error!("fatal err received: {err}; abort");
                    *fatal_error.lock() = Some(err);
                } else {
                    tracing::info!("wait for default signal, no error was received");
                    signal.await;
                    tracing::debug!("default signal triggered: init graceful shutdown");
                }
            }
        }
    }
}
