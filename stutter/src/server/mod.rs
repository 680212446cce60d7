use std::{convert::Infallible, path::Path, sync::Arc};

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    http::{
        Body, HeaderValue, Request, Response,
        layer::{
            map_response_body::MapResponseBodyLayer,
            required_header::AddRequiredResponseHeadersLayer,
            trace::{DefaultOnFailure, TraceLayer},
        },
        server::HttpServer,
    },
    net::address::SocketAddress,
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing::{self, Level},
};

use crate::{
    cli::Args,
    session::{MemorySessionRegistry, SessionRegistry},
    utils::env::server_identifier,
};

mod simulator;
mod transport;

pub use simulator::{SimulatorHttpService, USAGE};
pub use transport::{TrackFlushService, TrackedStream};

/// Name used for the address file written into the data directory.
pub const ADDR_FILE_NAME: &str = "stutter";

/// Serve the simulator until the guard signals shutdown.
pub async fn run_server(args: Args, guard: ShutdownGuard) -> Result<(), BoxError> {
    let http_svc = new_http_service(MemorySessionRegistry::new());

    let exec = Executor::graceful(guard);
    let http_server = HttpServer::auto(exec.clone()).service(Arc::new(http_svc));

    let tcp_listener = TcpListener::bind(args.bind, exec)
        .await
        .context("bind stutter http server")?;

    let server_addr = tcp_listener
        .local_addr()
        .context("get bound address for stutter http server")?;

    tracing::info!("stutter listening on: http://{server_addr}");
    if let Some(data) = args.data.as_deref() {
        tokio::fs::create_dir_all(data)
            .await
            .context("create data directory")
            .with_context_debug_field("path", || data.to_owned())?;
        write_server_socket_address_as_file(data, ADDR_FILE_NAME, server_addr.into()).await?;
    }

    tcp_listener
        .serve(TrackFlushService::new(http_server))
        .await;

    Ok(())
}

/// The simulator with its http middleware.
///
/// Simulated failures (5xx statuses, severed bodies) are
/// classified as failures by the trace layer, they are logged at DEBUG.
pub fn new_http_service<R: SessionRegistry>(
    sessions: R,
) -> impl Service<Request, Output = Response, Error = Infallible> {
    (
        MapResponseBodyLayer::new(Body::new),
        TraceLayer::new_for_http().on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(server_identifier())),
    )
        .into_layer(SimulatorHttpService::new(sessions))
}

async fn write_server_socket_address_as_file(
    dir: &Path,
    name: &str,
    addr: SocketAddress,
) -> Result<(), BoxError> {
    let path = dir.join(format!("{name}.addr.txt"));
    tokio::fs::write(&path, addr.to_string())
        .await
        .context("write server's socket address to file")
        .context_field("address", addr)
        .with_context_debug_field("path", || path.to_owned())
}
