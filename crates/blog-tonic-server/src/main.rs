#![doc = include_str!("../README.md")]

mod server;

use blog_tonic_core::proto::{FILE_DESCRIPTOR_SET, blog_service_server::BlogServiceServer};
use clap::Parser;
use futures::Stream;
use server::config::{CliArgs, ServerConfig, StoreKind};
use server::service::handler::BloggerService;
use server::store::{BlogStore, memory::MemoryBlogStore, mongo::MongoBlogStore};
use server::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(config.log_format)?;

    let store = open_store(&config).await?;
    let service = BloggerService::new(store, config.stream_buffer_size);

    let res = serve(&config, service.clone()).await;

    // Only now that the server has stopped accepting and every in-flight call
    // has drained is it safe to close the store.
    service.store().shutdown().await;

    #[cfg(feature = "tracing")]
    tracing::info!("End of program");
    providers.shutdown();
    res
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn BlogStore>> {
    let store: Arc<dyn BlogStore> = match config.store {
        StoreKind::Mongo => Arc::new(MongoBlogStore::connect(config).await?),
        StoreKind::Memory => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Using the in-memory store; blogs are lost on exit");
            Arc::new(MemoryBlogStore::new())
        }
    };
    Ok(store)
}

async fn serve(config: &ServerConfig, service: BloggerService) -> anyhow::Result<()> {
    if config.uds {
        #[cfg(unix)]
        {
            use tokio_stream::wrappers::UnixListenerStream;
            let uds_path = config.server_addr.clone();
            let uds = bind_uds(&uds_path)?;
            let incoming = UnixListenerStream::new(uds);
            log_startup_info(&uds_path, config);
            let res = run_server_with_incoming(incoming, config, service).await;
            let _ = std::fs::remove_file(&uds_path);
            res
        }
        #[cfg(not(unix))]
        {
            let _ = service;
            anyhow::bail!("Unix domain sockets are not supported on this platform");
        }
    } else {
        let tcp_path = config.server_addr.clone();
        let tcp = TcpListener::bind(&tcp_path).await?;
        let incoming = TcpListenerStream::new(tcp);
        log_startup_info(&tcp_path, config);
        run_server_with_incoming(incoming, config, service).await
    }
}

/// Binds a Unix socket at `path`, first removing a socket file left behind by
/// a process that did not exit cleanly. Any other kind of file at `path` is
/// left alone and the bind fails.
#[cfg(unix)]
pub(crate) fn bind_uds(path: &str) -> std::io::Result<tokio::net::UnixListener> {
    use std::os::unix::fs::FileTypeExt;

    if let Ok(meta) = std::fs::symlink_metadata(path) {
        if meta.file_type().is_socket() {
            #[cfg(feature = "tracing")]
            tracing::warn!("Removing stale socket file {}", path);
            std::fs::remove_file(path)?;
        }
    }
    tokio::net::UnixListener::bind(path)
}

async fn run_server_with_incoming<I, IO, IE>(
    incoming: I,
    config: &ServerConfig,
    service: BloggerService,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<BlogServiceServer<BloggerService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let mut builder = Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true));
    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_blog_service(service.clone()))
        .serve_with_incoming_shutdown(
            incoming,
            shutdown_signal(service, health_reporter, config.shutdown_grace),
        )
        .await?;

    #[cfg(feature = "tracing")]
    tracing::info!("Server stopped; in-flight calls drained");
    Ok(())
}

fn log_startup_info(_addr: &str, _config: &ServerConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting blog service on {} with full config: {:#?}",
            _addr,
            _config
        );
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting blog service on {} with the {:?} store",
            _addr,
            _config.store
        );
    }
}

pub(crate) fn build_blog_service(service: BloggerService) -> BlogServiceServer<BloggerService> {
    BlogServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

/// Resolves on Ctrl+C or SIGTERM, which makes the server stop accepting and
/// start draining. Open `ListBlog` streams get `shutdown_grace` to finish
/// before they are cut off.
async fn shutdown_signal(
    service: BloggerService,
    health_reporter: HealthReporter,
    shutdown_grace: core::time::Duration,
) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    health_reporter
        .set_not_serving::<BlogServiceServer<BloggerService>>()
        .await;

    // 2. Bound how long open streams may delay the drain
    tokio::spawn(async move {
        tokio::time::sleep(shutdown_grace).await;
        #[cfg(feature = "tracing")]
        tracing::warn!("Shutdown grace period elapsed, cancelling open streams");
        service.cancel_streams();
    });
}
