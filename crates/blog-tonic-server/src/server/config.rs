use anyhow::bail;
use blog_tonic_core::types::{DEFAULT_COLLECTION, DEFAULT_DATABASE};
use clap::{Parser, ValueEnum};
use core::time::Duration;

/// Which storage backend serves the blog collection.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// A MongoDB deployment reached through `MONGODB_URI`.
    Mongo,
    /// A process-local map. Data is lost on exit.
    Memory,
}

/// Console log formatter.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-friendly output with source locations.
    Pretty,
    /// One line per event.
    Compact,
    /// Newline-delimited JSON for log shippers.
    Json,
}

/// Runtime configuration for the `blog-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for a local MongoDB.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "blog-server",
    version,
    about = "A gRPC CRUD service for blog posts backed by MongoDB"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/blog-uds.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Storage backend.
    ///
    /// Environment variable: `BLOG_STORE`
    #[arg(long, env = "BLOG_STORE", value_enum, default_value_t = StoreKind::Mongo)]
    pub store: StoreKind,

    /// MongoDB connection string.
    ///
    /// Environment variable: `MONGODB_URI`
    #[arg(long, env = "MONGODB_URI", default_value_t = String::from("mongodb://localhost:27017"))]
    pub mongodb_uri: String,

    /// Database holding the blog collection.
    ///
    /// Environment variable: `MONGODB_DATABASE`
    #[arg(long, env = "MONGODB_DATABASE", default_value_t = String::from(DEFAULT_DATABASE))]
    pub mongodb_database: String,

    /// Collection holding blog documents.
    ///
    /// Environment variable: `MONGODB_COLLECTION`
    #[arg(long, env = "MONGODB_COLLECTION", default_value_t = String::from(DEFAULT_COLLECTION))]
    pub mongodb_collection: String,

    /// Connect and server-selection timeout for MongoDB, in milliseconds.
    ///
    /// Keeps startup from hanging on an unreachable deployment.
    ///
    /// Environment variable: `CONNECT_TIMEOUT_MS`
    #[arg(long, env = "CONNECT_TIMEOUT_MS", default_value_t = 3_000)]
    pub connect_timeout_ms: u64,

    /// Upper bound on a single gRPC call, in milliseconds. `0` disables it.
    ///
    /// A shorter `grpc-timeout` sent by the caller still applies.
    ///
    /// Environment variable: `REQUEST_TIMEOUT_MS`
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Capacity of the buffer between the list cursor and the gRPC stream.
    ///
    /// Lower values increase backpressure responsiveness; higher values let
    /// the cursor run further ahead of a slow client.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// How long open list streams may keep running after a shutdown signal,
    /// in milliseconds.
    ///
    /// Environment variable: `SHUTDOWN_GRACE_MS`
    #[arg(long, env = "SHUTDOWN_GRACE_MS", default_value_t = 30_000)]
    pub shutdown_grace_ms: u64,

    /// Console log format.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub store: StoreKind,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub mongodb_collection: String,
    pub connect_timeout: Duration,
    pub request_timeout: Option<Duration>,
    pub stream_buffer_size: usize,
    pub shutdown_grace: Duration,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.store == StoreKind::Mongo {
            if !(args.mongodb_uri.starts_with("mongodb://")
                || args.mongodb_uri.starts_with("mongodb+srv://"))
            {
                bail!(
                    "MONGODB_URI must start with `mongodb://` or `mongodb+srv://` (got {:?})",
                    args.mongodb_uri
                );
            }

            if args.mongodb_database.trim().is_empty() {
                bail!("MONGODB_DATABASE must not be empty");
            }

            if args.mongodb_collection.trim().is_empty() {
                bail!("MONGODB_COLLECTION must not be empty");
            }
        }

        let request_timeout =
            (args.request_timeout_ms > 0).then(|| Duration::from_millis(args.request_timeout_ms));

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            store: args.store,
            mongodb_uri: args.mongodb_uri,
            mongodb_database: args.mongodb_database,
            mongodb_collection: args.mongodb_collection,
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
            request_timeout,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_grace: Duration::from_millis(args.shutdown_grace_ms),
            log_format: args.log_format,
        })
    }
}
