use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use order_api::audit::create_audit_logger;
use order_api::rest::{ApiConfig, AppState, create_router};
use order_api::{KvOrderStore, KvStore, MemoryKv, OrderAuditLogger, RandomIds, RedbKv};

#[derive(Parser)]
#[command(name = "order-api")]
#[command(about = "Order API Server - order management over a key-value store")]
struct Args {
    /// Listen address for REST API
    #[arg(short, long, default_value = "[::1]:3000")]
    listen: String,

    /// Data directory for persistent storage
    #[arg(short, long, default_value = "/var/lib/order-api")]
    data_dir: PathBuf,

    /// Run in development mode (in-memory storage, no audit log)
    #[arg(long)]
    dev: bool,

    /// Deadline for the store calls of a single request, in milliseconds
    #[arg(long, default_value = "5000")]
    request_timeout_ms: u64,

    /// Page size for order listings when the client sends none
    #[arg(long, default_value = "50")]
    default_page_size: u64,

    /// Largest page size a client may request
    #[arg(long, default_value = "500")]
    max_page_size: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("order_api=info".parse()?))
        .init();

    let args = Args::parse();

    if args.default_page_size == 0 || args.default_page_size > args.max_page_size {
        return Err(format!(
            "--default-page-size must be between 1 and --max-page-size ({})",
            args.max_page_size
        )
        .into());
    }

    // Open the process-wide store handle
    let kv: Arc<dyn KvStore> = if args.dev {
        info!("Using in-memory store (dev mode)");
        Arc::new(MemoryKv::new())
    } else {
        tokio::fs::create_dir_all(&args.data_dir).await?;
        info!("Using redb store in {}", args.data_dir.display());
        Arc::new(RedbKv::open(&args.data_dir)?)
    };

    let audit = if args.dev {
        Arc::new(OrderAuditLogger::new_noop())
    } else {
        create_audit_logger()
    };

    let app_state = Arc::new(AppState {
        store: Arc::new(KvOrderStore::new(kv)),
        ids: Arc::new(RandomIds),
        audit,
        config: ApiConfig {
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            default_page_size: args.default_page_size,
            max_page_size: args.max_page_size,
        },
    });

    // Create REST router
    let router = create_router(app_state);

    // Start REST server
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    info!("REST API listening on {}", args.listen);

    // Run server with graceful shutdown
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let ctrl_c = signal::ctrl_c();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
