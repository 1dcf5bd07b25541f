use anyhow::Context as _;
use apiscan_catalog::{Catalog, CatalogConfig};
use apiscan_mcp_server::logging::{self, LogFormat};
use apiscan_mcp_server::{Dispatcher, serve};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "apiscan-mcp-server")]
#[command(version, about = "MCP stdio server for the Huawei Cloud API Explorer catalog", long_about = None)]
struct Args {
    /// Catalog config file (JSON or YAML). Missing file means defaults.
    #[arg(long, env = "APISCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the API Explorer service.
    #[arg(long, env = "APISCAN_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "APISCAN_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Page size for API listings.
    #[arg(long, env = "APISCAN_PAGE_SIZE")]
    page_size: Option<usize>,

    /// Log level (overridden by `RUST_LOG`).
    #[arg(long, env = "APISCAN_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_format);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    let result = runtime.block_on(run(args));
    // A pending stdin read sits on the blocking pool and would hold up a normal shutdown.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default(),
    }
    .with_overrides(args.base_url, args.timeout_secs, args.page_size);

    let catalog = Catalog::from_config(&config).context("invalid catalog configuration")?;
    tracing::info!(
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        page_size = config.page_size,
        "apiscan MCP server ready"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let dispatcher = Dispatcher::new(catalog);
    let reason = serve(
        &dispatcher,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await
    .context("stdio transport failed")?;
    tracing::info!(?reason, "apiscan MCP server stopped");
    Ok(())
}

async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("termination signal received");
    token.cancel();
}
