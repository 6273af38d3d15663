//! CLI for browsing sandwich attacks found by the scan API.

mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sandwich_lab_scanner::{PageSnapshot, Paginator, ScanClient, ScanConfig, ScanSession};
use sandwich_lab_telemetry::{init_logging, LogFormat, Metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "sandwich-lab")]
#[command(about = "Browse MEV sandwich attacks on a trading pair, newest first")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk pages of detected sandwiches and print them
    Scan {
        #[command(flatten)]
        args: ScanArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Walk pages of detected sandwiches and write them to a CSV file
    Export {
        #[command(flatten)]
        args: ScanArgs,

        /// CSV output path
        #[arg(long, default_value = "sandwiches.csv")]
        output: String,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Scan endpoint URL
    #[arg(long, env = "SANDWICH_API_URL", default_value = "http://localhost:8080/sandwiches")]
    api_url: String,

    /// Chain identifier
    #[arg(long, env = "SANDWICH_CHAIN", default_value = "ethereum")]
    chain: String,

    /// Pair contract address
    #[arg(long, env = "SANDWICH_PAIR")]
    pair: String,

    /// Sandwiches per page
    #[arg(long, default_value = "10")]
    page_size: usize,

    /// Number of pages to walk
    #[arg(long, default_value = "1")]
    pages: usize,

    /// Minimum milliseconds between the starts of two scan requests
    #[arg(long, default_value = "2000")]
    min_cycle_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    request_timeout_seconds: u64,

    /// Consecutive transport failures tolerated before giving up
    #[arg(long, default_value = "3")]
    max_transport_retries: u32,

    /// Metrics bind address, e.g. 0.0.0.0:9090
    #[arg(long)]
    metrics_bind_address: Option<String>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Human readable logs instead of JSON
    #[arg(long, default_value = "false")]
    pretty_logs: bool,

    /// Sample output path for audit logs of raw scan responses
    #[arg(long)]
    sample_output_path: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { args, format } => {
            start_logging(&args)?;
            let session = build_session(&args).await?;
            walk_pages(session, args.pages, |snapshot| {
                match format {
                    OutputFormat::Table => output::print_table(snapshot),
                    OutputFormat::Json => output::print_json(snapshot)?,
                }
                Ok(())
            })
            .await?;
        }
        Commands::Export { args, output } => {
            start_logging(&args)?;
            let session = build_session(&args).await?;
            let mut writer = output::CsvExport::create(&output)?;
            walk_pages(session, args.pages, |snapshot| writer.write_page(snapshot)).await?;
            let rows = writer.finish()?;
            info!("Exported {} sandwiches to {}", rows, output);
        }
    }

    Ok(())
}

fn start_logging(args: &ScanArgs) -> anyhow::Result<()> {
    let format = if args.pretty_logs {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    };
    init_logging(args.log_level.as_deref(), format)
}

async fn build_session(args: &ScanArgs) -> anyhow::Result<Arc<ScanSession>> {
    let mut config = ScanConfig::new(&args.api_url, &args.chain, &args.pair);
    config.page_size = args.page_size;
    config.min_cycle = Duration::from_millis(args.min_cycle_ms);
    config.request_timeout = Duration::from_secs(args.request_timeout_seconds);
    config.max_transport_retries = args.max_transport_retries;

    let metrics = Metrics::new()?;
    if let Some(addr) = &args.metrics_bind_address {
        start_metrics_server(addr, metrics.clone()).await?;
    }

    let client = ScanClient::new(&config.api_url, config.request_timeout)?;
    let mut session = ScanSession::new(config, Arc::new(client), metrics)?;
    if let Some(path) = &args.sample_output_path {
        session = session.with_sample_output(path);
    }

    info!(chain = %args.chain, pair = %args.pair, "Starting sandwich scan");
    Ok(Arc::new(session))
}

/// Walk up to `pages` pages, handing each snapshot to `on_page`.
///
/// Stops early at the last page, and cancels the scan on Ctrl-C.
async fn walk_pages<F>(session: Arc<ScanSession>, pages: usize, mut on_page: F) -> anyhow::Result<()>
where
    F: FnMut(&PageSnapshot) -> anyhow::Result<()>,
{
    let mut paginator = Paginator::new(session);
    let session = Arc::clone(paginator.session());

    let walk = async {
        for page in 0..pages {
            paginator.get_page(page);
            let snapshot = paginator.settled().await;
            on_page(&snapshot)?;

            if snapshot.failed {
                error!("Scan failed: {}", snapshot.error_message);
                anyhow::bail!("scan failed: {}", snapshot.error_message);
            }
            if !snapshot.has_next_page {
                info!(page = snapshot.page, "Reached the last available page");
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        result = walk => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling scan");
            session.cancel();
            Ok(())
        }
    }
}

async fn start_metrics_server(addr: &str, metrics: Metrics) -> anyhow::Result<()> {
    use axum::{
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Router,
    };

    let metrics = Arc::new(metrics);

    async fn metrics_handler(
        State(metrics): State<Arc<Metrics>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        match metrics.gather() {
            Ok(body) => Ok((StatusCode::OK, body)),
            Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics server listening on http://{}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}
