use std::{
    error::Error,
    fs::OpenOptions,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

use lume_finance::{
    AppState, CatchUpReport, PaginationConfig, build_router, catch_up_recurring_transactions,
    cors_layer, graceful_shutdown, local_today,
};

/// The JSON API server for lume_finance.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "LUME_DB_PATH")]
    db_path: String,

    /// The address to listen on.
    #[arg(long, env = "LUME_ADDRESS", default_value = "127.0.0.1")]
    address: IpAddr,

    /// The port to serve the API from.
    #[arg(short, long, env = "LUME_PORT", default_value_t = 3000)]
    port: u16,

    /// The canonical timezone that decides what "today" is, e.g. "Europe/Rome".
    #[arg(long, env = "LUME_TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// An origin allowed to call the API from a browser. May be repeated.
    /// Any origin is allowed if none are given.
    #[arg(long, env = "LUME_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origin: Vec<String>,

    /// How often to create the transactions of due recurring transactions.
    /// They are only caught up at start-up if not set.
    #[arg(long, env = "LUME_CATCH_UP_INTERVAL_MINUTES")]
    catch_up_interval_minutes: Option<u64>,

    /// The number of items per page when a request does not say.
    #[arg(long, env = "LUME_PAGE_SIZE", default_value_t = 50)]
    page_size: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging()?;

    let args = Args::parse();

    let pagination_config = PaginationConfig {
        default_page_size: args.page_size,
        ..Default::default()
    };
    let connection = Connection::open(&args.db_path)?;
    let state = AppState::new(connection, &args.timezone, pagination_config)?;

    run_catch_up(&state);

    if let Some(minutes) = args.catch_up_interval_minutes.filter(|&minutes| minutes > 0) {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(minutes * 60));
            // The first tick completes immediately and start-up already caught up.
            interval.tick().await;

            loop {
                interval.tick().await;
                run_catch_up(&state);
            }
        });
        tracing::info!("Catching up recurring transactions every {minutes} minutes");
    }

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state)).layer(cors_layer(&args.allowed_origin));

    let addr = SocketAddr::new(args.address, args.port);
    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

/// Create the transactions of every recurring transaction that is due.
///
/// Failures are logged, the server keeps running.
fn run_catch_up(state: &AppState) {
    let report = local_today(&state.local_timezone).and_then(|today| {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| lume_finance::Error::DatabaseLockError)?;

        catch_up_recurring_transactions(today, &connection)
    });

    match report {
        Ok(CatchUpReport { failed: 0, .. }) => {}
        Ok(report) => tracing::warn!(
            "{} recurring transactions could not be caught up",
            report.failed
        ),
        Err(error) => tracing::error!("Could not catch up recurring transactions: {error}"),
    }
}

fn setup_logging() -> Result<(), std::io::Error> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    let stdout_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(stdout_log.with_filter(stdout_filter))
        .with(debug_log.with_filter(filter::LevelFilter::DEBUG))
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they happen.
        .on_failure(());

    router.layer(tracing_layer)
}
