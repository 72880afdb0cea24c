use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use levelup_ledger::{
    AppState, build_router, graceful_shutdown, logging_middleware, user_stats::reconcile_balance,
};

/// The REST API server for levelup_ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH", default_value = "levelup.db")]
    db_path: String,

    /// The address to listen on.
    #[arg(short, long, env = "ADDRESS", default_value = "127.0.0.1")]
    address: IpAddr,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Fill a new database with a few example transactions.
    #[arg(long)]
    seed_demo_data: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from((args.address, args.port));

    let conn = Connection::open(&args.db_path).expect("Could not open the database.");
    let state = if args.seed_demo_data {
        AppState::with_demo_data(conn)
    } else {
        AppState::new(conn)
    }
    .expect("Could not initialize the database.");

    check_balance(&state);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state)
            .layer(middleware::from_fn(logging_middleware))
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

/// Warn if the stored balance disagrees with the transactions, which means
/// the database was modified outside of this server.
fn check_balance(state: &AppState) {
    let Ok(connection) = state.db_connection.lock() else {
        tracing::error!("Could not acquire the database lock to check the balance.");
        return;
    };

    match reconcile_balance(&connection) {
        Ok(reconciliation) if reconciliation.is_consistent() => {
            tracing::debug!("Balance {} matches the transactions.", reconciliation.stored);
        }
        Ok(reconciliation) => tracing::warn!(
            "The stored balance {} does not match the sum of the transactions {}.",
            reconciliation.stored,
            reconciliation.folded
        ),
        Err(error) => tracing::error!("Could not check the balance: {error}"),
    }
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
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
