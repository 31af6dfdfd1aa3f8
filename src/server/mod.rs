//! HTTP backend serving the live sample.
//!
//! Every facet has a streamed route (`text/plain`, one record per line) and
//! a `_non_streaming` route returning the same data as JSON. `POST
//! /new_search` swaps in a fresh sample.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::catalog::{Catalog, FileCatalogSource};
use crate::config::Config;

pub mod error;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use routes::{
    associations_handler, associations_materialized_handler, clusters_handler,
    clusters_materialized_handler, new_search_handler, products_handler,
    products_materialized_handler,
};

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/new_search", post(new_search_handler))
        .route("/clusters", get(clusters_handler))
        .route("/products", get(products_handler))
        .route("/associations", get(associations_handler))
        .route("/clusters_non_streaming", get(clusters_materialized_handler))
        .route("/products_non_streaming", get(products_materialized_handler))
        .route(
            "/associations_non_streaming",
            get(associations_materialized_handler),
        )
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Load the catalog, bind, and serve until Ctrl+C or SIGTERM.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    info!("Loading catalog...");
    let source = FileCatalogSource::new(&config.server.product_codes, &config.server.product_graph);
    let catalog = Arc::new(Catalog::load(&source));
    let state = AppState::new(catalog, config);

    let address = config.server.bind_address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {}", listener.local_addr()?);

    serve(listener, state, shutdown_signal()).await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
