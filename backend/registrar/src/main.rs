//! Reunion registrar entry point.
//!
//! Hosts the multi-step registration wizard for the Alumni, Staff and Other
//! forms behind a small Axum REST API. Drafts are kept in SQLite between
//! requests; OTP, step saves, submission, payment and admin calls are
//! forwarded to the registration backend.

mod api_client;
mod config;
mod draft_store;
mod errors;
mod payment;
mod routes;
mod service;
mod session;
mod wire;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api_client::ApiClient;
use config::Config;
use draft_store::DraftStore;
use routes::AppState;
use service::WizardService;
use session::AdminSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!(
        "Backend at {} (OTP at {}), {:?} saves",
        config.api_base_url, config.otp_base_url, config.save_strategy
    );

    // Set up the SQLite connection pool and run migrations.
    let pool = draft_store::init_pool(&config.database_url).await?;
    let store = DraftStore::new(pool);

    // One HTTP client, one fixed timeout, for every upstream call.
    let api = ApiClient::new(&config)?;

    let state = Arc::new(AppState {
        wizards: WizardService::new(
            store.clone(),
            api.clone(),
            config.contribution_rates,
            config.save_strategy,
            config.payment_key_id.clone(),
        ),
        admin: AdminSession::new(store),
        api,
    });

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
