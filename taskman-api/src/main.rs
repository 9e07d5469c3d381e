//! # Taskman API Server
//!
//! Multi-user task tracker: accounts with an admin or regular role, tasks that
//! move `new → started → finished`, bearer-token sessions.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskman \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p taskman-api
//! ```

use std::sync::Arc;

use taskman_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskman_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.json_logs);

    tracing::info!(
        "Taskman API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig::from_url(
        &config.database.url,
        config.database.max_connections,
    ))
    .await?;
    run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let state = AppState::new(store, config);

    if let Some(admin) = &state.config.admin {
        match state.accounts.ensure_admin(&admin.email, &admin.password).await {
            Ok(Some(user)) => tracing::info!(user_id = %user.id, "Admin account created"),
            Ok(None) => tracing::debug!("Admin account already exists"),
            Err(e) => anyhow::bail!("could not create admin account: {e}"),
        }
    }

    let address = state.config.bind_address();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskman_api=debug,taskman_shared=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
