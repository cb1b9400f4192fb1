use anyhow::Context;

use userhub::auth::password;
use userhub::state::AppState;
use userhub::users::repo_types::User;
use userhub::{app, config::AdminBootstrap};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "userhub=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&state.db).await {
        tracing::warn!(error = %e, "migrations folder not found or migration failed; continuing");
    }

    if let Some(admin) = state.config.bootstrap_admin.clone() {
        bootstrap_admin(&state, &admin).await?;
    }

    let app = app::build_app(state);
    app::serve(app).await
}

/// Without at least one seeded admin the admin surface is unreachable,
/// so an optional env-provided account is created on boot.
async fn bootstrap_admin(state: &AppState, admin: &AdminBootstrap) -> anyhow::Result<()> {
    let hash = password::hash_password(&admin.password).context("hash bootstrap admin password")?;
    let created = User::ensure_admin(&state.db, &admin.username, &admin.email, &hash)
        .await
        .context("insert bootstrap admin")?;
    if created {
        tracing::info!(username = %admin.username, "bootstrap admin created");
    } else {
        tracing::debug!(username = %admin.username, "bootstrap admin already present");
    }
    Ok(())
}
