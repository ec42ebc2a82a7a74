mod app;
mod auth;
mod bicycles;
mod config;
mod error;
mod extract;
mod rentals;
mod state;
mod store;
mod users;


use crate::state::AppState;

fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "velorent=debug,axum=info,tower_http=info".to_string());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.with_target(false).json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let (state, db) = AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migrations not applied; continuing with existing schema");
    }

    if let Some(admin) = state.config.admin.clone() {
        match users::services::ensure_superuser(&state, &admin).await {
            Ok(user) => tracing::info!(user_id = %user.id, "superuser ready"),
            Err(e) => tracing::error!(error = %e, "superuser bootstrap failed"),
        }
    }

    let addr = state.config.listen_addr;
    app::serve(app::build_app(state), addr).await
}
