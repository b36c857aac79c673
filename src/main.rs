mod config;
mod db;
mod ist;
mod mail;
mod moderation;
mod rate_limit;
mod routes;
mod services;
mod state;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn default_log_filter() -> &'static str {
    if config::env_bool("DEBUG").unwrap_or(false) {
        "workshop_hub=debug,tower_http=debug"
    } else {
        "workshop_hub=info,tower_http=info"
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_log_filter().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("database init failed");

    let mailer = mail::from_config(&config.email);
    if config.email.api_key.is_none() {
        tracing::warn!("RESEND_API_KEY not set; outbound email disabled");
    }

    let reminder_interval = config.reminder_interval;
    let state = state::AppState::new(pool, config, mailer);

    // Periodic reminder sweeps; manual and cron routes still work without it.
    let _reminders = reminder_interval.map(|period| services::reminder::spawn_reminder_task(state.clone(), period));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "workshop-hub listening");
    axum::serve(listener, app).await.expect("server failed");
}
