use std::sync::Arc;

use anyhow::Context;

use bizdesk_api::app::{AppServices, build_app};
use bizdesk_auth::AuthConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bizdesk_observability::init();

    let config = AuthConfig::from_env();
    let services = AppServices::new(config);

    match (std::env::var("BIZDESK_ADMIN_EMAIL"), std::env::var("BIZDESK_ADMIN_PASSWORD")) {
        (Ok(email), Ok(password)) => {
            services
                .directory
                .seed_platform_admin(&email, "Platform admin", &password)
                .context("failed to seed platform admin")?;
        }
        _ => tracing::warn!("BIZDESK_ADMIN_EMAIL/BIZDESK_ADMIN_PASSWORD not set; no platform admin can sign in"),
    }

    let app = build_app(Arc::new(services));

    let addr = std::env::var("BIZDESK_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
