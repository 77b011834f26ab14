use std::{net::SocketAddr, sync::Arc};

use advisory_service::backend::{RestTableReader, TableReader};
use advisory_service::config::ServiceConfig;
use advisory_service::{build_router, AppState};
use anyhow::Context;
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use common_auth::extractors::{
    FULL_NAME_HEADER, PHONE_HEADER, ROLES_HEADER, TERMS_ACCEPTED_AT_HEADER, TERMS_VERSION_HEADER,
    TRACE_ID_HEADER, USER_EMAIL_HEADER, USER_ID_HEADER,
};
use common_observability::AdvisoryMetrics;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig::from_env()?;
    let metrics = Arc::new(AdvisoryMetrics::new().context("failed to register metrics")?);
    let reader: Arc<dyn TableReader> = Arc::new(
        RestTableReader::new(
            config.backend_rest_url.clone(),
            config.backend_api_key.clone(),
            config.backend_timeout,
        )
        .context("failed to build backend client")?,
    );
    info!(
        backend = %config.backend_rest_url,
        grace_ms = config.guard.grace_window.as_millis() as u64,
        terms_version = %config.guard.terms_version,
        "advisory-service configured"
    );

    let state = AppState::new(reader, config.guard.clone(), metrics);

    let gateway_headers = [
        USER_ID_HEADER,
        USER_EMAIL_HEADER,
        ROLES_HEADER,
        FULL_NAME_HEADER,
        PHONE_HEADER,
        TERMS_VERSION_HEADER,
        TERMS_ACCEPTED_AT_HEADER,
        TRACE_ID_HEADER,
    ];
    let mut allowed_headers = vec![ACCEPT, CONTENT_TYPE];
    allowed_headers.extend(
        gateway_headers
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()).ok()),
    );
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            config
                .cors_allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers);

    let app = build_router(state).layer(cors);

    let addr = SocketAddr::new(config.host, config.port);
    info!(%addr, "starting advisory-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
