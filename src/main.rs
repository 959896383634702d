use anyhow::anyhow;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yatube::config::AppConfig;
use yatube::infra::{cache::PageCache, db::Db, storage::ObjectStorage};
use yatube::{http, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = Db::connect(&config).await?;
    let storage = ObjectStorage::new(&config).await?;

    match config.app_mode.as_str() {
        "api" => {
            let cache = PageCache::connect(&config.redis_url).await?;
            let state = AppState {
                db,
                cache,
                storage,
                admin_token: config.admin_token.clone(),
                session_key: config.session_key,
                session_ttl_hours: config.session_ttl_hours,
                index_cache_ttl_seconds: config.index_cache_ttl_seconds,
                media_url: config.media_url.clone(),
                upload_max_bytes: config.upload_max_bytes,
            };

            let app: Router = http::router(state)
                .layer(RequestBodyLimitLayer::new(config.upload_max_bytes))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

            let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
            tracing::info!("listening on {}", config.http_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        "migrate" => {
            let applied = db.migrate(&config.migrations_dir).await?;
            storage.ensure_bucket().await?;
            tracing::info!(applied, bucket = %storage.bucket(), "migrations complete");
        }
        other => return Err(anyhow!("unknown APP_MODE: {}", other)),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
