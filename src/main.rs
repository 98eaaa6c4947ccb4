use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use folio::analytics::{AnalyticsEngine, GeoIpService, SystemClock};
use folio::api::{self, AppState};
use folio::auth::{AuthService, TokenService};
use folio::config::{Config, DatabaseBackend, ObjectStoreBackend};
use folio::content::ContentService;
use folio::metrics::Metrics;
use folio::object_store::{MemoryObjectStore, ObjectStore, S3ObjectStore};
use folio::retry::RetryPolicy;
use folio::storage::{PostgresStorage, RetryingStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(env = %config.app_env, "Loaded configuration");

    let database: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(SqliteStorage::new(&config.database.url, config.database.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(
                PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
            )
        }
    };

    info!("Initializing database...");
    database.init().await.context("Failed to initialize database")?;
    info!("Database initialized successfully");

    let storage: Arc<dyn Storage> = Arc::new(RetryingStorage::new(
        database,
        RetryPolicy::with_max_elapsed(config.retry.max_elapsed()),
    ));

    let (objects, local_objects) = match config.object_store.backend {
        ObjectStoreBackend::Memory => {
            info!(
                base_url = %config.object_store.public_base_url,
                "Using in-memory object store, uploads are lost on restart"
            );
            let store = MemoryObjectStore::new(config.object_store.public_base_url.clone());
            let objects: Arc<dyn ObjectStore> = Arc::new(store.clone());
            (objects, Some(store))
        }
        ObjectStoreBackend::S3 => {
            let s3 = config
                .object_store
                .s3
                .clone()
                .context("S3 settings are missing")?;
            info!(bucket = %s3.bucket, region = %s3.region, "Using S3 object store");
            let objects: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(
                s3,
                config.object_store.public_base_url.clone(),
            )?);
            (objects, None)
        }
    };

    let geo = GeoIpService::new(config.analytics.geoip_country_db_path.as_deref())?;
    if geo.is_enabled() {
        info!("GeoIP country lookup enabled");
    }

    let metrics = Arc::new(Metrics::default());
    let analytics = Arc::new(AnalyticsEngine::new(
        Arc::clone(&storage),
        Arc::new(geo),
        Arc::new(SystemClock),
        Arc::clone(&metrics),
    ));
    let content = Arc::new(ContentService::new(
        Arc::clone(&storage),
        objects,
        Arc::clone(&metrics),
    ));
    let auth = Arc::new(AuthService::new(
        TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_secs),
        Arc::clone(&storage),
        Arc::clone(&metrics),
    ));

    let state = Arc::new(AppState {
        storage,
        analytics,
        content,
        auth,
        metrics,
        client_ip: config.analytics.clone(),
        local_objects,
    });
    let router = api::create_router(state, &config.cors, config.upload_max_bytes);

    let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 API server listening on http://{}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
