use anyhow::{bail, Context};
use ipnet::IpNet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: String,
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub auth: AuthConfig,
    pub object_store: ObjectStoreConfig,
    pub analytics: AnalyticsConfig,
    pub retry: RetryConfig,
    pub cors: CorsConfig,
    /// Largest accepted multipart upload, in bytes
    pub upload_max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStoreBackend {
    Memory,
    S3,
}

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub backend: ObjectStoreBackend,
    /// Public base URL that uploaded keys are appended to
    pub public_base_url: String,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom S3-compatible endpoint (path-style addressing); AWS virtual-host style when unset
    pub endpoint: Option<String>,
    /// Folder inside the bucket that every key is stored under
    pub key_prefix: String,
    pub acl: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustedProxyMode {
    /// Use the socket address only
    None,
    /// Honour Forwarded / X-Forwarded-For
    Standard,
    /// Honour CF-Connecting-IP
    Cloudflare,
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Path to a GeoLite2-Country (or City) MMDB file
    pub geoip_country_db_path: Option<String>,
    pub trusted_proxy_mode: TrustedProxyMode,
    pub trusted_proxies: Vec<IpNet>,
    pub num_trusted_proxies: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_elapsed_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl RetryConfig {
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            geoip_country_db_path: None,
            trusted_proxy_mode: TrustedProxyMode::None,
            trusted_proxies: Vec::new(),
            num_trusted_proxies: None,
        }
    }
}

const LOCAL_JWT_SECRET: &str = "folio-local-development-secret";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let is_local = app_env.eq_ignore_ascii_case("local");

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./folio.db?mode=rwc".to_string());
        let max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = parse_env("API_PORT", 8080u16)?;

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if is_local => {
                tracing::warn!("JWT_SECRET is not set, using the local development secret");
                LOCAL_JWT_SECRET.to_string()
            }
            _ => bail!("JWT_SECRET must be set when APP_ENV={app_env}"),
        };
        let token_ttl_secs = parse_env("JWT_TTL_SECS", 3600u64)?;

        let object_store =
            object_store_from_env(&format!("http://{}:{}/objects", api_host, api_port))?;
        let analytics = analytics_from_env()?;

        let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Config {
            app_env,
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_secs,
            },
            object_store,
            analytics,
            retry: RetryConfig {
                max_elapsed_secs: parse_env("DB_RETRY_MAX_ELAPSED_SECS", 30u64)?,
            },
            cors: CorsConfig { allowed_origins },
            upload_max_bytes: parse_env("UPLOAD_MAX_BYTES", 10 * 1024 * 1024usize)?,
        })
    }
}

/// `local_base_url` is where this server serves in-memory uploads.
fn object_store_from_env(local_base_url: &str) -> anyhow::Result<ObjectStoreConfig> {
    let backend = match std::env::var("OBJECT_STORE_BACKEND")
        .unwrap_or_else(|_| "memory".to_string())
        .to_lowercase()
        .as_str()
    {
        "memory" => ObjectStoreBackend::Memory,
        "s3" => ObjectStoreBackend::S3,
        other => {
            tracing::warn!(
                "Unknown OBJECT_STORE_BACKEND '{other}', falling back to 'memory'. Supported values: memory, s3"
            );
            ObjectStoreBackend::Memory
        }
    };

    if backend == ObjectStoreBackend::Memory {
        let public_base_url =
            std::env::var("S3_PUBLIC_URL").unwrap_or_else(|_| local_base_url.to_string());
        return Ok(ObjectStoreConfig {
            backend,
            public_base_url,
            s3: None,
        });
    }

    let bucket =
        std::env::var("S3_BUCKET").context("S3_BUCKET must be set when OBJECT_STORE_BACKEND=s3")?;
    let region =
        std::env::var("S3_REGION").context("S3_REGION must be set when OBJECT_STORE_BACKEND=s3")?;
    let public_base_url = std::env::var("S3_PUBLIC_URL")
        .context("S3_PUBLIC_URL must be set when OBJECT_STORE_BACKEND=s3")?;
    let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
        .context("AWS_ACCESS_KEY_ID must be set when OBJECT_STORE_BACKEND=s3")?;
    let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .context("AWS_SECRET_ACCESS_KEY must be set when OBJECT_STORE_BACKEND=s3")?;

    Ok(ObjectStoreConfig {
        backend,
        public_base_url,
        s3: Some(S3Config {
            bucket,
            region,
            endpoint: std::env::var("S3_ENDPOINT").ok(),
            key_prefix: std::env::var("S3_KEY_PREFIX").unwrap_or_default(),
            acl: std::env::var("S3_ACL").ok().filter(|acl| !acl.is_empty()),
            access_key_id,
            secret_access_key,
        }),
    })
}

fn analytics_from_env() -> anyhow::Result<AnalyticsConfig> {
    let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
        .unwrap_or_else(|_| "none".to_string())
        .to_lowercase()
        .as_str()
    {
        "none" => TrustedProxyMode::None,
        "standard" => TrustedProxyMode::Standard,
        "cloudflare" => TrustedProxyMode::Cloudflare,
        other => {
            tracing::warn!(
                "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
            );
            TrustedProxyMode::None
        }
    };

    let trusted_proxies = std::env::var("TRUSTED_PROXIES")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|cidr| !cidr.is_empty())
        .map(|cidr| {
            cidr.parse::<IpNet>()
                .with_context(|| format!("TRUSTED_PROXIES entry '{cidr}' is not a valid CIDR"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let num_trusted_proxies = std::env::var("NUM_TRUSTED_PROXIES")
        .ok()
        .map(|v| v.parse::<usize>())
        .transpose()
        .context("NUM_TRUSTED_PROXIES must be a non-negative integer")?;

    Ok(AnalyticsConfig {
        geoip_country_db_path: std::env::var("GEOIP_COUNTRY_DB_PATH").ok(),
        trusted_proxy_mode,
        trusted_proxies,
        num_trusted_proxies,
    })
}

fn parse_env<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
