use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub nova_poshta: NovaPoshtaConfig,
}

#[derive(Debug, Clone)]
pub struct NovaPoshtaConfig {
    pub api_url: String,
    pub api_key: String,
    pub cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let jwt_ttl_hours = parse_or("JWT_TTL_HOURS", 24);
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", 5 * 1024 * 1024);

        let nova_poshta = NovaPoshtaConfig {
            api_url: env::var("NOVA_POSHTA_API_URL")
                .unwrap_or_else(|_| "https://api.novaposhta.ua/v2.0/json/".to_string()),
            api_key: env::var("NOVA_POSHTA_API_KEY").unwrap_or_default(),
            cache_ttl_secs: parse_or("NOVA_POSHTA_CACHE_TTL_SECS", 3600),
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            upload_dir,
            max_upload_bytes,
            nova_poshta,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
