use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub session: SessionConfig,
    /// Role given to users who sign themselves up.
    pub default_role: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60 * 24),
            secure_cookie: env_parse("SESSION_SECURE_COOKIE").unwrap_or(false),
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8080),
            max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            session,
            default_role: std::env::var("DEFAULT_ROLE").unwrap_or_else(|_| "customer".into()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
