use anyhow::Result;

/// Environment-driven settings, resolved once at startup (after
/// `dotenvy::dotenv()`) and never read again at request time.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Unset means permissive CORS (development default).
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("NOTABLE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("NOTABLE_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            db_path: std::env::var("NOTABLE_DB_PATH").unwrap_or_else(|_| "notable.db".into()),
            jwt_secret: std::env::var("NOTABLE_JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".into()),
            token_ttl_minutes: std::env::var("NOTABLE_TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
            cors_origin: std::env::var("NOTABLE_CORS_ORIGIN").ok(),
        })
    }
}
