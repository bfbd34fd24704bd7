use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Shortest HS256 secret accepted outside dev
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Database. `None` selects the in-process record store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    pub cors_allow_origins: Vec<String>,

    // Auth (HS256 bearer tokens)
    pub auth_jwt_secret: String,
    pub auth_jwt_issuer: String,
    pub auth_jwt_audience: String,

    // Uploads
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let settings = Settings {
            env: Environment::from_str(&var_or("ENV", "dev")),
            server_addr: var_or("SERVER_ADDR", "0.0.0.0:8080"),

            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,

            cors_allow_origins: var_or("CORS_ALLOW_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            auth_jwt_secret: env::var("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET must be set")?,
            auth_jwt_issuer: var_or("AUTH_JWT_ISSUER", "digiurban"),
            auth_jwt_audience: var_or("AUTH_JWT_AUDIENCE", "authenticated"),

            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "./uploads")),
            max_upload_bytes: parsed_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations that only make sense on a developer machine
    pub fn validate(&self) -> Result<()> {
        if self.env.is_dev() {
            return Ok(());
        }
        if self.database_url.is_none() {
            bail!("DATABASE_URL must be set outside dev");
        }
        if self.auth_jwt_secret.len() < MIN_SECRET_LEN {
            bail!(
                "AUTH_JWT_SECRET must be at least {} characters outside dev",
                MIN_SECRET_LEN
            );
        }
        if self.cors_allow_origins.iter().any(|o| o == "*") && self.env.is_prod() {
            bail!("CORS_ALLOW_ORIGINS must list origins explicitly in prod");
        }
        Ok(())
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse `name` when set; a set but malformed value is an error
fn parsed_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} is not valid: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
