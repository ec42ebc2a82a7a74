use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Credentials of the superuser ensured at startup.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub admin: Option<AdminBootstrap>,
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(v) => v.parse().with_context(|| format!("{key}={v:?} is not valid")),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = optional("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parsed("APP_PORT", 8080)?;
        let listen_addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("bad listen address {host}:{port}"))?;

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: optional("JWT_ISSUER").unwrap_or_else(|| "velorent".into()),
            audience: optional("JWT_AUDIENCE").unwrap_or_else(|| "velorent-users".into()),
            ttl_minutes: parsed("JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: parsed("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };

        let admin = match (optional("ADMIN_EMAIL"), optional("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            listen_addr,
            jwt,
            admin,
        })
    }
}
