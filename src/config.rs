// src/config.rs
use crate::error::AppResult;
use std::{env, net::SocketAddr};

const DEFAULT_DATABASE_URL: &str = "sqlite://syllabus.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24;

/// Firma y validez de los tokens bearer.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            issuer: "syllabus-admin".to_string(),
        }
    }
}

/// Credenciales del primer DIRECTOR, creado al arrancar si aún no existe ninguno.
#[derive(Clone, Debug)]
pub struct BootstrapDirector {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub bootstrap_director: Option<BootstrapDirector>,
}

impl Config {
    /// Lee la configuración del entorno (y de `.env`, si existe).
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| {
                tracing::error!("BIND_ADDR inválida: {}", e);
                crate::error::AppError::Internal
            })?;

        let secret = env::var("JWT_SECRET")?;
        if secret.len() < 32 {
            tracing::warn!("⚠️ JWT_SECRET es corta, considere usar una clave más larga y aleatoria.");
        }
        let mut jwt = JwtConfig::new(secret);
        if let Some(hours) = env::var("JWT_EXPIRATION_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
        {
            jwt.expiration_hours = hours;
        }

        let bootstrap_director = match (
            env::var("BOOTSTRAP_DIRECTOR_EMAIL"),
            env::var("BOOTSTRAP_DIRECTOR_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapDirector {
                name: env::var("BOOTSTRAP_DIRECTOR_NAME").unwrap_or_else(|_| "Director".into()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr,
            jwt,
            bootstrap_director,
        })
    }
}
