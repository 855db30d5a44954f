// src/services/auth_service.rs
use crate::{
    config::JwtConfig,
    error::{AppError, AppResult},
    models::{
        role::Role,
        user::{Session, User},
    },
    services::user_service,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::OnceCell;

const INVALID_TOKEN: &str = "Token inválido";

// Coste reducido en tests para no ralentizar la suite
const HASH_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };

// Hash contra el que se verifica cuando el correo no existe: el login tarda lo mismo
static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

async fn dummy_hash() -> AppResult<&'static str> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_password("sin-usuario"))
        .await?;
    Ok(hash.as_str())
}

/// Claims del token bearer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// ID del usuario
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// Verifica si la contraseña coincide con el hash guardado.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &stored_hash))
        .await
        .map_err(|e| {
            tracing::error!("Error en la tarea spawn_blocking (verify_password): {:?}", e);
            AppError::Internal
        })?
        .map_err(|e| {
            tracing::error!("Error bcrypt al verificar contraseña: {:?}", e);
            AppError::PasswordHashingError
        })
}

/// Genera un hash bcrypt para una contraseña.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(&password, HASH_COST))
        .await
        .map_err(|e| {
            tracing::error!("Error en la tarea spawn_blocking (hash_password): {:?}", e);
            AppError::Internal
        })?
        .map_err(|e| {
            tracing::error!("Error bcrypt al generar hash: {:?}", e);
            AppError::PasswordHashingError
        })
}

pub fn create_token(user: &User, config: &JwtConfig) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        name: user.name.clone(),
        role: user.role,
        exp: (now + Duration::hours(config.expiration_hours)).timestamp(),
        iat: now.timestamp(),
        iss: config.issuer.clone(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?)
}

/// Valida firma, emisor y expiración. Cualquier fallo es `Unauthenticated`.
pub fn verify_token(token: &str, config: &JwtConfig) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Token rechazado: {}", e);
        AppError::Unauthenticated(INVALID_TOKEN.to_string())
    })
}

/// Resuelve el token a una sesión. El rol se relee de la base de datos,
/// así un usuario eliminado o degradado pierde el acceso en la siguiente petición.
pub async fn resolve_session(
    db_pool: &SqlitePool,
    config: &JwtConfig,
    token: &str,
) -> AppResult<Session> {
    let claims = verify_token(token, config)?;
    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthenticated(INVALID_TOKEN.to_string()))?;

    match user_service::find_user_by_id(db_pool, user_id).await? {
        Some(user) => Ok(Session::from(user)),
        None => {
            tracing::warn!("Token válido para usuario inexistente: {}", user_id);
            Err(AppError::Unauthenticated(INVALID_TOKEN.to_string()))
        }
    }
}

/// Comprueba las credenciales y emite un token nuevo.
pub async fn login(
    db_pool: &SqlitePool,
    config: &JwtConfig,
    email: &str,
    password: &str,
) -> AppResult<(String, User)> {
    let invalid = || AppError::Unauthenticated("Credenciales inválidas".to_string());

    let Some(user) = user_service::find_user_by_email(db_pool, email).await? else {
        verify_password(password, dummy_hash().await?).await?;
        tracing::warn!("Login fallido para {}", email);
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash).await? {
        tracing::warn!("Login fallido para {}", email);
        return Err(invalid());
    }

    let token = create_token(&user, config)?;
    tracing::info!("✅ Login correcto para {} ({})", user.email, user.role);
    Ok((token, user))
}
