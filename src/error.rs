// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error en la base de datos: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Error de migración de la base de datos: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Error de variable de entorno: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Error al procesar la contraseña")]
    PasswordHashingError,

    #[error("Error al firmar el token: {0}")]
    TokenSigningError(#[from] jsonwebtoken::errors::Error),

    // Petición mal formada (id no numérico, payload inválido, ciclo de prerrequisitos...)
    #[error("{0}")]
    InvalidArgument(String),

    // Sin credencial o credencial ilegible
    #[error("{0}")]
    Unauthenticated(String),

    // Credencial válida, rol insuficiente
    #[error("No autorizado")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    // Fallo de integridad referencial al insertar relaciones
    #[error("{0}")]
    ConstraintViolation(String),

    #[error("Error interno del servidor")]
    Internal,
}

/// Cuerpo JSON de todas las respuestas de error: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::SqlxError(_)
            | AppError::SqlxMigrateError(_)
            | AppError::EnvVarError(_)
            | AppError::PasswordHashingError
            | AppError::TokenSigningError(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Traduce errores de escritura de sqlx: una FK violada es un conflicto del cliente,
    /// todo lo demás sigue siendo un error de base de datos.
    pub fn from_write(err: sqlx::Error, context: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::ConstraintViolation(format!("{context}: referencia inexistente"))
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::ConstraintViolation(format!("{context}: registro duplicado"))
            }
            _ => AppError::SqlxError(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Los 5xx se registran con detalle y se devuelven genéricos
        let message = if status.is_server_error() {
            tracing::error!("Error procesado: {:?}", self);
            AppError::Internal.to_string()
        } else {
            tracing::debug!("Petición rechazada ({}): {}", status.as_u16(), self);
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type AppResult<T = ()> = Result<T, AppError>;
