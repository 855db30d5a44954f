// src/web/session.rs
use crate::{
    error::AppError,
    models::user::Session,
    services::auth_service,
    state::AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Extrae el token de `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let missing = || AppError::Unauthenticated("Token no proporcionado".to_string());

    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(missing)?
        .to_str()
        .map_err(|_| AppError::Unauthenticated("Token inválido".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(missing()),
    }
}

// Todo handler que recibe `Session` exige un token válido; sin él responde 401
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!("Auth: {} {} sin credencial válida.", parts.method, parts.uri.path());
                return Err(e);
            }
        };

        let session = auth_service::resolve_session(&state.db_pool, &state.jwt, token).await?;
        tracing::debug!(
            "Auth: usuario {} ({}) autenticado para {} {}",
            session.user_id,
            session.role,
            parts.method,
            parts.uri.path()
        );
        Ok(session)
    }
}
