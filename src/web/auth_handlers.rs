// src/web/auth_handlers.rs
use crate::{
    error::AppResult,
    models::user::{LoginPayload, Session, UserSummary},
    services::auth_service,
    state::AppState,
    web::extract::ApiJson,
};
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> AppResult<Json<LoginResponse>> {
    tracing::info!("Intento de login para: {}", payload.email);
    let (token, user) =
        auth_service::login(&state.db_pool, &state.jwt, &payload.email, &payload.password).await?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

// GET /auth/me: datos de la sesión para mostrar en el cliente
pub async fn handle_me(session: Session) -> Json<Session> {
    Json(session)
}
