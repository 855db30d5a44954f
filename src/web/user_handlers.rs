// src/web/user_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUserPayload, Session, UpdateUserPayload, UserSummary},
    services::user_service,
    state::AppState,
    web::{
        course_handlers::Message,
        extract::{ApiJson, ApiPath, ApiQuery},
    },
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub roles: Option<String>,
}

fn parse_user_id(raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidArgument("ID inválido".to_string())),
    }
}

// GET /users?roles=DOCENTE,COORDINADOR
pub async fn handle_list_users(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(params): ApiQuery<ListUsersParams>,
) -> AppResult<Json<Vec<UserSummary>>> {
    let users =
        user_service::list_users(&state.db_pool, &session, params.roles.as_deref()).await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

// POST /users
pub async fn handle_create_user(
    State(state): State<AppState>,
    session: Session,
    ApiJson(payload): ApiJson<CreateUserPayload>,
) -> AppResult<(StatusCode, Json<UserSummary>)> {
    let user = user_service::create_user(&state.db_pool, &session, &payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

// PUT /users/{id}
pub async fn handle_update_user(
    State(state): State<AppState>,
    session: Session,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateUserPayload>,
) -> AppResult<Json<UserSummary>> {
    let id = parse_user_id(&raw_id)?;
    let user = user_service::update_user(&state.db_pool, &session, id, &payload).await?;
    Ok(Json(user.into()))
}

// DELETE /users/{id}
pub async fn handle_delete_user(
    State(state): State<AppState>,
    session: Session,
    ApiPath(raw_id): ApiPath<String>,
) -> AppResult<Json<Message>> {
    let id = parse_user_id(&raw_id)?;
    user_service::delete_user(&state.db_pool, &session, id).await?;
    Ok(Json(Message {
        message: "Usuario eliminado correctamente".to_string(),
    }))
}
