// src/web/syllabus_handlers.rs
use crate::{
    error::AppResult,
    models::{
        syllabus::{Syllabus, SyllabusFilter},
        user::Session,
    },
    services::syllabus_service,
    state::AppState,
    web::extract::ApiQuery,
};
use axum::{extract::State, Json};

// GET /syllabus?codigo=&nombre=&plan=&ciclo=
pub async fn handle_search(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(filter): ApiQuery<SyllabusFilter>,
) -> AppResult<Json<Vec<Syllabus>>> {
    Ok(Json(
        syllabus_service::search(&state.db_pool, &session, &filter).await?,
    ))
}
