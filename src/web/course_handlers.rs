// src/web/course_handlers.rs
use crate::{
    error::AppResult,
    models::{
        course::{parse_course_id, Course, CourseDetail, CoursePayload},
        syllabus::{PublishSyllabusPayload, Syllabus},
        user::Session,
    },
    services::{catalog_service, syllabus_service},
    state::AppState,
    web::extract::{ApiJson, ApiPath},
};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CourseMessage {
    pub message: String,
    pub course: Course,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

// GET /courses
pub async fn handle_list_courses(State(state): State<AppState>) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(catalog_service::list_courses(&state.db_pool).await?))
}

// GET /courses/{id}
pub async fn handle_get_course(
    State(state): State<AppState>,
    ApiPath(raw_id): ApiPath<String>,
) -> AppResult<Json<CourseDetail>> {
    let id = parse_course_id(&raw_id)?;
    Ok(Json(catalog_service::fetch_course(&state.db_pool, id).await?))
}

// GET /courses/coordinador
pub async fn handle_coordinated_courses(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(
        catalog_service::list_coordinated_courses(&state.db_pool, &session).await?,
    ))
}

// POST /courses
pub async fn handle_create_course(
    State(state): State<AppState>,
    session: Session,
    ApiJson(payload): ApiJson<CoursePayload>,
) -> AppResult<(StatusCode, Json<CourseMessage>)> {
    let course = catalog_service::create_course(&state.db_pool, &session, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CourseMessage {
            message: "Curso creado correctamente".to_string(),
            course,
        }),
    ))
}

// PUT /courses/{id}
pub async fn handle_update_course(
    State(state): State<AppState>,
    session: Session,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(payload): ApiJson<CoursePayload>,
) -> AppResult<Json<CourseMessage>> {
    let id = parse_course_id(&raw_id)?;
    let course = catalog_service::update_course(&state.db_pool, &session, id, &payload).await?;
    Ok(Json(CourseMessage {
        message: "Curso actualizado correctamente".to_string(),
        course,
    }))
}

// DELETE /courses/{id}
pub async fn handle_delete_course(
    State(state): State<AppState>,
    session: Session,
    ApiPath(raw_id): ApiPath<String>,
) -> AppResult<Json<Message>> {
    let id = parse_course_id(&raw_id)?;
    catalog_service::delete_course(&state.db_pool, &session, id).await?;
    Ok(Json(Message {
        message: "Curso eliminado correctamente".to_string(),
    }))
}

// POST /courses/{id}/syllabus
pub async fn handle_publish_syllabus(
    State(state): State<AppState>,
    session: Session,
    ApiPath(raw_id): ApiPath<String>,
    ApiJson(payload): ApiJson<PublishSyllabusPayload>,
) -> AppResult<(StatusCode, Json<Syllabus>)> {
    let id = parse_course_id(&raw_id)?;
    let syllabus = syllabus_service::publish(&state.db_pool, &session, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(syllabus)))
}
