// src/services/syllabus_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        course::{Course, COURSE_COLUMNS},
        role::Role,
        syllabus::{PublishSyllabusPayload, Syllabus, SyllabusFilter},
        user::Session,
    },
    services::access_service::{self, Operation},
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

const SYLLABUS_COLUMNS: &str =
    "id, course_id, codigo, nombre, plan_estudios, ciclo, creditos, pdf_url";

/// Búsqueda con filtros opcionales combinados con AND.
/// `codigo` y `nombre` son subcadenas sin distinguir mayúsculas; `plan` y `ciclo` son exactos.
pub async fn search(
    db_pool: &SqlitePool,
    session: &Session,
    filter: &SyllabusFilter,
) -> AppResult<Vec<Syllabus>> {
    access_service::authorize(session, Operation::SearchSyllabus)?;

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {SYLLABUS_COLUMNS} FROM syllabi WHERE 1 = 1"));

    if let Some(codigo) = filter.codigo() {
        query.push(" AND codigo LIKE ").push_bind(like_pattern(codigo)).push(" ESCAPE '\\'");
    }
    if let Some(nombre) = filter.nombre() {
        query.push(" AND nombre LIKE ").push_bind(like_pattern(nombre)).push(" ESCAPE '\\'");
    }
    if let Some(plan) = filter.plan() {
        query.push(" AND plan_estudios = ").push_bind(plan.to_string());
    }
    if let Some(ciclo) = filter.ciclo() {
        query.push(" AND ciclo = ").push_bind(ciclo.to_string());
    }
    query.push(" ORDER BY codigo ASC, plan_estudios ASC");

    let results = query.build_query_as::<Syllabus>().fetch_all(db_pool).await?;
    tracing::debug!("Búsqueda de syllabus {:?}: {} resultados.", filter, results.len());
    Ok(results)
}

// `%` y `_` del usuario se buscan literalmente
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Publica (o vuelve a publicar) la proyección de un curso para un plan de estudios.
pub async fn publish(
    db_pool: &SqlitePool,
    session: &Session,
    course_id: i64,
    payload: &PublishSyllabusPayload,
) -> AppResult<Syllabus> {
    access_service::authorize(session, Operation::PublishSyllabus)?;

    let plan = payload.plan.trim();
    if plan.is_empty() {
        return Err(AppError::InvalidArgument("El plan de estudios es obligatorio".into()));
    }

    let pdf_url = payload
        .pdf_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    // Un coordinador sólo puede publicar los cursos que coordina
    let required_coordinator = (session.role == Role::Coordinador).then_some(session.user_id);

    let mut tx = db_pool.begin().await?;

    // La primera sentencia escribe, así la espera del bloqueo queda bajo `busy_timeout`
    let published = sqlx::query_as::<_, Syllabus>(&format!(
        r#"
        INSERT INTO syllabi (course_id, codigo, nombre, plan_estudios, ciclo, creditos, pdf_url)
        SELECT id, code, name, ?2, cycle, credits, ?3
        FROM courses
        WHERE id = ?1
          AND code IS NOT NULL AND name IS NOT NULL
          AND (?4 IS NULL OR coordinador_id = ?4)
        ON CONFLICT (course_id, plan_estudios) DO UPDATE SET
            codigo = excluded.codigo,
            nombre = excluded.nombre,
            ciclo = excluded.ciclo,
            creditos = excluded.creditos,
            pdf_url = excluded.pdf_url,
            published_at = CURRENT_TIMESTAMP
        RETURNING {SYLLABUS_COLUMNS}
        "#
    ))
    .bind(course_id)
    .bind(plan)
    .bind(pdf_url)
    .bind(required_coordinator)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(syllabus) = published else {
        // Sin fila insertada: se explica el motivo y `tx` se descarta sin cambios
        return Err(rejection_reason(&mut tx, session, course_id).await?);
    };

    tx.commit().await?;
    tracing::info!(
        "✅ Syllabus {} ({}) publicado para el curso {} por {}.",
        syllabus.codigo,
        syllabus.plan_estudios,
        course_id,
        session.user_id
    );
    Ok(syllabus)
}

async fn rejection_reason(
    tx: &mut Transaction<'_, Sqlite>,
    session: &Session,
    course_id: i64,
) -> AppResult<AppError> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"
    ))
    .bind(course_id)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(course) = course else {
        return Ok(AppError::NotFound("Curso no encontrado".into()));
    };

    if session.role == Role::Coordinador && course.coordinador_id != Some(session.user_id) {
        tracing::warn!(
            "Coordinador {} intentó publicar el curso {} que no coordina.",
            session.user_id,
            course_id
        );
        return Ok(AppError::Unauthorized);
    }

    Ok(AppError::InvalidArgument(
        "El curso necesita código y nombre para publicar su syllabus".into(),
    ))
}
