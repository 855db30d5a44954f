// src/services/catalog_service.rs
//
// Cursos y sus dos relaciones dependientes (docentes asignados y prerrequisitos).
// Cada escritura corre en una sola transacción: o se aplica el curso con ambas
// relaciones completas, o no se aplica nada.
use crate::{
    error::{AppError, AppResult},
    models::{
        course::{Course, CourseDetail, CoursePayload, NormalizedCourse, PrerequisiteEdge, COURSE_COLUMNS},
        user::{Session, User, UserSummary},
    },
    services::access_service::{self, Operation},
};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

const COURSE_NOT_FOUND: &str = "Curso no encontrado";

// --- Lecturas ---

async fn load_course(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Course>> {
    let course = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(course)
}

/// Curso con coordinador, docentes y prerrequisitos.
///
/// Las tres lecturas comparten una transacción, así que nunca se observa
/// un conjunto de relaciones a medio reemplazar.
pub async fn fetch_course(db_pool: &SqlitePool, id: i64) -> AppResult<CourseDetail> {
    tracing::debug!("Buscando curso {}", id);
    let mut tx = db_pool.begin().await?;

    let course = load_course(&mut tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound(COURSE_NOT_FOUND.to_string()))?;

    let coordinador = match course.coordinador_id {
        Some(user_id) => sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, role FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(UserSummary::from),
        None => None,
    };

    let docentes = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.name, u.email, u.password_hash, u.role
        FROM curso_docentes cd
        JOIN users u ON u.id = cd.user_id
        WHERE cd.course_id = ?1
        ORDER BY u.name ASC, u.id ASC
        "#,
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(UserSummary::from)
    .collect();

    let prerequisites = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses \
         WHERE id IN (SELECT prerequisite_id FROM prerequisites WHERE course_id = ?1) \
         ORDER BY code ASC, id ASC"
    ))
    .bind(id)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|prerequisite| PrerequisiteEdge {
        course_id: id,
        prerequisite_id: prerequisite.id,
        prerequisite,
    })
    .collect();

    tx.commit().await?;

    Ok(CourseDetail {
        course,
        coordinador,
        docentes,
        prerequisites,
    })
}

pub async fn list_courses(db_pool: &SqlitePool) -> AppResult<Vec<Course>> {
    let courses = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses ORDER BY code ASC, id ASC"
    ))
    .fetch_all(db_pool)
    .await?;
    tracing::debug!("Encontrados {} cursos.", courses.len());
    Ok(courses)
}

/// Cursos cuyo coordinador es el usuario de la sesión.
pub async fn list_coordinated_courses(
    db_pool: &SqlitePool,
    session: &Session,
) -> AppResult<Vec<Course>> {
    access_service::authorize(session, Operation::ListCoordinatedCourses)?;
    let courses = sqlx::query_as::<_, Course>(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses WHERE coordinador_id = ?1 ORDER BY code ASC, id ASC"
    ))
    .bind(session.user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(courses)
}

// --- Reconciliación de relaciones ---

/// Reemplaza (no combina) los docentes del curso por `teacher_ids`.
async fn replace_teachers(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
    teacher_ids: &[i64],
) -> AppResult<()> {
    tracing::debug!("Reemplazando docentes del curso {}: {:?}", course_id, teacher_ids);
    sqlx::query("DELETE FROM curso_docentes WHERE course_id = ?1")
        .bind(course_id)
        .execute(&mut **tx)
        .await?;

    for &user_id in teacher_ids {
        sqlx::query("INSERT INTO curso_docentes (course_id, user_id) VALUES (?1, ?2)")
            .bind(course_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Docente {user_id}")))?;
    }
    Ok(())
}

/// Reemplaza los prerrequisitos del curso y rechaza autorreferencias y ciclos.
async fn replace_prerequisites(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
    prerequisite_ids: &[i64],
) -> AppResult<()> {
    tracing::debug!(
        "Reemplazando prerrequisitos del curso {}: {:?}",
        course_id,
        prerequisite_ids
    );
    if prerequisite_ids.contains(&course_id) {
        return Err(AppError::InvalidArgument(
            "Un curso no puede ser prerrequisito de sí mismo".to_string(),
        ));
    }

    sqlx::query("DELETE FROM prerequisites WHERE course_id = ?1")
        .bind(course_id)
        .execute(&mut **tx)
        .await?;

    for &prerequisite_id in prerequisite_ids {
        sqlx::query("INSERT INTO prerequisites (course_id, prerequisite_id) VALUES (?1, ?2)")
            .bind(course_id)
            .bind(prerequisite_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::from_write(e, &format!("Prerrequisito {prerequisite_id}")))?;
    }

    if !prerequisite_ids.is_empty() && reaches_itself(tx, course_id).await? {
        tracing::warn!("Ciclo de prerrequisitos detectado en el curso {}", course_id);
        return Err(AppError::InvalidArgument(
            "Los prerrequisitos forman un ciclo".to_string(),
        ));
    }
    Ok(())
}

/// ¿Se puede volver a `course_id` siguiendo aristas de prerrequisito desde él?
async fn reaches_itself(tx: &mut Transaction<'_, Sqlite>, course_id: i64) -> AppResult<bool> {
    // UNION (sin ALL) descarta repetidos, así que la recursión termina aun con ciclos
    let found: i64 = sqlx::query_scalar(
        r#"
        WITH RECURSIVE reachable(id) AS (
            SELECT prerequisite_id FROM prerequisites WHERE course_id = ?1
            UNION
            SELECT p.prerequisite_id
            FROM prerequisites p
            JOIN reachable r ON p.course_id = r.id
        )
        SELECT EXISTS (SELECT 1 FROM reachable WHERE id = ?1)
        "#,
    )
    .bind(course_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(found != 0)
}

async fn replace_relations(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
    normalized: &NormalizedCourse,
) -> AppResult<()> {
    replace_teachers(tx, course_id, &normalized.teacher_ids).await?;
    replace_prerequisites(tx, course_id, &normalized.prerequisite_ids).await
}

// --- Escrituras ---

pub async fn create_course(
    db_pool: &SqlitePool,
    session: &Session,
    payload: &CoursePayload,
) -> AppResult<Course> {
    access_service::authorize(session, Operation::CreateCourse)?;
    let normalized = payload.normalize()?;

    let mut tx = db_pool.begin().await?;

    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        INSERT INTO courses (
            name, code, type, area, weeks, semester, cycle, credits, modality,
            theory_hours, practice_hours, lab_hours, group_label, sumilla, coordinador_id
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(&payload.name)
    .bind(&payload.code)
    .bind(&payload.course_type)
    .bind(&payload.area)
    .bind(payload.weeks)
    .bind(&payload.semester)
    .bind(&payload.cycle)
    .bind(payload.credits)
    .bind(&payload.modality)
    .bind(payload.theory_hours)
    .bind(payload.practice_hours)
    .bind(payload.lab_hours)
    .bind(&payload.group)
    .bind(&payload.sumilla)
    .bind(normalized.coordinador_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "Coordinador"))?;

    replace_relations(&mut tx, course.id, &normalized).await?;

    tx.commit().await?;
    tracing::info!("✅ Curso {} creado por {}.", course.id, session.user_id);
    Ok(course)
}

/// Reemplazo completo del curso `id` y de sus dos relaciones.
pub async fn update_course(
    db_pool: &SqlitePool,
    session: &Session,
    id: i64,
    payload: &CoursePayload,
) -> AppResult<Course> {
    access_service::authorize(session, Operation::UpdateCourse)?;
    let normalized = payload.normalize()?;

    // Si algo falla antes del commit, `tx` se descarta y SQLite revierte todo
    let mut tx = db_pool.begin().await?;

    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        UPDATE courses SET
            name = ?1, code = ?2, type = ?3, area = ?4, weeks = ?5, semester = ?6,
            cycle = ?7, credits = ?8, modality = ?9, theory_hours = ?10,
            practice_hours = ?11, lab_hours = ?12, group_label = ?13, sumilla = ?14,
            coordinador_id = ?15
        WHERE id = ?16
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(&payload.name)
    .bind(&payload.code)
    .bind(&payload.course_type)
    .bind(&payload.area)
    .bind(payload.weeks)
    .bind(&payload.semester)
    .bind(&payload.cycle)
    .bind(payload.credits)
    .bind(&payload.modality)
    .bind(payload.theory_hours)
    .bind(payload.practice_hours)
    .bind(payload.lab_hours)
    .bind(&payload.group)
    .bind(&payload.sumilla)
    .bind(normalized.coordinador_id)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "Coordinador"))?
    .ok_or_else(|| {
        tracing::warn!("No se pudo actualizar: curso {} no encontrado.", id);
        AppError::NotFound(COURSE_NOT_FOUND.to_string())
    })?;

    replace_relations(&mut tx, id, &normalized).await?;

    tx.commit().await?;
    tracing::info!("✅ Curso {} actualizado por {}.", id, session.user_id);
    Ok(course)
}

/// Elimina el curso, sus docentes, sus prerrequisitos y las aristas donde
/// otros cursos lo tenían como prerrequisito.
pub async fn delete_course(db_pool: &SqlitePool, session: &Session, id: i64) -> AppResult<()> {
    access_service::authorize(session, Operation::DeleteCourse)?;

    let mut tx = db_pool.begin().await?;

    sqlx::query("DELETE FROM curso_docentes WHERE course_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM prerequisites WHERE course_id = ?1 OR prerequisite_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let rows_affected = sqlx::query("DELETE FROM courses WHERE id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("No se pudo eliminar: curso {} no encontrado.", id);
        tx.rollback().await?;
        return Err(AppError::NotFound(COURSE_NOT_FOUND.to_string()));
    }

    tx.commit().await?;
    tracing::info!("✅ Curso {} eliminado por {}.", id, session.user_id);
    Ok(())
}
