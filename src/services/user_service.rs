// src/services/user_service.rs
use crate::{
    config::BootstrapDirector,
    error::{AppError, AppResult},
    models::{
        role::Role,
        user::{CreateUserPayload, Session, UpdateUserPayload, User},
    },
    services::{
        access_service::{self, Operation},
        auth_service,
    },
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const USER_COLUMNS: &str = "id, name, email, password_hash, role";

pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: i64) -> AppResult<Option<User>> {
    tracing::debug!("Buscando usuario por ID: {}", user_id);
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
    ))
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?;
    Ok(user)
}

/// La columna `email` tiene COLLATE NOCASE: la búsqueda no distingue mayúsculas.
pub async fn find_user_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
    ))
    .bind(email.trim())
    .fetch_optional(db_pool)
    .await?;
    Ok(user)
}

/// Lista usuarios; `roles` es la lista separada por comas de `?roles=` (vacía = todos).
pub async fn list_users(
    db_pool: &SqlitePool,
    session: &Session,
    roles: Option<&str>,
) -> AppResult<Vec<User>> {
    access_service::authorize(session, Operation::ListUsers)?;
    let roles = match roles {
        Some(raw) => Role::parse_list(raw).map_err(|e| AppError::InvalidArgument(e.to_string()))?,
        None => Vec::new(),
    };

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));

    if !roles.is_empty() {
        query.push(" WHERE role IN (");
        let mut separated = query.separated(", ");
        for role in &roles {
            separated.push_bind(role.as_str());
        }
        separated.push_unseparated(")");
    }
    query.push(" ORDER BY name ASC, id ASC");

    let users = query.build_query_as::<User>().fetch_all(db_pool).await?;
    tracing::debug!("Encontrados {} usuarios (roles {:?}).", users.len(), roles);
    Ok(users)
}

fn validate_user_fields(name: &str, email: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidArgument("El nombre es obligatorio".into()));
    }
    if !email.contains('@') || email.trim().len() < 3 {
        return Err(AppError::InvalidArgument("Correo inválido".into()));
    }
    Ok(())
}

pub async fn create_user(
    db_pool: &SqlitePool,
    session: &Session,
    payload: &CreateUserPayload,
) -> AppResult<User> {
    access_service::authorize(session, Operation::CreateUser)?;
    insert_user(
        db_pool,
        &payload.name,
        &payload.email,
        &payload.password,
        payload.role,
    )
    .await
}

/// Inserta el usuario sin comprobar permisos (arranque y fixtures).
pub async fn insert_user(
    db_pool: &SqlitePool,
    name: &str,
    email: &str,
    raw_password: &str,
    role: Role,
) -> AppResult<User> {
    validate_user_fields(name, email)?;
    if raw_password.len() < 4 {
        return Err(AppError::InvalidArgument(
            "La contraseña debe tener al menos 4 caracteres".into(),
        ));
    }

    tracing::info!("Creando usuario {} ({})", email, role);
    let password_hash = auth_service::hash_password(raw_password).await?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(name.trim())
    .bind(email.trim())
    .bind(&password_hash)
    .bind(role.as_str())
    .fetch_one(db_pool)
    .await
    .map_err(|e| AppError::from_write(e, "Correo ya registrado"))?;

    tracing::info!("✅ Usuario {} creado con ID {}.", user.email, user.id);
    Ok(user)
}

pub async fn update_user(
    db_pool: &SqlitePool,
    session: &Session,
    user_id: i64,
    payload: &UpdateUserPayload,
) -> AppResult<User> {
    access_service::authorize(session, Operation::UpdateUser)?;
    let (name, email, role) = (payload.name.as_str(), payload.email.as_str(), payload.role);
    validate_user_fields(name, email)?;
    // Sólo un DIRECTOR llega aquí, así que mientras no se degrade a sí mismo siempre queda uno
    if session.user_id == user_id && role != Role::Director {
        return Err(AppError::InvalidArgument(
            "No puede quitarse a sí mismo el rol DIRECTOR".into(),
        ));
    }
    tracing::info!("Actualizando datos del usuario {}", user_id);

    // El trigger 'trigger_users_updated_at' actualiza 'updated_at'
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = ?1, email = ?2, role = ?3 WHERE id = ?4 RETURNING {USER_COLUMNS}"
    ))
    .bind(name.trim())
    .bind(email.trim())
    .bind(role.as_str())
    .bind(user_id)
    .fetch_optional(db_pool)
    .await
    .map_err(|e| AppError::from_write(e, "Correo ya registrado"))?;

    user.ok_or_else(|| {
        tracing::warn!("No se pudo actualizar: usuario {} no encontrado.", user_id);
        AppError::NotFound("Usuario no encontrado".into())
    })
}

/// Elimina un usuario junto con sus asignaciones docentes; los cursos que coordinaba
/// quedan sin coordinador. Todo en una sola transacción.
pub async fn delete_user(db_pool: &SqlitePool, session: &Session, user_id: i64) -> AppResult<()> {
    access_service::authorize(session, Operation::DeleteUser)?;
    if session.user_id == user_id {
        return Err(AppError::InvalidArgument(
            "No puede eliminar su propio usuario".into(),
        ));
    }

    let mut tx = db_pool.begin().await?;

    sqlx::query("DELETE FROM curso_docentes WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE courses SET coordinador_id = NULL WHERE coordinador_id = ?1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let rows_affected = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("No se pudo eliminar: usuario {} no encontrado.", user_id);
        tx.rollback().await?;
        return Err(AppError::NotFound("Usuario no encontrado".into()));
    }

    tx.commit().await?;
    tracing::info!("✅ Usuario {} eliminado por {}.", user_id, session.user_id);
    Ok(())
}

/// Crea el primer DIRECTOR si la base aún no tiene ninguno.
pub async fn ensure_bootstrap_director(
    db_pool: &SqlitePool,
    bootstrap: &BootstrapDirector,
) -> AppResult<bool> {
    let directors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?1")
        .bind(Role::Director.as_str())
        .fetch_one(db_pool)
        .await?;

    if directors > 0 {
        tracing::debug!("Ya existe(n) {} director(es); no se crea ninguno.", directors);
        return Ok(false);
    }

    insert_user(
        db_pool,
        &bootstrap.name,
        &bootstrap.email,
        &bootstrap.password,
        Role::Director,
    )
    .await?;
    tracing::info!("🔑 Director inicial {} creado.", bootstrap.email);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn director_session(user: &User) -> Session {
        Session::from(user.clone())
    }

    fn update(name: &str, email: &str, role: Role) -> UpdateUserPayload {
        UpdateUserPayload {
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    #[tokio::test]
    async fn list_users_filters_by_role() {
        let pool = test_pool().await;
        insert_user(&pool, "Director", "dir@uni.edu", "clave", Role::Director).await.unwrap();
        insert_user(&pool, "Beatriz", "bea@uni.edu", "clave", Role::Docente).await.unwrap();
        insert_user(&pool, "Carlos", "car@uni.edu", "clave", Role::Coordinador).await.unwrap();
        insert_user(&pool, "Diana", "dia@uni.edu", "clave", Role::Estudiante).await.unwrap();

        let director = director_session(&find_user_by_email(&pool, "dir@uni.edu").await.unwrap().unwrap());

        let all = list_users(&pool, &director, None).await.unwrap();
        assert_eq!(all.len(), 4);

        let staff = list_users(&pool, &director, Some("docente, COORDINADOR")).await.unwrap();
        let names: Vec<_> = staff.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Beatriz", "Carlos"]);

        assert!(matches!(
            list_users(&pool, &director, Some("RECTOR")).await,
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_constraint_violation() {
        let pool = test_pool().await;
        insert_user(&pool, "Ana", "ana@uni.edu", "clave", Role::Docente).await.unwrap();
        let err = insert_user(&pool, "Otra Ana", "ANA@uni.edu", "clave", Role::Docente)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let pool = test_pool().await;
        let director = insert_user(&pool, "Dir", "dir@uni.edu", "clave", Role::Director)
            .await
            .unwrap();
        let err = update_user(&pool, &director_session(&director), 42, &update("X", "x@uni.edu", Role::Docente))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn director_cannot_demote_themselves() {
        let pool = test_pool().await;
        let director = insert_user(&pool, "Dir", "dir@uni.edu", "clave", Role::Director)
            .await
            .unwrap();
        let session = director_session(&director);

        let err = update_user(&pool, &session, director.id, &update("Dir", "dir@uni.edu", Role::Docente))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        let stored = find_user_by_id(&pool, director.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Director);

        // Cambiar sus propios datos sin tocar el rol sí está permitido
        let renamed = update_user(&pool, &session, director.id, &update("Directora", "dir@uni.edu", Role::Director))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Directora");
    }

    #[tokio::test]
    async fn roster_writes_require_director() {
        let pool = test_pool().await;
        let docente = insert_user(&pool, "Doc", "doc@uni.edu", "clave", Role::Docente)
            .await
            .unwrap();
        let session = Session::from(docente.clone());

        let new_user = CreateUserPayload {
            name: "Nuevo".into(),
            email: "nuevo@uni.edu".into(),
            password: "clave".into(),
            role: Role::Director,
        };
        assert!(matches!(
            create_user(&pool, &session, &new_user).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            update_user(&pool, &session, docente.id, &update("Doc", "doc@uni.edu", Role::Director)).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            list_users(&pool, &session, None).await,
            Err(AppError::Unauthorized)
        ));
        assert!(find_user_by_email(&pool, "nuevo@uni.edu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_user_clears_assignments_and_coordination() {
        let pool = test_pool().await;
        let director = insert_user(&pool, "Dir", "dir@uni.edu", "clave", Role::Director)
            .await
            .unwrap();
        let docente = insert_user(&pool, "Doc", "doc@uni.edu", "clave", Role::Coordinador)
            .await
            .unwrap();

        let course_id: i64 = sqlx::query_scalar(
            "INSERT INTO courses (name, code, coordinador_id) VALUES ('Física', 'FI101', ?1) RETURNING id",
        )
        .bind(docente.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO curso_docentes (course_id, user_id) VALUES (?1, ?2)")
            .bind(course_id)
            .bind(docente.id)
            .execute(&pool)
            .await
            .unwrap();

        delete_user(&pool, &director_session(&director), docente.id).await.unwrap();

        let assignments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM curso_docentes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(assignments, 0);
        let coordinator: Option<i64> =
            sqlx::query_scalar("SELECT coordinador_id FROM courses WHERE id = ?1")
                .bind(course_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(coordinator, None);

        let err = delete_user(&pool, &director_session(&director), docente.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_director_cannot_delete_users() {
        let pool = test_pool().await;
        let docente = insert_user(&pool, "Doc", "doc@uni.edu", "clave", Role::Docente)
            .await
            .unwrap();
        let other = insert_user(&pool, "Otro", "otro@uni.edu", "clave", Role::Docente)
            .await
            .unwrap();

        let err = delete_user(&pool, &Session::from(docente), other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert!(find_user_by_id(&pool, other.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn bootstrap_creates_director_once() {
        let pool = test_pool().await;
        let bootstrap = BootstrapDirector {
            name: "Director".into(),
            email: "director@uni.edu".into(),
            password: "inicial".into(),
        };
        assert!(ensure_bootstrap_director(&pool, &bootstrap).await.unwrap());
        assert!(!ensure_bootstrap_director(&pool, &bootstrap).await.unwrap());
        let directors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'DIRECTOR'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(directors, 1);
    }
}
