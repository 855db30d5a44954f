// src/services/access_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{role::Role, user::Session},
};

/// Operaciones que exigen una sesión. Las lecturas del catálogo son públicas y no aparecen aquí.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateCourse,
    UpdateCourse,
    DeleteCourse,
    ListCoordinatedCourses,
    PublishSyllabus,
    SearchSyllabus,
    ListUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,
}

const DIRECTOR_ONLY: &[Role] = &[Role::Director];

/// Tabla de capacidades: operación -> roles que la pueden ejecutar.
pub fn allowed_roles(op: Operation) -> &'static [Role] {
    match op {
        Operation::CreateCourse
        | Operation::UpdateCourse
        | Operation::DeleteCourse
        | Operation::ListUsers
        | Operation::CreateUser
        | Operation::UpdateUser
        | Operation::DeleteUser => DIRECTOR_ONLY,
        Operation::ListCoordinatedCourses => &[Role::Coordinador],
        // El coordinador sólo puede publicar sus propios cursos (se comprueba en syllabus_service)
        Operation::PublishSyllabus => &[Role::Director, Role::Coordinador],
        Operation::SearchSyllabus => &Role::ALL,
    }
}

pub fn is_allowed(role: Role, op: Operation) -> bool {
    allowed_roles(op).contains(&role)
}

pub fn authorize(session: &Session, op: Operation) -> AppResult<()> {
    if is_allowed(session.role, op) {
        tracing::debug!("Acceso {:?} concedido a {} ({})", op, session.user_id, session.role);
        Ok(())
    } else {
        tracing::warn!(
            "Acceso {:?} denegado a {} (rol {}).",
            op,
            session.user_id,
            session.role
        );
        Err(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            user_id: 1,
            name: "Prueba".into(),
            email: "prueba@uni.edu".into(),
            role,
        }
    }

    #[test]
    fn only_director_mutates_catalog() {
        for op in [
            Operation::CreateCourse,
            Operation::UpdateCourse,
            Operation::DeleteCourse,
        ] {
            assert!(authorize(&session(Role::Director), op).is_ok());
            for role in [Role::Coordinador, Role::Docente, Role::Estudiante] {
                assert!(matches!(
                    authorize(&session(role), op),
                    Err(AppError::Unauthorized)
                ));
            }
        }
    }

    #[test]
    fn every_role_can_search() {
        for role in Role::ALL {
            assert!(is_allowed(role, Operation::SearchSyllabus));
        }
    }

    #[test]
    fn coordinated_courses_are_for_coordinators() {
        assert!(is_allowed(Role::Coordinador, Operation::ListCoordinatedCourses));
        assert!(!is_allowed(Role::Docente, Operation::ListCoordinatedCourses));
        assert!(!is_allowed(Role::Estudiante, Operation::PublishSyllabus));
    }
}
