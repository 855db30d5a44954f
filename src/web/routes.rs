// src/web/routes.rs
use crate::{
    state::AppState,
    web::{auth_handlers, course_handlers, syllabus_handlers, user_handlers},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // Los handlers que extraen `Session` exigen token; el resto es público.
    // DIRECTOR / COORDINADOR se comprueban en access_service.
    let auth_routes = Router::new()
        .route("/login", post(auth_handlers::handle_login))
        .route("/me", get(auth_handlers::handle_me));

    let course_routes = Router::new()
        .route(
            "/",
            get(course_handlers::handle_list_courses).post(course_handlers::handle_create_course),
        )
        // Ruta estática: tiene prioridad sobre `/{id}`
        .route("/coordinador", get(course_handlers::handle_coordinated_courses))
        .route(
            "/{id}",
            get(course_handlers::handle_get_course)
                .put(course_handlers::handle_update_course)
                .delete(course_handlers::handle_delete_course),
        )
        .route("/{id}/syllabus", post(course_handlers::handle_publish_syllabus));

    let user_routes = Router::new()
        .route(
            "/",
            get(user_handlers::handle_list_users).post(user_handlers::handle_create_user),
        )
        .route(
            "/{id}",
            put(user_handlers::handle_update_user).delete(user_handlers::handle_delete_user),
        );

    Router::new()
        .route("/health", get(health))
        .route("/syllabus", get(syllabus_handlers::handle_search))
        .nest("/auth", auth_routes)
        .nest("/courses", course_routes)
        .nest("/users", user_routes)
        .with_state(app_state)
}

async fn health(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::error!("Health check falló: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        db::test_pool,
        models::role::Role,
        services::{auth_service, user_service},
    };
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: AppState,
    }

    impl TestApp {
        async fn new() -> Self {
            let state = AppState {
                db_pool: test_pool().await,
                jwt: JwtConfig::new("clave-solo-para-tests-de-integracion"),
            };
            Self {
                router: create_router(state.clone()),
                state,
            }
        }

        async fn token_for(&self, role: Role, email: &str) -> (i64, String) {
            let user = user_service::insert_user(&self.state.db_pool, "Usuario", email, "clave", role)
                .await
                .unwrap();
            let token = auth_service::create_token(&user, &self.state.jwt).unwrap();
            (user.id, token)
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }
    }

    #[tokio::test]
    async fn get_course_with_invalid_id_is_400() {
        let app = TestApp::new().await;
        let (status, body) = app.send(Method::GET, "/courses/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "ID inválido" }));
    }

    #[tokio::test]
    async fn get_missing_course_is_404() {
        let app = TestApp::new().await;
        let (status, body) = app.send(Method::GET, "/courses/999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Curso no encontrado" }));
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let app = TestApp::new().await;
        let (status, body) = app
            .send(Method::PUT, "/courses/1", None, Some(json!({ "name": "X" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Token no proporcionado");

        let (status, body) = app.send(Method::DELETE, "/courses/1", Some("basura"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Token inválido");
    }

    #[tokio::test]
    async fn non_director_gets_403() {
        let app = TestApp::new().await;
        let (_, docente) = app.token_for(Role::Docente, "doc@uni.edu").await;
        let (status, body) = app
            .send(Method::PUT, "/courses/1", Some(&docente), Some(json!({ "name": "X" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "No autorizado");

        let (status, _) = app.send(Method::DELETE, "/courses/1", Some(&docente), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn director_course_lifecycle() {
        let app = TestApp::new().await;
        let (_, director) = app.token_for(Role::Director, "dir@uni.edu").await;
        let (teacher_id, _) = app.token_for(Role::Docente, "doc@uni.edu").await;

        let (status, created) = app
            .send(
                Method::POST,
                "/courses",
                Some(&director),
                Some(json!({ "name": "Base", "code": "BA100" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let base_id = created["course"]["id"].as_i64().unwrap();

        let (status, created) = app
            .send(
                Method::POST,
                "/courses",
                Some(&director),
                Some(json!({ "name": "Avanzado", "code": "AV200" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["course"]["id"].as_i64().unwrap();

        let (status, updated) = app
            .send(
                Method::PUT,
                &format!("/courses/{id}"),
                Some(&director),
                Some(json!({
                    "name": "Avanzado II",
                    "code": "AV201",
                    "theoryHours": "bad",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{updated}");

        let (status, updated) = app
            .send(
                Method::PUT,
                &format!("/courses/{id}"),
                Some(&director),
                Some(json!({
                    "name": "Avanzado II",
                    "code": "AV201",
                    "theoryHours": 3,
                    "docentes": [teacher_id.to_string()],
                    "prerrequisitos": [base_id],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["message"], "Curso actualizado correctamente");
        assert_eq!(updated["course"]["code"], "AV201");

        let (status, detail) = app.send(Method::GET, &format!("/courses/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["name"], "Avanzado II");
        assert_eq!(detail["theoryHours"], 3);
        assert_eq!(detail["docentes"][0]["id"], teacher_id);
        assert!(detail["docentes"][0].get("password_hash").is_none());
        assert_eq!(detail["prerequisites"][0]["prerequisiteId"], base_id);
        assert_eq!(detail["prerequisites"][0]["prerequisite"]["code"], "BA100");

        let (status, body) = app
            .send(Method::DELETE, &format!("/courses/{id}"), Some(&director), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Curso eliminado correctamente");

        let (status, _) = app.send(Method::GET, &format!("/courses/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(Method::DELETE, &format!("/courses/{id}"), Some(&director), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_teacher_is_409() {
        let app = TestApp::new().await;
        let (_, director) = app.token_for(Role::Director, "dir@uni.edu").await;
        let (_, created) = app
            .send(Method::POST, "/courses", Some(&director), Some(json!({ "code": "X" })))
            .await;
        let id = created["course"]["id"].as_i64().unwrap();

        let (status, _) = app
            .send(
                Method::PUT,
                &format!("/courses/{id}"),
                Some(&director),
                Some(json!({ "docentes": [12345] })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn syllabus_search_requires_authentication() {
        let app = TestApp::new().await;
        let (status, _) = app.send(Method::GET, "/syllabus", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, student) = app.token_for(Role::Estudiante, "est@uni.edu").await;
        let (status, body) = app
            .send(Method::GET, "/syllabus?codigo=&plan=2018", Some(&student), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn coordinator_publishes_and_student_finds_syllabus() {
        let app = TestApp::new().await;
        let (_, director) = app.token_for(Role::Director, "dir@uni.edu").await;
        let (coord_id, coord) = app.token_for(Role::Coordinador, "coord@uni.edu").await;
        let (_, student) = app.token_for(Role::Estudiante, "est@uni.edu").await;

        let (_, created) = app
            .send(
                Method::POST,
                "/courses",
                Some(&director),
                Some(json!({
                    "name": "Redes", "code": "RE300", "cycle": "VI", "credits": 4,
                    "coordinadorId": coord_id,
                })),
            )
            .await;
        let id = created["course"]["id"].as_i64().unwrap();

        let (status, mine) = app.send(Method::GET, "/courses/coordinador", Some(&coord), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine[0]["id"], id);

        let (status, published) = app
            .send(
                Method::POST,
                &format!("/courses/{id}/syllabus"),
                Some(&coord),
                Some(json!({ "plan": "2023", "pdfUrl": "/files/re300.pdf" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(published["planEstudios"], "2023");

        let (status, found) = app
            .send(Method::GET, "/syllabus?nombre=red&ciclo=VI", Some(&student), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found[0]["codigo"], "RE300");
        assert_eq!(found[0]["creditos"], 4);
        assert_eq!(found[0]["pdfUrl"], "/files/re300.pdf");
    }

    #[tokio::test]
    async fn login_and_me() {
        let app = TestApp::new().await;
        user_service::insert_user(&app.state.db_pool, "Lucía", "lucia@uni.edu", "secreta", Role::Docente)
            .await
            .unwrap();

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "lucia@uni.edu", "password": "otra" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "lucia@uni.edu", "password": "secreta" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "DOCENTE");
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = app.send(Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["name"], "Lucía");
        assert_eq!(me["role"], "DOCENTE");
    }

    #[tokio::test]
    async fn director_manages_teacher_roster() {
        let app = TestApp::new().await;
        let (_, director) = app.token_for(Role::Director, "dir@uni.edu").await;
        let (_, docente) = app.token_for(Role::Docente, "doc@uni.edu").await;

        let (status, _) = app.send(Method::GET, "/users", Some(&docente), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = app
            .send(
                Method::POST,
                "/users",
                Some(&director),
                Some(json!({
                    "name": "Nuevo Coordinador", "email": "nuevo@uni.edu",
                    "password": "clave", "role": "COORDINADOR",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let new_id = created["id"].as_i64().unwrap();

        let (status, staff) = app
            .send(Method::GET, "/users?roles=DOCENTE,COORDINADOR", Some(&director), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(staff.as_array().unwrap().len(), 2);

        let (status, _) = app
            .send(Method::GET, "/users?roles=RECTOR", Some(&director), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = app
            .send(
                Method::PUT,
                &format!("/users/{new_id}"),
                Some(&director),
                Some(json!({ "name": "Coordinadora", "email": "nuevo@uni.edu", "role": "DOCENTE" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["role"], "DOCENTE");

        let (status, _) = app
            .send(Method::DELETE, &format!("/users/{new_id}"), Some(&director), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .send(Method::DELETE, &format!("/users/{new_id}"), Some(&director), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = TestApp::new().await;
        let (status, _) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_query_strings_answer_json_errors() {
        let app = TestApp::new().await;
        let (_, director) = app.token_for(Role::Director, "dir@uni.edu").await;

        for uri in ["/syllabus?codigo=a&codigo=b", "/users?roles=DOCENTE&roles=ESTUDIANTE"] {
            let (status, body) = app.send(Method::GET, uri, Some(&director), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            let message = body["error"].as_str().unwrap();
            assert!(message.starts_with("Parámetros inválidos"), "{uri}: {message}");
        }
    }

    #[tokio::test]
    async fn undecodable_path_segment_answers_json_error() {
        let app = TestApp::new().await;
        let (_, director) = app.token_for(Role::Director, "dir@uni.edu").await;

        let (status, body) = app.send(Method::GET, "/courses/%FF", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "ID inválido" }));

        let (status, body) = app.send(Method::DELETE, "/users/%FF", Some(&director), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "ID inválido" }));
    }
}
