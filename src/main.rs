// src/main.rs

// --- Declaración de módulos ---
mod config;
mod db;
mod error;
mod models;
mod services;
mod state;
mod web;

// --- Imports ---
use crate::{config::Config, services::user_service, state::AppState};
use axum::serve;
use std::env;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Logging (tracing) ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            env::var("RUST_LOG")
                .unwrap_or_else(|_| "syllabus_admin=debug,tower_http=info,sqlx=warn".into())
                .into()
        }))
        .with(fmt::layer())
        .init();

    tracing::info!("🚀 Iniciando servidor de administración de syllabus...");

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Configuración inválida: {}", e))?;

    // --- Base de datos ---
    let db_pool = match db::create_db_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Fallo crítico al inicializar la base de datos: {}", e);
            return Err(anyhow::anyhow!("Fallo al conectar/migrar la DB: {}", e));
        }
    };

    match &config.bootstrap_director {
        Some(bootstrap) => {
            user_service::ensure_bootstrap_director(&db_pool, bootstrap)
                .await
                .map_err(|e| anyhow::anyhow!("No se pudo crear el director inicial: {}", e))?;
        }
        None => tracing::debug!("Sin BOOTSTRAP_DIRECTOR_*; no se crea director inicial."),
    }

    let app_state = AppState {
        db_pool,
        jwt: config.jwt.clone(),
    };

    // --- Listener ---
    tracing::info!("📡 Servidor escuchando en http://{}", config.bind_addr);
    let listener = match TcpListener::bind(config.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("❌ Fallo al abrir el listener en {}: {}", config.bind_addr, e);
            return Err(e.into());
        }
    };

    // --- Router y capas ---
    let app = web::routes::create_router(app_state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
    tracing::info!("✅ Router y middlewares configurados.");

    if let Err(e) = serve(listener, app.into_make_service()).await {
        tracing::error!("❌ Error fatal en el servidor: {}", e);
        return Err(e.into());
    }

    Ok(())
}
