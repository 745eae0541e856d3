mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod search;
mod services;
#[cfg(test)]
mod test_support;
mod utils;

use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{Compress, Logger, NormalizePath},
    web, App, HttpResponse, HttpServer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::db::Database;
use crate::routes::{create_routes, json_config};
use crate::search::{SearchIndex, SearchIndexFactory};
use crate::services::auth::AuthService;
use crate::services::llm::{ChatModel, OpenAiChatModel};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub llm: Arc<dyn ChatModel>,
    pub search: Arc<dyn SearchIndex>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    dotenvy::dotenv().ok();

    let log_level = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info".to_string())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting club assistant");

    let config = Config::from_env().map_err(anyhow::Error::msg)?;
    info!("Configuration loaded from environment");

    let db = Database::new(&config.database_url).await?;
    info!("Database connected");

    db.run_migrations().await?;
    info!("Database migrations completed");

    AuthService::new(&db)
        .bootstrap_admin(
            config.admin_username.as_deref(),
            config.admin_password.as_deref(),
        )
        .await?;

    let search = SearchIndexFactory::create(&config, &db)?;
    let llm: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::from_config(&config)?);
    info!(
        "Using model {} at {}",
        config.llm_model, config.openai_api_base_url
    );

    let state = web::Data::new(AppState {
        db,
        config: Arc::new(config.clone()),
        llm,
        search,
    });

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let cors_allow_origin = config.cors_allow_origin.clone();

    info!("Server running at http://{}", addr);

    HttpServer::new(move || {
        // With credentials, "*" has to be answered per origin
        let cors = if cors_allow_origin == "*" {
            Cors::default()
                .allowed_origin_fn(|_origin, _req_head| true)
                .allow_any_method()
                .allow_any_header()
                .expose_headers(vec![header::SET_COOKIE])
                .supports_credentials()
                .max_age(3600)
        } else {
            let mut cors = Cors::default();
            for origin in cors_allow_origin.split(',').map(|s| s.trim()) {
                cors = cors.allowed_origin(origin);
            }
            cors.allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
                .allowed_headers(vec![
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::COOKIE,
                ])
                .expose_headers(vec![header::SET_COOKIE])
                .supports_credentials()
                .max_age(3600)
        };

        App::new()
            .app_data(state.clone())
            .app_data(json_config())
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .route("/health", web::get().to(health_check))
            .route("/health/db", web::get().to(health_check_db))
            .service(web::scope("/api/v1").configure(create_routes))
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": true }))
}

async fn health_check_db(state: web::Data<AppState>) -> Result<HttpResponse, crate::error::AppError> {
    sqlx::query("SELECT 1").execute(state.db.pool()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": true })))
}
