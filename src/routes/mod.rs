pub mod admin;
pub mod auth;
pub mod clubs;
pub mod generate;
pub mod statistics;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::error::AppError;
use crate::middleware::{AdminMiddleware, AuthMiddleware};

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auths").configure(auth::create_routes))
        .service(
            web::resource("/generate-response")
                .wrap(AuthMiddleware)
                .route(web::post().to(generate::generate_response)),
        )
        .service(
            web::scope("/clubs/{club_id}")
                .wrap(AuthMiddleware)
                .configure(clubs::create_routes)
                .configure(statistics::create_routes),
        )
        .service(
            web::scope("/admin")
                .wrap(AdminMiddleware)
                .configure(admin::create_routes),
        );
}

/// Malformed JSON bodies answer with the same `{detail}` shape as other errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        AppError::BadRequest(err.to_string()).into()
    })
}
