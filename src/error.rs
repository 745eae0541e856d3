use actix_web::{
    cookie::{Cookie, SameSite},
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::SearchError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Validation(ref e)
            | AppError::NotFound(ref e)
            | AppError::Unauthorized(ref e)
            | AppError::Forbidden(ref e)
            | AppError::BadRequest(ref e) => e.clone(),
            AppError::Jwt(ref e) => {
                tracing::debug!("JWT error: {:?}", e);
                "Invalid token".to_string()
            }
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::UserAlreadyExists => "User already exists".to_string(),
            AppError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                "IO error".to_string()
            }
            AppError::ExternalServiceError(ref e) => {
                tracing::error!("External service error: {:?}", e);
                e.clone()
            }
            AppError::Search(ref e) => {
                tracing::error!("Search error: {:?}", e);
                "Search service error".to_string()
            }
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                e.clone()
            }
            AppError::Http(ref e) => {
                tracing::error!("HTTP error: {:?}", e);
                "HTTP request failed".to_string()
            }
        };

        let body = ErrorResponse {
            detail: error_message,
        };

        let mut response_builder = HttpResponse::build(self.status_code());

        // Clear the session cookie so a stale token is not replayed
        if matches!(
            self,
            AppError::Unauthorized(_) | AppError::Jwt(_) | AppError::InvalidCredentials
        ) {
            let mut token_cookie = Cookie::new("token", "");
            token_cookie.set_http_only(true);
            token_cookie.set_same_site(SameSite::Lax);
            token_cookie.set_path("/");
            token_cookie.set_max_age(time::Duration::seconds(-1));

            response_builder.insert_header((header::SET_COOKIE, token_cookie.to_string()));
        }

        response_builder.json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserAlreadyExists => StatusCode::BAD_REQUEST,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::Search(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
