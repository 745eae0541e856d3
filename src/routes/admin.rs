use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{error, info};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{AddClubForm, CreateUserForm, ResetPasswordRequest, UserResponse, ROLE_ADMIN, ROLE_USER};
use crate::services::auth::AuthService;
use crate::services::club::ClubService;
use crate::services::statistics::StatisticsService;
use crate::services::sync::SyncService;
use crate::services::user::UserService;
use crate::AppState;

/// Routes under `/admin`, wrapped in `AdminMiddleware`.
pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::get().to(list_users))
            .route(web::post().to(create_user)),
    )
    .route("/users/{id}", web::delete().to(delete_user))
    .route("/users/{id}/password", web::post().to(reset_password))
    .service(
        web::resource("/clubs")
            .route(web::get().to(list_clubs))
            .route(web::post().to(add_club)),
    )
    .route("/clubs/{club_id}", web::delete().to(delete_club))
    .route("/token-usage", web::get().to(get_token_usage))
    .route("/token-usage/refresh", web::post().to(refresh_token_usage))
    .route("/search/index", web::post().to(create_search_index));
}

async fn list_users(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let users: Vec<UserResponse> = UserService::new(&state.db)
        .list_users()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

async fn create_user(
    state: web::Data<AppState>,
    form_data: web::Json<CreateUserForm>,
) -> AppResult<HttpResponse> {
    form_data.validate()?;

    let role = form_data
        .role
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| state.config.default_user_role.clone());
    if role != ROLE_ADMIN && role != ROLE_USER {
        return Err(AppError::BadRequest(format!("Unknown role: {}", role)));
    }

    let user = AuthService::new(&state.db)
        .create_account(
            &form_data.username,
            &form_data.password,
            &form_data.club_id,
            &role,
        )
        .await?;

    info!("Created user '{}' for club {}", user.username, user.club_id);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": UserResponse::from(user) })))
}

async fn delete_user(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    id: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let id = id.into_inner();
    if id == auth_user.user.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !UserService::new(&state.db).delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn reset_password(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    form_data: web::Json<ResetPasswordRequest>,
) -> AppResult<HttpResponse> {
    form_data.validate()?;

    AuthService::new(&state.db)
        .reset_password(id.into_inner(), &form_data.new_password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn list_clubs(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let clubs = ClubService::new(&state.db).list_configs().await?;
    Ok(HttpResponse::Ok().json(json!({ "clubs": clubs })))
}

async fn add_club(
    state: web::Data<AppState>,
    form_data: web::Json<AddClubForm>,
) -> AppResult<HttpResponse> {
    form_data.validate()?;

    let (club_id, data) = form_data.into_inner().into_data();
    let config = ClubService::new(&state.db)
        .upsert_config(club_id.trim(), &data)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "config": config })))
}

async fn delete_club(
    state: web::Data<AppState>,
    club_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    if !ClubService::new(&state.db).delete_club(&club_id).await? {
        return Err(AppError::NotFound("Club not found".to_string()));
    }

    if let Err(e) = SyncService::new(&state.db, state.search.as_ref())
        .remove_club(&club_id)
        .await
    {
        error!("Failed to remove search entries for club {}: {}", club_id, e);
    }

    info!("Deleted club {}", club_id);
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn get_token_usage(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let report = StatisticsService::new(&state.db).token_usage().await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn refresh_token_usage(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let users: Vec<UserResponse> = UserService::new(&state.db)
        .refresh_tokens_used()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "success": true, "users": users })))
}

async fn create_search_index(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    state.search.ensure_index().await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
