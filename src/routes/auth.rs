use actix_web::{
    cookie::{Cookie, SameSite},
    http::header,
    web, HttpResponse,
};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthMiddleware, AuthUser};
use crate::models::{
    ChangePasswordRequest, RegisterRequest, SessionResponse, SessionUser, SetupAdminRequest,
    SigninRequest, User, UserResponse,
};
use crate::services::auth::AuthService;
use crate::utils::auth::create_jwt;
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/setup-admin", web::post().to(setup_admin))
        .route("/signout", web::get().to(signout))
        .service(
            web::resource("/session")
                .wrap(AuthMiddleware)
                .route(web::get().to(get_session)),
        )
        .service(
            web::resource("/password")
                .wrap(AuthMiddleware)
                .route(web::post().to(change_password)),
        );
}

/// Issues a token for `user` and returns it both in the body and as the `token` cookie.
fn session_response(state: &AppState, user: &User) -> AppResult<HttpResponse> {
    let (token, expires_at) = create_jwt(user, &state.config.jwt_secret, &state.config.jwt_expires_in)?;

    let mut cookie = Cookie::new("token", token.clone());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_expires(time::OffsetDateTime::from_unix_timestamp(expires_at).ok());

    let session_response = SessionResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at: Some(expires_at),
        user: SessionUser::from(user),
    };

    Ok(HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(session_response))
}

async fn login(state: web::Data<AppState>, req: web::Json<SigninRequest>) -> AppResult<HttpResponse> {
    req.validate()
        .map_err(|_| AppError::BadRequest("Username and password are required".to_string()))?;

    let user = AuthService::new(&state.db)
        .authenticate(req.username.trim(), &req.password)
        .await?;

    tracing::info!("User '{}' signed in", user.username);
    session_response(&state, &user)
}

async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    if !state.config.enable_signup {
        return Err(AppError::Forbidden("Registration is disabled".to_string()));
    }
    req.validate()?;

    let user = AuthService::new(&state.db)
        .create_account(
            &req.username,
            &req.password,
            &req.club_id,
            &state.config.default_user_role,
        )
        .await?;

    session_response(&state, &user)
}

async fn setup_admin(
    state: web::Data<AppState>,
    req: web::Json<SetupAdminRequest>,
) -> AppResult<HttpResponse> {
    req.validate()?;

    let user = AuthService::new(&state.db)
        .setup_admin(&req.username, &req.password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Admin user created successfully",
        "user": UserResponse::from(user),
    })))
}

async fn get_session(auth_user: AuthUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(SessionUser::from(&auth_user.user)))
}

async fn signout() -> HttpResponse {
    let mut cookie = Cookie::new("token", "");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(-1));

    HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(json!({ "status": true }))
}

async fn change_password(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    req: web::Json<ChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    req.validate()?;

    AuthService::new(&state.db)
        .change_password(&auth_user.user, &req.current_password, &req.new_password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROLE_USER;
    use crate::services::user::UserService;
    use crate::test_support::{self, call_status, test_app, TEST_PASSWORD};
    use actix_web::{http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_login_sets_cookie_and_session_works() {
        let state = test_support::state().await;
        test_support::user_with_token(&state, "kansli", "vasatorp", ROLE_USER).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/auths/login")
            .set_json(json!({ "username": "kansli", "password": TEST_PASSWORD }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["user"]["clubId"], "vasatorp");

        let token = body["token"].as_str().unwrap();
        let req = test::TestRequest::get()
            .uri("/api/v1/auths/session")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let session: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(session["username"], "kansli");
        assert_eq!(session["role"], "user");
    }

    #[actix_web::test]
    async fn test_session_accepts_cookie() {
        let state = test_support::state().await;
        let (_, bearer) = test_support::user_with_token(&state, "kansli", "c", ROLE_USER).await;
        let app = test_app!(state);

        let token = bearer.trim_start_matches("Bearer ");
        let req = test::TestRequest::get()
            .uri("/api/v1/auths/session")
            .cookie(Cookie::new("token", token.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_invalid_credentials_share_message() {
        let state = test_support::state().await;
        test_support::user_with_token(&state, "kansli", "c", ROLE_USER).await;
        let app = test_app!(state);

        for (username, password) in [("kansli", "fel-losenord"), ("okand", TEST_PASSWORD)] {
            let req = test::TestRequest::post()
                .uri("/api/v1/auths/login")
                .set_json(json!({ "username": username, "password": password }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["detail"], "Invalid credentials");
        }
    }

    #[actix_web::test]
    async fn test_missing_fields_is_bad_request() {
        let state = test_support::state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/auths/login")
            .set_json(json!({ "username": "kansli" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/auths/login")
            .set_json(json!({ "username": "", "password": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_register_requires_signup_flag() {
        let state = test_support::state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/auths/register")
            .set_json(json!({ "username": "ny", "password": TEST_PASSWORD, "clubId": "c" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_setup_admin_only_once() {
        let state = test_support::state().await;
        let app = test_app!(state);

        let setup = || {
            test::TestRequest::post()
                .uri("/api/v1/auths/setup-admin")
                .set_json(json!({ "username": "admin", "password": TEST_PASSWORD }))
                .to_request()
        };

        let resp = test::call_service(&app, setup()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&app, setup()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Admin user already exists");
    }

    #[actix_web::test]
    async fn test_change_password() {
        let state = test_support::state().await;
        let (_, bearer) = test_support::user_with_token(&state, "kansli", "c", ROLE_USER).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/auths/password")
            .insert_header((header::AUTHORIZATION, bearer))
            .set_json(json!({ "currentPassword": TEST_PASSWORD, "newPassword": "nyttlosen1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/v1/auths/login")
            .set_json(json!({ "username": "kansli", "password": "nyttlosen1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_session_requires_token() {
        let state = test_support::state().await;
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/api/v1/auths/session").to_request();
        assert_eq!(call_status!(app, req), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/v1/auths/session")
            .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
            .to_request();
        assert_eq!(call_status!(app, req), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_expired_token_rejected() {
        let state = test_support::state().await;
        let (user, _) = test_support::user_with_token(&state, "kansli", "c", ROLE_USER).await;
        let (token, exp) = create_jwt(&user, &state.config.jwt_secret, "-1h").unwrap();
        assert!(exp < chrono::Utc::now().timestamp());
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/v1/clubs/c/documents")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        assert_eq!(call_status!(app, req), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_token_of_deleted_user_rejected() {
        let state = test_support::state().await;
        let (user, bearer) = test_support::user_with_token(&state, "kansli", "c", ROLE_USER).await;
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/v1/clubs/c/documents")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .to_request();
        assert_eq!(call_status!(app, req), StatusCode::OK);

        assert!(UserService::new(&state.db).delete_user(user.id).await.unwrap());

        let req = test::TestRequest::get()
            .uri("/api/v1/clubs/c/documents")
            .insert_header((header::AUTHORIZATION, bearer))
            .to_request();
        assert_eq!(call_status!(app, req), StatusCode::UNAUTHORIZED);
    }
}
