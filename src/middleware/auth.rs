use crate::error::AppError;
use crate::models::{Claims, User};
use crate::services::user::UserService;
use crate::utils::auth::{token_from_request, verify_jwt};
use crate::AppState;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::Error as ActixError,
    web, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

#[derive(Clone)]
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl AuthUser {
    /// Tenant guard: admins may act on any club, everyone else only on the
    /// club carried in their token.
    pub fn authorize_club(&self, club_id: &str) -> Result<(), AppError> {
        if self.user.is_admin() || self.claims.club_id == club_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Access to this club is not allowed".to_string(),
            ))
        }
    }
}

impl std::ops::Deref for AuthUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

// Extractor for AuthUser from request extensions
impl actix_web::FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()));

        ready(result)
    }
}

/// Resolves the session token of a request to a stored user.
async fn authenticate(req: &ServiceRequest) -> Result<AuthUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("App state not found".to_string()))?;

    let token = token_from_request(req.request())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = verify_jwt(&token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("JWT verification failed: {:?}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    let now = chrono::Utc::now().timestamp();
    if now > claims.exp {
        tracing::debug!("Token expired at {}, current time {}", claims.exp, now);
        return Err(AppError::Unauthorized("Token expired".to_string()));
    }

    let user = UserService::new(&state.db)
        .get_user_by_id(claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    Ok(AuthUser { user, claims })
}

// Auth middleware factory
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let auth_user = authenticate(&req).await?;
            req.extensions_mut().insert(auth_user);

            let res = service.call(req).await?;
            Ok(res)
        })
    }
}

// Admin middleware factory
pub struct AdminMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AdminMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = AdminMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AdminMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let auth_user = authenticate(&req).await?;

            if !auth_user.user.is_admin() {
                return Err(AppError::Forbidden("Admin access required".to_string()).into());
            }

            req.extensions_mut().insert(auth_user);

            let res = service.call(req).await?;
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ROLE_ADMIN, ROLE_USER};

    fn auth_user(role: &str, club_id: &str) -> AuthUser {
        let user = User {
            id: 1,
            username: "kansli".into(),
            hashed_password: String::new(),
            club_id: club_id.into(),
            role: role.into(),
            tokens_used: 0,
            created_at: 0,
            last_login: None,
        };
        let claims = Claims {
            user_id: 1,
            username: "kansli".into(),
            club_id: club_id.into(),
            role: role.into(),
            exp: 0,
            iat: None,
        };
        AuthUser { user, claims }
    }

    #[test]
    fn test_authorize_club() {
        let user = auth_user(ROLE_USER, "vasatorp");
        assert!(user.authorize_club("vasatorp").is_ok());
        assert!(matches!(
            user.authorize_club("ljunghusen"),
            Err(AppError::Forbidden(_))
        ));

        let admin = auth_user(ROLE_ADMIN, "admin");
        assert!(admin.authorize_club("ljunghusen").is_ok());
    }
}
