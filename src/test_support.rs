use actix_web::web;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::models::User;
use crate::search::local::LocalSearchIndex;
use crate::services::auth::AuthService;
use crate::services::generation::tests::RecordingModel;
use crate::services::llm::ChatModel;
use crate::utils::auth::create_jwt;
use crate::AppState;

pub const TEST_PASSWORD: &str = "hemligt123";

pub async fn state_with_model(llm: Arc<dyn ChatModel>) -> web::Data<AppState> {
    let db = Database::in_memory().await.unwrap();
    let search = Arc::new(LocalSearchIndex::new(db.clone()));

    web::Data::new(AppState {
        db,
        config: Arc::new(Config::default()),
        llm,
        search,
    })
}

pub async fn state() -> web::Data<AppState> {
    state_with_model(Arc::new(RecordingModel::default())).await
}

/// Creates a user and returns it with a bearer header value.
pub async fn user_with_token(
    state: &web::Data<AppState>,
    username: &str,
    club_id: &str,
    role: &str,
) -> (User, String) {
    let user = AuthService::new(&state.db)
        .create_account(username, TEST_PASSWORD, club_id, role)
        .await
        .unwrap();
    let (token, _) = create_jwt(&user, &state.config.jwt_secret, "1h").unwrap();
    (user, format!("Bearer {}", token))
}

/// Initializes the `/api/v1` routes around a test state.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .app_data(crate::routes::json_config())
                .service(actix_web::web::scope("/api/v1").configure(crate::routes::create_routes)),
        )
        .await
    };
}

/// Status of a call, including errors raised by middleware before a handler runs.
macro_rules! call_status {
    ($app:expr, $req:expr) => {
        match actix_web::test::try_call_service(&$app, $req).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        }
    };
}

pub(crate) use {call_status, test_app};
