use actix_web::{web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::models::{DateRangeQuery, FeedbackForm, InteractionForm, ListQuery, NewInteraction};
use crate::services::statistics::StatisticsService;
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/statistics", web::get().to(get_statistics))
        .route("/statistics/categories", web::get().to(get_categories))
        .service(
            web::resource("/interactions")
                .route(web::get().to(get_interactions))
                .route(web::post().to(log_interaction)),
        )
        .route(
            "/interactions/{id}/feedback",
            web::post().to(submit_feedback),
        );
}

async fn get_statistics(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    range: web::Query<DateRangeQuery>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let statistics = StatisticsService::new(&state.db)
        .daily(&club_id, &range)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "statistics": statistics })))
}

async fn get_categories(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    range: web::Query<DateRangeQuery>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let categories = StatisticsService::new(&state.db)
        .categories(&club_id, &range)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "categories": categories })))
}

async fn get_interactions(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let interactions = StatisticsService::new(&state.db)
        .recent(&club_id, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "interactions": interactions })))
}

async fn log_interaction(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    form_data: web::Json<InteractionForm>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;
    form_data.validate()?;

    let form = form_data.into_inner();
    let interaction = StatisticsService::new(&state.db)
        .record_interaction(NewInteraction {
            club_id: club_id.into_inner(),
            interaction_type: form.interaction_type,
            question: form.question,
            answer: form.answer,
            feedback: form.feedback,
            feedback_text: form.feedback_text,
            response_time_ms: form.response_time_ms.unwrap_or(0),
            tokens_used: form.tokens_used.unwrap_or(0),
            category: form.category,
        })
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "interaction": interaction })))
}

async fn submit_feedback(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<(String, i64)>,
    form_data: web::Json<FeedbackForm>,
) -> AppResult<HttpResponse> {
    let (club_id, id) = path.into_inner();
    auth_user.authorize_club(&club_id)?;

    let interaction = StatisticsService::new(&state.db)
        .set_feedback(
            &club_id,
            id,
            &form_data.feedback,
            form_data.feedback_text.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "interaction": interaction })))
}
