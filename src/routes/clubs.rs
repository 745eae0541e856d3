use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    ClubConfigData, ClubPromptForm, DocumentForm, ExampleQuestionForm, QaExampleForm,
};
use crate::search::{SearchKind, SearchQuery};
use crate::services::club::ClubService;
use crate::services::knowledge::KnowledgeService;
use crate::services::sync::SyncService;
use crate::AppState;

/// Routes under `/clubs/{club_id}`. The scope is wrapped in `AuthMiddleware`
/// and every handler checks the tenant before touching data.
pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/config")
            .route(web::get().to(get_config))
            .route(web::post().to(update_config)),
    )
    .service(
        web::resource("/prompt")
            .route(web::get().to(get_prompt))
            .route(web::post().to(update_prompt)),
    )
    .service(
        web::resource("/documents")
            .route(web::get().to(get_documents))
            .route(web::post().to(save_documents)),
    )
    .service(
        web::resource("/qa-examples")
            .route(web::get().to(get_qa_examples))
            .route(web::post().to(save_qa_examples)),
    )
    .route("/qa-examples/add", web::post().to(add_qa_example))
    .route("/qa-examples/{id}", web::delete().to(delete_qa_example))
    .service(
        web::resource("/example-questions")
            .route(web::get().to(get_example_questions))
            .route(web::post().to(save_example_questions)),
    )
    .route("/search/sync", web::post().to(sync_search))
    .route("/search", web::get().to(search_partition));
}

#[derive(Debug, Deserialize)]
pub struct DocumentsPayload {
    pub documents: Vec<DocumentForm>,
}

#[derive(Debug, Deserialize)]
pub struct QaExamplesPayload {
    pub examples: Vec<QaExampleForm>,
}

#[derive(Debug, Deserialize)]
pub struct ExampleQuestionsPayload {
    pub questions: Vec<ExampleQuestionForm>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub kind: Option<String>,
    pub top: Option<usize>,
}

async fn get_config(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let config = ClubService::new(&state.db)
        .get_config_or_default(&club_id)
        .await?;

    Ok(HttpResponse::Ok().json(config))
}

async fn update_config(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    form_data: web::Json<ClubConfigData>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let config = ClubService::new(&state.db)
        .upsert_config(&club_id, &form_data)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "config": config })))
}

async fn get_prompt(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let service = ClubService::new(&state.db);
    let (prompt, is_default) = match service.get_prompt(&club_id).await? {
        Some(prompt) => (prompt, false),
        None => (service.prompt_or_default(&club_id).await?, true),
    };

    Ok(HttpResponse::Ok().json(json!({ "prompt": prompt, "is_default": is_default })))
}

async fn update_prompt(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    form_data: web::Json<ClubPromptForm>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    ClubService::new(&state.db)
        .save_prompt(&club_id, &form_data.prompt)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn get_documents(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let documents = KnowledgeService::new(&state.db)
        .list_documents(&club_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "documents": documents })))
}

async fn save_documents(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    payload: web::Json<DocumentsPayload>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    KnowledgeService::new(&state.db)
        .replace_documents(&club_id, &payload.documents)
        .await?;
    SyncService::new(&state.db, state.search.as_ref())
        .sync_after_save(&club_id, SearchKind::Document)
        .await;

    let documents = KnowledgeService::new(&state.db)
        .list_documents(&club_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "documents": documents })))
}

async fn get_qa_examples(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let examples = KnowledgeService::new(&state.db)
        .list_qa_examples(&club_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "examples": examples })))
}

async fn save_qa_examples(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    payload: web::Json<QaExamplesPayload>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let knowledge = KnowledgeService::new(&state.db);
    knowledge.replace_qa_examples(&club_id, &payload.examples).await?;
    SyncService::new(&state.db, state.search.as_ref())
        .sync_after_save(&club_id, SearchKind::QaExample)
        .await;

    let examples = knowledge.list_qa_examples(&club_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "examples": examples })))
}

async fn add_qa_example(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    form_data: web::Json<QaExampleForm>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;
    form_data.validate()?;

    let example = KnowledgeService::new(&state.db)
        .add_qa_example(&club_id, &form_data)
        .await?;
    SyncService::new(&state.db, state.search.as_ref())
        .sync_after_save(&club_id, SearchKind::QaExample)
        .await;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "example": example })))
}

async fn delete_qa_example(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<(String, i64)>,
) -> AppResult<HttpResponse> {
    let (club_id, id) = path.into_inner();
    auth_user.authorize_club(&club_id)?;

    KnowledgeService::new(&state.db)
        .delete_qa_example(&club_id, id)
        .await?;
    SyncService::new(&state.db, state.search.as_ref())
        .sync_after_save(&club_id, SearchKind::QaExample)
        .await;

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn get_example_questions(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let questions = KnowledgeService::new(&state.db)
        .list_example_questions(&club_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "questions": questions })))
}

async fn save_example_questions(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    payload: web::Json<ExampleQuestionsPayload>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let questions = KnowledgeService::new(&state.db)
        .replace_example_questions(&club_id, &payload.questions)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "questions": questions })))
}

async fn sync_search(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let report = SyncService::new(&state.db, state.search.as_ref())
        .sync_club(&club_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "documents": report.documents,
        "qa_examples": report.qa_examples,
    })))
}

/// Raw hits for a query, to check what generation would retrieve.
async fn search_partition(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    club_id: web::Path<String>,
    params: web::Query<SearchParams>,
) -> AppResult<HttpResponse> {
    auth_user.authorize_club(&club_id)?;

    let kind = match params.kind.as_deref() {
        Some(kind) => kind.parse::<SearchKind>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => SearchKind::Document,
    };
    let top = params.top.unwrap_or(state.config.retrieval_top_k).clamp(1, 50);

    let hits = state
        .search
        .search(&SearchQuery::new(&club_id, kind, &params.q, top))
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "results": hits })))
}
