use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::services::generation::GenerationService;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub message: String,
    /// Admins may generate on behalf of another club.
    #[serde(default, alias = "club_id")]
    pub club_id: Option<String>,
}

pub async fn generate_response(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    req: web::Json<GenerateRequest>,
) -> AppResult<HttpResponse> {
    let club_id = req
        .club_id
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(&auth_user.claims.club_id);
    auth_user.authorize_club(club_id)?;

    let generated = GenerationService::new(
        &state.db,
        state.search.as_ref(),
        state.llm.as_ref(),
        state.config.retrieval_top_k,
    )
    .generate(club_id, &req.message)
    .await?;

    Ok(HttpResponse::Ok().json(generated))
}
