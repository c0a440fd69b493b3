//! services/api/src/web/drug_names.rs
//!
//! Drug name suggestions: generate, list, discard while pending, and accept one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use drug_discovery_core::domain::{require_field, DrugNameSuggestion, SuggestionStatus};
use drug_discovery_core::parsing::extract_json;
use drug_discovery_core::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_failure, upstream_failure, HandlerError};
use crate::web::rest::{invalid_ai_json, parse_smiles};
use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SuggestNamesRequest {
    pub title: String,
    pub smiles: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AcceptNameRequest {
    pub name: String,
}

#[derive(Deserialize)]
struct SuggestedNames {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DrugNameSuggestionResponse {
    pub id: Uuid,
    pub molecule_title: String,
    pub smiles: String,
    pub suggested_names: Vec<String>,
    /// `pending` or `accepted`.
    pub status: String,
    pub accepted_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DrugNameSuggestion> for DrugNameSuggestionResponse {
    fn from(s: DrugNameSuggestion) -> Self {
        Self {
            id: s.id,
            molecule_title: s.molecule_title,
            smiles: s.smiles,
            suggested_names: s.suggested_names,
            status: s.status.as_str().to_string(),
            accepted_name: s.accepted_name,
            created_at: s.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AcceptNameResponse {
    pub suggestion: DrugNameSuggestionResponse,
    /// Whether a registered molecule with the same title and SMILES took the name.
    pub molecule_updated: bool,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Trims names, drops blanks, and keeps the first occurrence of each.
fn clean_names(names: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !cleaned.iter().any(|n| n == name) {
            cleaned.push(name.to_string());
        }
    }
    cleaned
}

/// Loads a suggestion and hides other users' records behind a 404.
async fn owned_suggestion(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
) -> Result<DrugNameSuggestion, HandlerError> {
    let suggestion = state
        .db
        .get_drug_name_suggestion(id)
        .await
        .map_err(|e| port_failure("Failed to load drug name suggestion", e))?;
    if suggestion.user_id != user_id {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Drug name suggestion {} not found", id),
        ));
    }
    Ok(suggestion)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Generate candidate names for a compound and store them as pending.
#[utoipa::path(
    post,
    path = "/drug-names",
    request_body = SuggestNamesRequest,
    responses(
        (status = 201, description = "Suggestions stored", body = DrugNameSuggestionResponse),
        (status = 400, description = "Missing title or SMILES"),
        (status = 502, description = "Generative call failed or returned no valid JSON")
    )
)]
pub async fn suggest_names_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SuggestNamesRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let title =
        require_field("title", &req.title).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let smiles = parse_smiles(&req.smiles)?;

    let raw = state
        .text_generator
        .generate_text(&prompts::drug_names(&smiles, &title))
        .await
        .map_err(|e| upstream_failure("Failed to generate drug names", e))?;
    let parsed: SuggestedNames = extract_json(&raw).map_err(invalid_ai_json)?;

    let names = clean_names(parsed.names);
    if names.is_empty() {
        return Err((
            StatusCode::BAD_GATEWAY,
            "No drug names were suggested".to_string(),
        ));
    }

    let suggestion = DrugNameSuggestion {
        id: Uuid::new_v4(),
        user_id,
        molecule_title: title,
        smiles: smiles.to_string(),
        suggested_names: names,
        status: SuggestionStatus::Pending,
        accepted_name: None,
        created_at: Utc::now(),
    };
    state
        .db
        .save_drug_name_suggestion(suggestion.clone())
        .await
        .map_err(|e| port_failure("Failed to save drug name suggestion", e))?;
    info!(suggestion_id = %suggestion.id, "Drug names suggested");

    Ok((
        StatusCode::CREATED,
        Json(DrugNameSuggestionResponse::from(suggestion)),
    ))
}

#[utoipa::path(
    get,
    path = "/drug-names",
    responses((status = 200, description = "Suggestion history", body = [DrugNameSuggestionResponse]))
)]
pub async fn list_names_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let suggestions = state
        .db
        .list_drug_name_suggestions(user_id)
        .await
        .map_err(|e| port_failure("Failed to list drug name suggestions", e))?;
    Ok(Json(
        suggestions
            .into_iter()
            .map(DrugNameSuggestionResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Discard a suggestion. Only pending suggestions can be deleted.
#[utoipa::path(
    delete,
    path = "/drug-names/{id}",
    params(("id" = Uuid, Path, description = "Suggestion id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such suggestion"),
        (status = 409, description = "Suggestion was already accepted")
    )
)]
pub async fn delete_names_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let suggestion = owned_suggestion(&state, user_id, id).await?;
    if suggestion.status != SuggestionStatus::Pending {
        return Err((
            StatusCode::CONFLICT,
            "Only pending suggestions can be deleted".to_string(),
        ));
    }

    state
        .db
        .delete_pending_drug_name_suggestion(id)
        .await
        .map_err(|e| port_failure("Failed to delete drug name suggestion", e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Accept one of the suggested names.
///
/// The molecule with the same title and SMILES, if the user registered one,
/// takes the accepted name.
#[utoipa::path(
    post,
    path = "/drug-names/{id}/accept",
    params(("id" = Uuid, Path, description = "Suggestion id")),
    request_body = AcceptNameRequest,
    responses(
        (status = 200, description = "Name accepted", body = AcceptNameResponse),
        (status = 400, description = "Name is not one of the suggestions"),
        (status = 404, description = "No such suggestion"),
        (status = 409, description = "Suggestion was already accepted")
    )
)]
pub async fn accept_name_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<AcceptNameRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut suggestion = owned_suggestion(&state, user_id, id).await?;
    if suggestion.status != SuggestionStatus::Pending {
        return Err((
            StatusCode::CONFLICT,
            "Suggestion was already accepted".to_string(),
        ));
    }

    let name = req.name.trim();
    if !suggestion.suggested_names.iter().any(|n| n == name) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("'{}' is not one of the suggested names", name),
        ));
    }

    // Molecules are matched by exact title + SMILES; there is no foreign key.
    let molecule = state
        .db
        .find_molecule(user_id, &suggestion.molecule_title, &suggestion.smiles)
        .await
        .map_err(|e| port_failure("Failed to look up molecule", e))?;
    let molecule_id = molecule.map(|m| m.id);

    state
        .db
        .accept_drug_name(id, name, molecule_id)
        .await
        .map_err(|e| port_failure("Failed to accept drug name", e))?;
    let molecule_updated = molecule_id.is_some();
    info!(suggestion_id = %id, molecule_updated, "Drug name accepted");

    suggestion.status = SuggestionStatus::Accepted;
    suggestion.accepted_name = Some(name.to_string());

    Ok(Json(AcceptNameResponse {
        suggestion: DrugNameSuggestionResponse::from(suggestion),
        molecule_updated,
    }))
}
