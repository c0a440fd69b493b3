//! services/api/src/web/molecules.rs
//!
//! Molecule registration, history and the free-form molecule report.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use drug_discovery_core::domain::{require_field, Molecule, Smiles};
use drug_discovery_core::parsing::{extract_json, parse_report};
use drug_discovery_core::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_failure, upstream_failure, HandlerError};
use crate::web::rest::{invalid_ai_json, parse_smiles, ReportDetails};
use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateMoleculeRequest {
    pub title: String,
    pub smiles: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SmilesRequest {
    pub smiles: String,
}

/// What the generative model is asked to return for a new molecule.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct MoleculeDetails {
    iupac_name: String,
    conversion_details: String,
    potential_diseases: String,
}

#[derive(Serialize, ToSchema)]
pub struct MoleculeResponse {
    pub id: Uuid,
    pub title: String,
    pub smiles: String,
    pub iupac_name: String,
    pub conversion_details: String,
    pub potential_diseases: String,
    pub accepted_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Molecule> for MoleculeResponse {
    fn from(m: Molecule) -> Self {
        Self {
            id: m.id,
            title: m.title,
            smiles: m.smiles,
            iupac_name: m.iupac_name,
            conversion_details: m.conversion_details,
            potential_diseases: m.potential_diseases,
            accepted_name: m.accepted_name,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MoleculeReportResponse {
    pub smiles: String,
    pub details: ReportDetails,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Register a molecule and enrich it with generated details.
///
/// Rejects a title + SMILES pair the user has already registered.
#[utoipa::path(
    post,
    path = "/molecules",
    request_body = CreateMoleculeRequest,
    responses(
        (status = 201, description = "Molecule created", body = MoleculeResponse),
        (status = 400, description = "Missing title or SMILES"),
        (status = 409, description = "Molecule already registered"),
        (status = 502, description = "Generative call failed or returned no valid JSON")
    )
)]
pub async fn create_molecule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateMoleculeRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let title =
        require_field("title", &req.title).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let smiles = parse_smiles(&req.smiles)?;

    let existing = state
        .db
        .find_molecule(user_id, &title, smiles.as_str())
        .await
        .map_err(|e| port_failure("Failed to check for duplicates", e))?;
    if existing.is_some() {
        return Err((
            StatusCode::CONFLICT,
            "Molecule with this title and SMILES already exists".to_string(),
        ));
    }

    let raw = state
        .text_generator
        .generate_text(&prompts::molecule_details(&smiles))
        .await
        .map_err(|e| upstream_failure("Failed to fetch molecule details", e))?;
    let details: MoleculeDetails = extract_json(&raw).map_err(invalid_ai_json)?;

    let molecule = Molecule {
        id: Uuid::new_v4(),
        user_id,
        title,
        smiles: smiles.to_string(),
        iupac_name: details.iupac_name,
        conversion_details: details.conversion_details,
        potential_diseases: details.potential_diseases,
        accepted_name: None,
        created_at: Utc::now(),
    };
    state
        .db
        .save_molecule(molecule.clone())
        .await
        .map_err(|e| port_failure("Failed to save molecule", e))?;
    info!(molecule_id = %molecule.id, "Molecule created");

    Ok((StatusCode::CREATED, Json(MoleculeResponse::from(molecule))))
}

/// List the current user's molecules, newest first.
#[utoipa::path(
    get,
    path = "/molecules",
    responses((status = 200, description = "Molecule history", body = [MoleculeResponse]))
)]
pub async fn list_molecules_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let molecules = state
        .db
        .list_molecules(user_id)
        .await
        .map_err(|e| port_failure("Failed to list molecules", e))?;
    Ok(Json(
        molecules
            .into_iter()
            .map(MoleculeResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Generate a sectioned report for a SMILES string. Not persisted.
#[utoipa::path(
    post,
    path = "/molecules/report",
    request_body = SmilesRequest,
    responses(
        (status = 200, description = "Report sections, or the no-details message", body = MoleculeReportResponse),
        (status = 400, description = "Missing SMILES"),
        (status = 502, description = "Generative call failed")
    )
)]
pub async fn molecule_report_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SmilesRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let smiles: Smiles = parse_smiles(&req.smiles)?;
    let raw = state
        .text_generator
        .generate_text(&prompts::molecule_report(&smiles))
        .await
        .map_err(|e| upstream_failure("Failed to generate molecule report", e))?;

    Ok(Json(MoleculeReportResponse {
        smiles: smiles.to_string(),
        details: ReportDetails::from(&parse_report(&raw)),
    }))
}
