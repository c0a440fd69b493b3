//! services/api/src/web/reports.rs
//!
//! Plain-text AI reports: cost estimation and toxicity (persisted per user) and
//! generated-variant information (fetched with the bounded retry).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use drug_discovery_core::domain::{CostEstimation, Section, Smiles, ToxicityResult};
use drug_discovery_core::parsing::parse_report;
use drug_discovery_core::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_failure, upstream_failure, HandlerError};
use crate::web::molecules::SmilesRequest;
use crate::web::rest::{parse_smiles, ReportDetails};
use crate::web::state::AppState;

/// Shown once every variant-info attempt has failed.
pub const VARIANT_INFO_FAILURE: &str =
    "Failed to fetch variant information after multiple attempts";

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ReportRequest {
    pub smiles: String,
    /// Defaults to the SMILES string when omitted or blank.
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StoredReportResponse {
    pub id: Uuid,
    pub title: String,
    pub smiles: String,
    pub raw_output: String,
    pub details: ReportDetails,
    pub created_at: DateTime<Utc>,
}

impl From<CostEstimation> for StoredReportResponse {
    fn from(r: CostEstimation) -> Self {
        Self {
            id: r.id,
            title: r.title,
            smiles: r.smiles,
            details: ReportDetails::from_sections(&r.sections),
            raw_output: r.raw_output,
            created_at: r.created_at,
        }
    }
}

impl From<ToxicityResult> for StoredReportResponse {
    fn from(r: ToxicityResult) -> Self {
        Self {
            id: r.id,
            title: r.title,
            smiles: r.smiles,
            details: ReportDetails::from_sections(&r.sections),
            raw_output: r.raw_output,
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct VariantInfoResponse {
    pub smiles: String,
    pub details: ReportDetails,
}

//=========================================================================================
// Shared Flow
//=========================================================================================

/// The parts of a plain-text report every persisted report kind stores.
struct GeneratedReport {
    title: String,
    smiles: Smiles,
    raw_output: String,
    sections: Vec<Section>,
}

async fn generate_report(
    state: &AppState,
    req: &ReportRequest,
    build_prompt: impl FnOnce(&Smiles, &str) -> String,
    context: &str,
) -> Result<GeneratedReport, HandlerError> {
    // Validation happens before any outbound call.
    let smiles = parse_smiles(&req.smiles)?;
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(smiles.as_str())
        .to_string();

    let raw_output = state
        .text_generator
        .generate_text(&build_prompt(&smiles, &title))
        .await
        .map_err(|e| upstream_failure(context, e))?;
    let sections = parse_report(&raw_output).sections().to_vec();

    Ok(GeneratedReport {
        title,
        smiles,
        raw_output,
        sections,
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Estimate development and production cost for a compound.
#[utoipa::path(
    post,
    path = "/cost-estimations",
    request_body = ReportRequest,
    responses(
        (status = 201, description = "Estimation stored", body = StoredReportResponse),
        (status = 400, description = "Missing SMILES"),
        (status = 502, description = "Generative call failed")
    )
)]
pub async fn create_cost_estimation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let report = generate_report(
        &state,
        &req,
        prompts::cost_estimation,
        "Failed to generate cost estimation",
    )
    .await?;

    let estimation = CostEstimation {
        id: Uuid::new_v4(),
        user_id,
        title: report.title,
        smiles: report.smiles.to_string(),
        raw_output: report.raw_output,
        sections: report.sections,
        created_at: Utc::now(),
    };
    state
        .db
        .save_cost_estimation(estimation.clone())
        .await
        .map_err(|e| port_failure("Failed to save cost estimation", e))?;
    info!(estimation_id = %estimation.id, "Cost estimation stored");

    Ok((StatusCode::CREATED, Json(StoredReportResponse::from(estimation))))
}

#[utoipa::path(
    get,
    path = "/cost-estimations",
    responses((status = 200, description = "Cost estimation history", body = [StoredReportResponse]))
)]
pub async fn list_cost_estimations_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let records = state
        .db
        .list_cost_estimations(user_id)
        .await
        .map_err(|e| port_failure("Failed to list cost estimations", e))?;
    Ok(Json(
        records
            .into_iter()
            .map(StoredReportResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Predict a toxicity profile for a compound.
#[utoipa::path(
    post,
    path = "/toxicity",
    request_body = ReportRequest,
    responses(
        (status = 201, description = "Toxicity result stored", body = StoredReportResponse),
        (status = 400, description = "Missing SMILES"),
        (status = 502, description = "Generative call failed")
    )
)]
pub async fn create_toxicity_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let report = generate_report(
        &state,
        &req,
        |smiles, _title| prompts::toxicity_report(smiles),
        "Failed to generate toxicity prediction",
    )
    .await?;

    let result = ToxicityResult {
        id: Uuid::new_v4(),
        user_id,
        title: report.title,
        smiles: report.smiles.to_string(),
        raw_output: report.raw_output,
        sections: report.sections,
        created_at: Utc::now(),
    };
    state
        .db
        .save_toxicity_result(result.clone())
        .await
        .map_err(|e| port_failure("Failed to save toxicity result", e))?;
    info!(result_id = %result.id, "Toxicity result stored");

    Ok((StatusCode::CREATED, Json(StoredReportResponse::from(result))))
}

#[utoipa::path(
    get,
    path = "/toxicity",
    responses((status = 200, description = "Toxicity history", body = [StoredReportResponse]))
)]
pub async fn list_toxicity_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let records = state
        .db
        .list_toxicity_results(user_id)
        .await
        .map_err(|e| port_failure("Failed to list toxicity results", e))?;
    Ok(Json(
        records
            .into_iter()
            .map(StoredReportResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Describe a generated molecule variant.
///
/// The upstream call is retried with the configured fixed-delay policy; once
/// it is exhausted the client gets a terminal 502.
#[utoipa::path(
    post,
    path = "/variants/info",
    request_body = SmilesRequest,
    responses(
        (status = 200, description = "Variant report sections, or the no-details message", body = VariantInfoResponse),
        (status = 400, description = "Missing SMILES"),
        (status = 502, description = "All attempts failed")
    )
)]
pub async fn variant_info_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SmilesRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let smiles = parse_smiles(&req.smiles)?;
    let prompt = prompts::variant_info(&smiles);

    let raw = state
        .variant_retry
        .run(|| state.text_generator.generate_text(&prompt))
        .await
        .map_err(|e| {
            error!(
                attempts = state.variant_retry.total_attempts(),
                "Variant info fetch gave up: {}", e
            );
            (StatusCode::BAD_GATEWAY, VARIANT_INFO_FAILURE.to_string())
        })?;

    Ok(Json(VariantInfoResponse {
        smiles: smiles.to_string(),
        details: ReportDetails::from(&parse_report(&raw)),
    }))
}
