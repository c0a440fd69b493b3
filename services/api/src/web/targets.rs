//! services/api/src/web/targets.rs
//!
//! Protein target prediction for a compound. Results are returned, not stored.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use drug_discovery_core::parsing::extract_json;
use drug_discovery_core::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{upstream_failure, HandlerError};
use crate::web::molecules::SmilesRequest;
use crate::web::rest::{invalid_ai_json, parse_smiles};
use crate::web::state::AppState;

#[derive(Deserialize, Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PredictedTarget {
    pub protein: String,
    pub confidence: f64,
}

#[derive(Deserialize, Serialize, ToSchema, Debug)]
pub struct TargetPredictionResponse {
    #[serde(default)]
    pub targets: Vec<PredictedTarget>,
}

#[utoipa::path(
    post,
    path = "/targets/predict",
    request_body = SmilesRequest,
    responses(
        (status = 200, description = "Predicted targets, most confident first", body = TargetPredictionResponse),
        (status = 400, description = "Missing SMILES"),
        (status = 502, description = "Generative call failed or returned no valid JSON")
    )
)]
pub async fn predict_targets_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SmilesRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let smiles = parse_smiles(&req.smiles)?;
    let raw = state
        .text_generator
        .generate_text(&prompts::target_prediction(&smiles))
        .await
        .map_err(|e| upstream_failure("Failed to predict targets", e))?;

    let mut prediction: TargetPredictionResponse = extract_json(&raw).map_err(invalid_ai_json)?;
    prediction
        .targets
        .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    Ok(Json(prediction))
}
