//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the payload types
//! and helpers shared by the REST handlers.

use axum::http::StatusCode;
use drug_discovery_core::domain::{Section, Smiles};
use drug_discovery_core::parsing::{ExtractError, Report, NO_DETAILS_SENTINEL};
use serde::Serialize;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

use crate::error::HandlerError;
use crate::web::{
    auth, drug_names, molecules, reports, research, saved_searches, targets,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::verify_otp_handler,
        auth::resend_otp_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        molecules::create_molecule_handler,
        molecules::list_molecules_handler,
        molecules::molecule_report_handler,
        reports::create_cost_estimation_handler,
        reports::list_cost_estimations_handler,
        reports::create_toxicity_handler,
        reports::list_toxicity_handler,
        reports::variant_info_handler,
        drug_names::suggest_names_handler,
        drug_names::list_names_handler,
        drug_names::delete_names_handler,
        drug_names::accept_name_handler,
        research::generate_paper_handler,
        research::related_papers_handler,
        research::list_papers_handler,
        targets::predict_targets_handler,
        saved_searches::create_saved_search_handler,
        saved_searches::list_saved_searches_handler,
        saved_searches::delete_saved_search_handler,
    ),
    components(
        schemas(
            SectionResponse,
            ReportDetails,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::VerifyOtpRequest,
            auth::ResendOtpRequest,
            auth::AuthResponse,
            auth::MessageResponse,
            molecules::CreateMoleculeRequest,
            molecules::SmilesRequest,
            molecules::MoleculeResponse,
            molecules::MoleculeReportResponse,
            reports::ReportRequest,
            reports::StoredReportResponse,
            reports::VariantInfoResponse,
            drug_names::SuggestNamesRequest,
            drug_names::AcceptNameRequest,
            drug_names::DrugNameSuggestionResponse,
            drug_names::AcceptNameResponse,
            research::GeneratePaperRequest,
            research::RelatedPapersRequest,
            research::ResearchPaperResponse,
            research::RelatedWorkResponse,
            research::RelatedPapersResponse,
            targets::PredictedTarget,
            targets::TargetPredictionResponse,
            saved_searches::SaveSearchRequest,
            saved_searches::SavedSearchResponse,
        )
    ),
    tags(
        (name = "Drug Discovery Assistant API", description = "Molecule analysis backed by generative and literature services.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Payload Structs
//=========================================================================================

/// One numbered section of a generated report.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionResponse {
    pub title: String,
    pub bullet_points: Vec<String>,
}

impl From<&Section> for SectionResponse {
    fn from(s: &Section) -> Self {
        Self {
            title: s.title.clone(),
            bullet_points: s.bullet_points.clone(),
        }
    }
}

/// Either the parsed sections or, when nothing could be parsed, a plain message.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ReportDetails {
    Sections(Vec<SectionResponse>),
    Message(String),
}

impl ReportDetails {
    pub fn from_sections(sections: &[Section]) -> Self {
        if sections.is_empty() {
            ReportDetails::Message(NO_DETAILS_SENTINEL.to_string())
        } else {
            ReportDetails::Sections(sections.iter().map(SectionResponse::from).collect())
        }
    }
}

impl From<&Report> for ReportDetails {
    fn from(report: &Report) -> Self {
        ReportDetails::from_sections(report.sections())
    }
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Presence check for a SMILES field; runs before any outbound call.
pub fn parse_smiles(raw: &str) -> Result<Smiles, HandlerError> {
    Smiles::parse(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// A reply that was supposed to carry a JSON object did not.
pub fn invalid_ai_json(e: ExtractError) -> HandlerError {
    warn!("Discarding generative response: {}", e);
    (StatusCode::BAD_GATEWAY, "No valid JSON found".to_string())
}
