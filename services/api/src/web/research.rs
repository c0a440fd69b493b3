//! services/api/src/web/research.rs
//!
//! Research papers: AI-drafted papers for a compound, and related works pulled
//! from the literature index.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use drug_discovery_core::domain::{require_field, PaperKind, RelatedWork, ResearchPaper};
use drug_discovery_core::parsing::extract_json;
use drug_discovery_core::prompts;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_failure, upstream_failure, HandlerError};
use crate::web::rest::{invalid_ai_json, parse_smiles};
use crate::web::state::AppState;

const DEFAULT_RELATED_LIMIT: usize = 10;
const MAX_RELATED_LIMIT: usize = 50;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GeneratePaperRequest {
    pub title: String,
    pub smiles: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RelatedPapersRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// The paper layout the generative model is asked for.
#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
struct GeneratedPaper {
    title: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
    introduction: String,
    methodology: String,
    results: String,
    conclusion: String,
    references: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ResearchPaperResponse {
    pub id: Uuid,
    pub title: String,
    pub smiles: String,
    /// `generated` or `related`.
    pub kind: String,
    #[schema(value_type = Object)]
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

impl From<ResearchPaper> for ResearchPaperResponse {
    fn from(p: ResearchPaper) -> Self {
        Self {
            id: p.id,
            title: p.title,
            smiles: p.smiles,
            kind: p.kind.as_str().to_string(),
            content: p.content,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RelatedWorkResponse {
    pub external_id: String,
    pub title: String,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    pub cited_by_count: i64,
    pub authors: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RelatedPapersResponse {
    pub works: Vec<RelatedWorkResponse>,
    /// How many of `works` were not in the user's history yet.
    pub newly_saved: usize,
}

fn work_content(work: &RelatedWork) -> Value {
    json!({
        "externalId": work.external_id,
        "title": work.title,
        "publicationYear": work.publication_year,
        "doi": work.doi,
        "citedByCount": work.cited_by_count,
        "authors": work.authors,
    })
}

impl From<RelatedWork> for RelatedWorkResponse {
    fn from(w: RelatedWork) -> Self {
        Self {
            external_id: w.external_id,
            title: w.title,
            publication_year: w.publication_year,
            doi: w.doi,
            cited_by_count: w.cited_by_count,
            authors: w.authors,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Draft a research paper for a compound and store it.
#[utoipa::path(
    post,
    path = "/research-papers/generate",
    request_body = GeneratePaperRequest,
    responses(
        (status = 201, description = "Paper generated", body = ResearchPaperResponse),
        (status = 400, description = "Missing title or SMILES"),
        (status = 502, description = "Generative call failed or returned no valid JSON")
    )
)]
pub async fn generate_paper_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GeneratePaperRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let title =
        require_field("title", &req.title).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let smiles = parse_smiles(&req.smiles)?;

    let raw = state
        .text_generator
        .generate_text(&prompts::research_paper(&title, &smiles))
        .await
        .map_err(|e| upstream_failure("Failed to generate research paper", e))?;
    let paper: GeneratedPaper = extract_json(&raw).map_err(invalid_ai_json)?;
    let content = serde_json::to_value(&paper).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode paper: {}", e),
        )
    })?;

    let record = ResearchPaper {
        id: Uuid::new_v4(),
        user_id,
        title,
        smiles: smiles.to_string(),
        kind: PaperKind::Generated,
        content,
        created_at: Utc::now(),
    };
    state
        .db
        .save_research_paper(record.clone())
        .await
        .map_err(|e| port_failure("Failed to save research paper", e))?;
    info!(paper_id = %record.id, "Research paper generated");

    Ok((StatusCode::CREATED, Json(ResearchPaperResponse::from(record))))
}

/// Search the literature and remember works the user has not seen yet.
///
/// Works are de-duplicated against history by exact title.
#[utoipa::path(
    post,
    path = "/research-papers/related",
    request_body = RelatedPapersRequest,
    responses(
        (status = 200, description = "Search results", body = RelatedPapersResponse),
        (status = 400, description = "Missing query"),
        (status = 502, description = "Literature search failed")
    )
)]
pub async fn related_papers_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<RelatedPapersRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let query =
        require_field("query", &req.query).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let limit = req
        .limit
        .unwrap_or(DEFAULT_RELATED_LIMIT)
        .clamp(1, MAX_RELATED_LIMIT);

    let works = state
        .literature
        .search_works(&query, limit)
        .await
        .map_err(|e| upstream_failure("Failed to search related papers", e))?;

    let mut newly_saved = 0;
    for work in &works {
        let known = state
            .db
            .find_research_paper(user_id, &work.title, PaperKind::Related)
            .await
            .map_err(|e| port_failure("Failed to check paper history", e))?;
        if known.is_some() {
            continue;
        }

        state
            .db
            .save_research_paper(ResearchPaper {
                id: Uuid::new_v4(),
                user_id,
                title: work.title.clone(),
                smiles: String::new(),
                kind: PaperKind::Related,
                content: work_content(work),
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| port_failure("Failed to save related paper", e))?;
        newly_saved += 1;
    }

    Ok(Json(RelatedPapersResponse {
        works: works.into_iter().map(RelatedWorkResponse::from).collect(),
        newly_saved,
    }))
}

#[utoipa::path(
    get,
    path = "/research-papers",
    responses((status = 200, description = "Generated and related papers", body = [ResearchPaperResponse]))
)]
pub async fn list_papers_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let papers = state
        .db
        .list_research_papers(user_id)
        .await
        .map_err(|e| port_failure("Failed to list research papers", e))?;
    Ok(Json(
        papers
            .into_iter()
            .map(ResearchPaperResponse::from)
            .collect::<Vec<_>>(),
    ))
}
