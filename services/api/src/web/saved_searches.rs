//! services/api/src/web/saved_searches.rs
//!
//! Saved literature/compound searches: create, list, delete.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use drug_discovery_core::domain::{require_field, SavedSearch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_failure, HandlerError};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct SaveSearchRequest {
    pub query: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filters: Option<Value>,
}

#[derive(Serialize, ToSchema)]
pub struct SavedSearchResponse {
    pub id: Uuid,
    pub query: String,
    #[schema(value_type = Object)]
    pub filters: Value,
    pub created_at: DateTime<Utc>,
}

impl From<SavedSearch> for SavedSearchResponse {
    fn from(s: SavedSearch) -> Self {
        Self {
            id: s.id,
            query: s.query,
            filters: s.filters,
            created_at: s.created_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/saved-searches",
    request_body = SaveSearchRequest,
    responses(
        (status = 201, description = "Search saved", body = SavedSearchResponse),
        (status = 400, description = "Missing query")
    )
)]
pub async fn create_saved_search_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SaveSearchRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let query =
        require_field("query", &req.query).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let search = SavedSearch {
        id: Uuid::new_v4(),
        user_id,
        query,
        filters: req.filters.unwrap_or_else(|| Value::Object(Default::default())),
        created_at: Utc::now(),
    };
    state
        .db
        .save_saved_search(search.clone())
        .await
        .map_err(|e| port_failure("Failed to save search", e))?;

    Ok((StatusCode::CREATED, Json(SavedSearchResponse::from(search))))
}

#[utoipa::path(
    get,
    path = "/saved-searches",
    responses((status = 200, description = "Saved searches", body = [SavedSearchResponse]))
)]
pub async fn list_saved_searches_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let searches = state
        .db
        .list_saved_searches(user_id)
        .await
        .map_err(|e| port_failure("Failed to list saved searches", e))?;
    Ok(Json(
        searches
            .into_iter()
            .map(SavedSearchResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    delete,
    path = "/saved-searches/{id}",
    params(("id" = Uuid, Path, description = "Saved search id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such saved search")
    )
)]
pub async fn delete_saved_search_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .db
        .delete_saved_search(user_id, id)
        .await
        .map_err(|e| port_failure("Failed to delete saved search", e))?;
    Ok(StatusCode::NO_CONTENT)
}
