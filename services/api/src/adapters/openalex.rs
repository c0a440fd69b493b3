//! services/api/src/adapters/openalex.rs
//!
//! Literature search against the OpenAlex works API.
//! Implements the `LiteratureService` port from the `core` crate.

use async_trait::async_trait;
use drug_discovery_core::domain::RelatedWork;
use drug_discovery_core::ports::{LiteratureService, PortError, PortResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// OpenAlex caps `per-page` at 200.
const MAX_PER_PAGE: usize = 200;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<WorkRecord>,
}

#[derive(Deserialize)]
struct WorkRecord {
    id: String,
    display_name: Option<String>,
    publication_year: Option<i32>,
    doi: Option<String>,
    #[serde(default)]
    cited_by_count: i64,
    #[serde(default)]
    authorships: Vec<Authorship>,
}

#[derive(Deserialize)]
struct Authorship {
    author: AuthorRecord,
}

#[derive(Deserialize)]
struct AuthorRecord {
    display_name: Option<String>,
}

impl WorkRecord {
    /// Untitled works are useless to the UI and are skipped.
    fn to_domain(self) -> Option<RelatedWork> {
        let title = self.display_name?.trim().to_string();
        if title.is_empty() {
            return None;
        }
        Some(RelatedWork {
            external_id: self.id,
            title,
            publication_year: self.publication_year,
            doi: self.doi,
            cited_by_count: self.cited_by_count,
            authors: self
                .authorships
                .into_iter()
                .filter_map(|a| a.author.display_name)
                .collect(),
        })
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OpenAlexAdapter {
    client: Client,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexAdapter {
    pub fn new(client: Client, base_url: String, mailto: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            mailto,
        }
    }
}

#[async_trait]
impl LiteratureService for OpenAlexAdapter {
    async fn search_works(&self, query: &str, limit: usize) -> PortResult<Vec<RelatedWork>> {
        let url = format!("{}/works", self.base_url);
        let per_page = limit.clamp(1, MAX_PER_PAGE).to_string();

        let mut params = vec![("search", query), ("per-page", per_page.as_str())];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.as_str()));
        }

        debug!(query = query, limit = limit, "Searching OpenAlex works");

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("OpenAlex request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(PortError::Unexpected(format!(
                "OpenAlex search failed: {status} {body}"
            )));
        }

        let works: WorksResponse = resp
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("OpenAlex response parse error: {e}")))?;

        Ok(works
            .results
            .into_iter()
            .filter_map(WorkRecord::to_domain)
            .collect())
    }
}
