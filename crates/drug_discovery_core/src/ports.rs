//! crates/drug_discovery_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{
    AuthSession, CostEstimation, DrugNameSuggestion, Molecule, OtpCode, PaperKind, RelatedWork,
    ResearchPaper, SavedSearch, ToxicityResult, User, UserCredentials,
};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        email: &str,
        username: &str,
        phone: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn mark_user_verified(&self, user_id: Uuid) -> PortResult<()>;

    // --- One-Time Codes ---
    /// Stores a code for the user, replacing any previous one.
    async fn store_otp(&self, otp: OtpCode) -> PortResult<()>;

    async fn get_otp(&self, user_id: Uuid) -> PortResult<OtpCode>;

    async fn delete_otp(&self, user_id: Uuid) -> PortResult<()>;

    /// Counts one wrong guess against the user's code and returns the new total.
    async fn record_failed_otp_attempt(&self, user_id: Uuid) -> PortResult<i32>;

    // --- Auth Sessions ---
    async fn create_auth_session(&self, session: AuthSession) -> PortResult<()>;

    /// Returns the owning user when the session exists and has not expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Molecules ---
    async fn save_molecule(&self, molecule: Molecule) -> PortResult<()>;

    async fn list_molecules(&self, user_id: Uuid) -> PortResult<Vec<Molecule>>;

    /// Exact title + SMILES look-up used for advisory duplicate checks.
    async fn find_molecule(
        &self,
        user_id: Uuid,
        title: &str,
        smiles: &str,
    ) -> PortResult<Option<Molecule>>;

    // --- Reports ---
    async fn save_cost_estimation(&self, estimation: CostEstimation) -> PortResult<()>;

    async fn list_cost_estimations(&self, user_id: Uuid) -> PortResult<Vec<CostEstimation>>;

    async fn save_toxicity_result(&self, result: ToxicityResult) -> PortResult<()>;

    async fn list_toxicity_results(&self, user_id: Uuid) -> PortResult<Vec<ToxicityResult>>;

    // --- Drug Names ---
    async fn save_drug_name_suggestion(&self, suggestion: DrugNameSuggestion) -> PortResult<()>;

    async fn list_drug_name_suggestions(
        &self,
        user_id: Uuid,
    ) -> PortResult<Vec<DrugNameSuggestion>>;

    async fn get_drug_name_suggestion(&self, id: Uuid) -> PortResult<DrugNameSuggestion>;

    /// Deletes the suggestion only while it is still pending.
    async fn delete_pending_drug_name_suggestion(&self, id: Uuid) -> PortResult<()>;

    /// Marks a pending suggestion accepted and, when given, names the molecule.
    /// Both writes land together or not at all.
    async fn accept_drug_name(
        &self,
        id: Uuid,
        name: &str,
        molecule_id: Option<Uuid>,
    ) -> PortResult<()>;

    // --- Research Papers ---
    async fn save_research_paper(&self, paper: ResearchPaper) -> PortResult<()>;

    async fn list_research_papers(&self, user_id: Uuid) -> PortResult<Vec<ResearchPaper>>;

    async fn find_research_paper(
        &self,
        user_id: Uuid,
        title: &str,
        kind: PaperKind,
    ) -> PortResult<Option<ResearchPaper>>;

    // --- Saved Searches ---
    async fn save_saved_search(&self, search: SavedSearch) -> PortResult<()>;

    async fn list_saved_searches(&self, user_id: Uuid) -> PortResult<Vec<SavedSearch>>;

    async fn delete_saved_search(&self, user_id: Uuid, id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Sends a single prompt to the generative endpoint and returns its raw text.
    async fn generate_text(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait LiteratureService: Send + Sync {
    /// Free-text search over the literature index.
    async fn search_works(&self, query: &str, limit: usize) -> PortResult<Vec<RelatedWork>>;
}

#[async_trait]
pub trait OtpDeliveryService: Send + Sync {
    /// Hands a freshly issued verification code to the user.
    async fn deliver(&self, email: &str, code: &str) -> PortResult<()>;
}
