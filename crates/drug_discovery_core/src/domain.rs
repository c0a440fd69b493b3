//! crates/drug_discovery_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or wire format.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Validated Inputs
//=========================================================================================

/// Raised when a user-supplied field fails its presence check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("A SMILES string is required")]
    MissingSmiles,
    #[error("The field '{0}' is required")]
    MissingField(&'static str),
}

/// A SMILES line notation string.
///
/// Only presence is checked; the string is not validated chemically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Smiles(String);

impl Smiles {
    /// Trims the input and rejects it when nothing is left.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingSmiles);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Smiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims a required free-text field, rejecting blank values.
pub fn require_field(name: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(name));
    }
    Ok(trimmed.to_string())
}

//=========================================================================================
// Users and Authentication
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub is_verified: bool,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_verified: bool,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A one-time verification code, stored hashed.
#[derive(Debug, Clone)]
pub struct OtpCode {
    pub user_id: Uuid,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    /// Wrong guesses made against this code so far.
    pub failed_attempts: i32,
}

//=========================================================================================
// Molecules and AI Reports
//=========================================================================================

/// A molecule registered by a user, enriched with generated free-text fields.
#[derive(Debug, Clone)]
pub struct Molecule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub smiles: String,
    pub iupac_name: String,
    pub conversion_details: String,
    pub potential_diseases: String,
    /// Set once a drug name suggestion for this molecule is accepted.
    pub accepted_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One numbered heading of a plain-text report and the bullets under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub bullet_points: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CostEstimation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub smiles: String,
    pub raw_output: String,
    pub sections: Vec<Section>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ToxicityResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub smiles: String,
    pub raw_output: String,
    pub sections: Vec<Section>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionStatus {
    Pending,
    Accepted,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SuggestionStatus::Pending),
            "accepted" => Some(SuggestionStatus::Accepted),
            _ => None,
        }
    }
}

/// A batch of generated drug names for one molecule, awaiting the user's pick.
#[derive(Debug, Clone)]
pub struct DrugNameSuggestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub molecule_title: String,
    pub smiles: String,
    pub suggested_names: Vec<String>,
    pub status: SuggestionStatus,
    pub accepted_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperKind {
    Generated,
    Related,
}

impl PaperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperKind::Generated => "generated",
            PaperKind::Related => "related",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "generated" => Some(PaperKind::Generated),
            "related" => Some(PaperKind::Related),
            _ => None,
        }
    }
}

/// A generated research paper, or a related work pulled from the literature index.
#[derive(Debug, Clone)]
pub struct ResearchPaper {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Empty for related works found by free-text search.
    pub smiles: String,
    pub kind: PaperKind,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

/// A literature search hit, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedWork {
    pub external_id: String,
    pub title: String,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    pub cited_by_count: i64,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SavedSearch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub filters: Value,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Messaging
//=========================================================================================

/// A chat message as published to a room.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room: String,
    pub sender_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}
