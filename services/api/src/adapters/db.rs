//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drug_discovery_core::domain::{
    AuthSession, CostEstimation, DrugNameSuggestion, Molecule, OtpCode, PaperKind,
    ResearchPaper, SavedSearch, Section, SuggestionStatus, ToxicityResult, User,
    UserCredentials,
};
use drug_discovery_core::ports::{DatabaseService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Postgres error code for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    username: String,
    phone: Option<String>,
    is_verified: bool,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            username: self.username,
            phone: self.phone,
            is_verified: self.is_verified,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
    is_verified: bool,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
            is_verified: self.is_verified,
        }
    }
}

#[derive(FromRow)]
struct OtpRecord {
    user_id: Uuid,
    code_hash: String,
    expires_at: DateTime<Utc>,
    failed_attempts: i32,
}
impl OtpRecord {
    fn to_domain(self) -> OtpCode {
        OtpCode {
            user_id: self.user_id,
            code_hash: self.code_hash,
            expires_at: self.expires_at,
            failed_attempts: self.failed_attempts,
        }
    }
}

#[derive(FromRow)]
struct MoleculeRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    smiles: String,
    iupac_name: String,
    conversion_details: String,
    potential_diseases: String,
    accepted_name: Option<String>,
    created_at: DateTime<Utc>,
}
impl MoleculeRecord {
    fn to_domain(self) -> Molecule {
        Molecule {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            smiles: self.smiles,
            iupac_name: self.iupac_name,
            conversion_details: self.conversion_details,
            potential_diseases: self.potential_diseases,
            accepted_name: self.accepted_name,
            created_at: self.created_at,
        }
    }
}

/// JSONB shape of a parsed report section.
#[derive(Serialize, Deserialize)]
struct SectionRecord {
    title: String,
    bullet_points: Vec<String>,
}

fn sections_to_json(sections: &[Section]) -> Json<Vec<SectionRecord>> {
    Json(
        sections
            .iter()
            .map(|s| SectionRecord {
                title: s.title.clone(),
                bullet_points: s.bullet_points.clone(),
            })
            .collect(),
    )
}

fn sections_from_json(sections: Json<Vec<SectionRecord>>) -> Vec<Section> {
    sections
        .0
        .into_iter()
        .map(|s| Section {
            title: s.title,
            bullet_points: s.bullet_points,
        })
        .collect()
}

/// Cost estimations and toxicity results share a table shape.
#[derive(FromRow)]
struct ReportRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    smiles: String,
    raw_output: String,
    sections: Json<Vec<SectionRecord>>,
    created_at: DateTime<Utc>,
}
impl ReportRecord {
    fn to_cost_estimation(self) -> CostEstimation {
        CostEstimation {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            smiles: self.smiles,
            raw_output: self.raw_output,
            sections: sections_from_json(self.sections),
            created_at: self.created_at,
        }
    }

    fn to_toxicity_result(self) -> ToxicityResult {
        ToxicityResult {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            smiles: self.smiles,
            raw_output: self.raw_output,
            sections: sections_from_json(self.sections),
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct DrugNameRecord {
    id: Uuid,
    user_id: Uuid,
    molecule_title: String,
    smiles: String,
    suggested_names: Json<Vec<String>>,
    status: String,
    accepted_name: Option<String>,
    created_at: DateTime<Utc>,
}
impl DrugNameRecord {
    fn to_domain(self) -> PortResult<DrugNameSuggestion> {
        let status = SuggestionStatus::from_db(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown suggestion status '{}'", self.status))
        })?;
        Ok(DrugNameSuggestion {
            id: self.id,
            user_id: self.user_id,
            molecule_title: self.molecule_title,
            smiles: self.smiles,
            suggested_names: self.suggested_names.0,
            status,
            accepted_name: self.accepted_name,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ResearchPaperRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    smiles: String,
    kind: String,
    content: Json<Value>,
    created_at: DateTime<Utc>,
}
impl ResearchPaperRecord {
    fn to_domain(self) -> PortResult<ResearchPaper> {
        let kind = PaperKind::from_db(&self.kind)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown paper kind '{}'", self.kind)))?;
        Ok(ResearchPaper {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            smiles: self.smiles,
            kind,
            content: self.content.0,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SavedSearchRecord {
    id: Uuid,
    user_id: Uuid,
    query: String,
    filters: Json<Value>,
    created_at: DateTime<Utc>,
}
impl SavedSearchRecord {
    fn to_domain(self) -> SavedSearch {
        SavedSearch {
            id: self.id,
            user_id: self.user_id,
            query: self.query,
            filters: self.filters.0,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- User Management ---

    async fn create_user(
        &self,
        email: &str,
        username: &str,
        phone: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, username, phone, hashed_password) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING user_id, email, username, phone, is_verified",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(username)
        .bind(phone)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .and_then(|d| d.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if duplicate {
                PortError::Conflict(format!("An account for {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password, is_verified FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, username, phone, is_verified FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn mark_user_verified(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- One-Time Codes ---

    async fn store_otp(&self, otp: OtpCode) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO otp_codes (user_id, code_hash, expires_at, failed_attempts) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET code_hash = EXCLUDED.code_hash, \
             expires_at = EXCLUDED.expires_at, failed_attempts = EXCLUDED.failed_attempts",
        )
        .bind(otp.user_id)
        .bind(otp.code_hash)
        .bind(otp.expires_at)
        .bind(otp.failed_attempts)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_otp(&self, user_id: Uuid) -> PortResult<OtpCode> {
        let record = sqlx::query_as::<_, OtpRecord>(
            "SELECT user_id, code_hash, expires_at, failed_attempts FROM otp_codes WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "No verification code issued".to_string()))?;
        Ok(record.to_domain())
    }

    async fn delete_otp(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM otp_codes WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn record_failed_otp_attempt(&self, user_id: Uuid) -> PortResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE otp_codes SET failed_attempts = failed_attempts + 1 \
             WHERE user_id = $1 RETURNING failed_attempts",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, "No verification code issued".to_string()))
    }

    // --- Auth Sessions ---

    async fn create_auth_session(&self, session: AuthSession) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Molecules ---

    async fn save_molecule(&self, molecule: Molecule) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO molecules (id, user_id, title, smiles, iupac_name, conversion_details, \
             potential_diseases, accepted_name, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(molecule.id)
        .bind(molecule.user_id)
        .bind(molecule.title)
        .bind(molecule.smiles)
        .bind(molecule.iupac_name)
        .bind(molecule.conversion_details)
        .bind(molecule.potential_diseases)
        .bind(molecule.accepted_name)
        .bind(molecule.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_molecules(&self, user_id: Uuid) -> PortResult<Vec<Molecule>> {
        let records = sqlx::query_as::<_, MoleculeRecord>(
            "SELECT id, user_id, title, smiles, iupac_name, conversion_details, potential_diseases, \
             accepted_name, created_at FROM molecules WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_molecule(
        &self,
        user_id: Uuid,
        title: &str,
        smiles: &str,
    ) -> PortResult<Option<Molecule>> {
        let record = sqlx::query_as::<_, MoleculeRecord>(
            "SELECT id, user_id, title, smiles, iupac_name, conversion_details, potential_diseases, \
             accepted_name, created_at FROM molecules \
             WHERE user_id = $1 AND title = $2 AND smiles = $3 LIMIT 1",
        )
        .bind(user_id)
        .bind(title)
        .bind(smiles)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    // --- Reports ---

    async fn save_cost_estimation(&self, estimation: CostEstimation) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO cost_estimations (id, user_id, title, smiles, raw_output, sections, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(estimation.id)
        .bind(estimation.user_id)
        .bind(estimation.title)
        .bind(estimation.smiles)
        .bind(estimation.raw_output)
        .bind(sections_to_json(&estimation.sections))
        .bind(estimation.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_cost_estimations(&self, user_id: Uuid) -> PortResult<Vec<CostEstimation>> {
        let records = sqlx::query_as::<_, ReportRecord>(
            "SELECT id, user_id, title, smiles, raw_output, sections, created_at \
             FROM cost_estimations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_cost_estimation()).collect())
    }

    async fn save_toxicity_result(&self, result: ToxicityResult) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO toxicity_results (id, user_id, title, smiles, raw_output, sections, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(result.id)
        .bind(result.user_id)
        .bind(result.title)
        .bind(result.smiles)
        .bind(result.raw_output)
        .bind(sections_to_json(&result.sections))
        .bind(result.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_toxicity_results(&self, user_id: Uuid) -> PortResult<Vec<ToxicityResult>> {
        let records = sqlx::query_as::<_, ReportRecord>(
            "SELECT id, user_id, title, smiles, raw_output, sections, created_at \
             FROM toxicity_results WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_toxicity_result()).collect())
    }

    // --- Drug Names ---

    async fn save_drug_name_suggestion(&self, suggestion: DrugNameSuggestion) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO drug_name_suggestions (id, user_id, molecule_title, smiles, suggested_names, \
             status, accepted_name, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(suggestion.id)
        .bind(suggestion.user_id)
        .bind(suggestion.molecule_title)
        .bind(suggestion.smiles)
        .bind(Json(suggestion.suggested_names))
        .bind(suggestion.status.as_str())
        .bind(suggestion.accepted_name)
        .bind(suggestion.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_drug_name_suggestions(
        &self,
        user_id: Uuid,
    ) -> PortResult<Vec<DrugNameSuggestion>> {
        let records = sqlx::query_as::<_, DrugNameRecord>(
            "SELECT id, user_id, molecule_title, smiles, suggested_names, status, accepted_name, created_at \
             FROM drug_name_suggestions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn get_drug_name_suggestion(&self, id: Uuid) -> PortResult<DrugNameSuggestion> {
        let record = sqlx::query_as::<_, DrugNameRecord>(
            "SELECT id, user_id, molecule_title, smiles, suggested_names, status, accepted_name, created_at \
             FROM drug_name_suggestions WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Drug name suggestion {} not found", id)))?;
        record.to_domain()
    }

    async fn delete_pending_drug_name_suggestion(&self, id: Uuid) -> PortResult<()> {
        let result =
            sqlx::query("DELETE FROM drug_name_suggestions WHERE id = $1 AND status = 'pending'")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Pending drug name suggestion {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn accept_drug_name(
        &self,
        id: Uuid,
        name: &str,
        molecule_id: Option<Uuid>,
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let result = sqlx::query(
            "UPDATE drug_name_suggestions SET status = 'accepted', accepted_name = $1 \
             WHERE id = $2 AND status = 'pending'",
        )
        .bind(name)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::Conflict(format!(
                "Drug name suggestion {} is no longer pending",
                id
            )));
        }

        if let Some(molecule_id) = molecule_id {
            let result = sqlx::query("UPDATE molecules SET accepted_name = $1 WHERE id = $2")
                .bind(name)
                .bind(molecule_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
            if result.rows_affected() == 0 {
                return Err(PortError::NotFound(format!(
                    "Molecule {} not found",
                    molecule_id
                )));
            }
        }

        // Dropping `tx` on an early return rolls both updates back.
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    // --- Research Papers ---

    async fn save_research_paper(&self, paper: ResearchPaper) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO research_papers (id, user_id, title, smiles, kind, content, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(paper.id)
        .bind(paper.user_id)
        .bind(paper.title)
        .bind(paper.smiles)
        .bind(paper.kind.as_str())
        .bind(Json(paper.content))
        .bind(paper.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_research_papers(&self, user_id: Uuid) -> PortResult<Vec<ResearchPaper>> {
        let records = sqlx::query_as::<_, ResearchPaperRecord>(
            "SELECT id, user_id, title, smiles, kind, content, created_at \
             FROM research_papers WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn find_research_paper(
        &self,
        user_id: Uuid,
        title: &str,
        kind: PaperKind,
    ) -> PortResult<Option<ResearchPaper>> {
        let record = sqlx::query_as::<_, ResearchPaperRecord>(
            "SELECT id, user_id, title, smiles, kind, content, created_at \
             FROM research_papers WHERE user_id = $1 AND title = $2 AND kind = $3 LIMIT 1",
        )
        .bind(user_id)
        .bind(title)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(|r| r.to_domain()).transpose()
    }

    // --- Saved Searches ---

    async fn save_saved_search(&self, search: SavedSearch) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO saved_searches (id, user_id, query, filters, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(search.id)
        .bind(search.user_id)
        .bind(search.query)
        .bind(Json(search.filters))
        .bind(search.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_saved_searches(&self, user_id: Uuid) -> PortResult<Vec<SavedSearch>> {
        let records = sqlx::query_as::<_, SavedSearchRecord>(
            "SELECT id, user_id, query, filters, created_at \
             FROM saved_searches WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_saved_search(&self, user_id: Uuid, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM saved_searches WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Saved search {} not found", id)));
        }
        Ok(())
    }
}
