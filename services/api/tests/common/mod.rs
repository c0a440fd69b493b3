//! In-memory implementations of the core ports and request helpers shared by
//! the integration tests.

#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::{self, chat::ChatRooms, state::AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use drug_discovery_core::domain::{
    AuthSession, CostEstimation, DrugNameSuggestion, Molecule, OtpCode, PaperKind, RelatedWork,
    ResearchPaper, SavedSearch, SuggestionStatus, ToxicityResult, User, UserCredentials,
};
use drug_discovery_core::ports::{
    DatabaseService, LiteratureService, OtpDeliveryService, PortError, PortResult,
    TextGenerationService,
};
use drug_discovery_core::retry::RetryPolicy;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// Database
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    otps: HashMap<Uuid, OtpCode>,
    sessions: HashMap<String, AuthSession>,
    molecules: Vec<Molecule>,
    cost_estimations: Vec<CostEstimation>,
    toxicity_results: Vec<ToxicityResult>,
    drug_names: Vec<DrugNameSuggestion>,
    papers: Vec<ResearchPaper>,
    saved_searches: Vec<SavedSearch>,
}

#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
    fail_molecule_writes: AtomicBool,
}

impl InMemoryDb {
    /// Makes every molecule update fail until switched back off.
    pub fn fail_molecule_writes(&self, fail: bool) {
        self.fail_molecule_writes.store(fail, Ordering::SeqCst);
    }

    /// Backdates every issued verification code so it has already expired.
    pub async fn expire_otps(&self) {
        for otp in self.tables.lock().await.otps.values_mut() {
            otp.expires_at = Utc::now() - chrono::Duration::minutes(1);
        }
    }

    pub async fn molecules(&self) -> Vec<Molecule> {
        self.tables.lock().await.molecules.clone()
    }
}

fn newest_first<T: Clone>(items: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(
        &self,
        email: &str,
        username: &str,
        phone: Option<&str>,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|(u, _)| u.email == email) {
            return Err(PortError::Conflict(format!("An account for {} already exists", email)));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            phone: phone.map(str::to_string),
            is_verified: false,
        };
        t.users.push((user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let t = self.tables.lock().await;
        t.users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user_id: u.user_id,
                email: u.email.clone(),
                hashed_password: hash.clone(),
                is_verified: u.is_verified,
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let t = self.tables.lock().await;
        t.users
            .iter()
            .find(|(u, _)| u.user_id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn mark_user_verified(&self, user_id: Uuid) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        if let Some((user, _)) = t.users.iter_mut().find(|(u, _)| u.user_id == user_id) {
            user.is_verified = true;
        }
        Ok(())
    }

    async fn store_otp(&self, otp: OtpCode) -> PortResult<()> {
        self.tables.lock().await.otps.insert(otp.user_id, otp);
        Ok(())
    }

    async fn get_otp(&self, user_id: Uuid) -> PortResult<OtpCode> {
        self.tables
            .lock()
            .await
            .otps
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("No verification code issued".to_string()))
    }

    async fn delete_otp(&self, user_id: Uuid) -> PortResult<()> {
        self.tables.lock().await.otps.remove(&user_id);
        Ok(())
    }

    async fn record_failed_otp_attempt(&self, user_id: Uuid) -> PortResult<i32> {
        let mut t = self.tables.lock().await;
        let otp = t
            .otps
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound("No verification code issued".to_string()))?;
        otp.failed_attempts += 1;
        Ok(otp.failed_attempts)
    }

    async fn create_auth_session(&self, session: AuthSession) -> PortResult<()> {
        self.tables
            .lock()
            .await
            .sessions
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let t = self.tables.lock().await;
        match t.sessions.get(session_id) {
            Some(s) if s.expires_at > Utc::now() => Ok(s.user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().await.sessions.remove(session_id);
        Ok(())
    }

    async fn save_molecule(&self, molecule: Molecule) -> PortResult<()> {
        self.tables.lock().await.molecules.push(molecule);
        Ok(())
    }

    async fn list_molecules(&self, user_id: Uuid) -> PortResult<Vec<Molecule>> {
        let t = self.tables.lock().await;
        let owned: Vec<_> = t.molecules.iter().filter(|m| m.user_id == user_id).cloned().collect();
        Ok(newest_first(&owned, |m| m.created_at))
    }

    async fn find_molecule(
        &self,
        user_id: Uuid,
        title: &str,
        smiles: &str,
    ) -> PortResult<Option<Molecule>> {
        let t = self.tables.lock().await;
        Ok(t
            .molecules
            .iter()
            .find(|m| m.user_id == user_id && m.title == title && m.smiles == smiles)
            .cloned())
    }

    async fn save_cost_estimation(&self, estimation: CostEstimation) -> PortResult<()> {
        self.tables.lock().await.cost_estimations.push(estimation);
        Ok(())
    }

    async fn list_cost_estimations(&self, user_id: Uuid) -> PortResult<Vec<CostEstimation>> {
        let t = self.tables.lock().await;
        let owned: Vec<_> = t
            .cost_estimations
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |r| r.created_at))
    }

    async fn save_toxicity_result(&self, result: ToxicityResult) -> PortResult<()> {
        self.tables.lock().await.toxicity_results.push(result);
        Ok(())
    }

    async fn list_toxicity_results(&self, user_id: Uuid) -> PortResult<Vec<ToxicityResult>> {
        let t = self.tables.lock().await;
        let owned: Vec<_> = t
            .toxicity_results
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |r| r.created_at))
    }

    async fn save_drug_name_suggestion(&self, suggestion: DrugNameSuggestion) -> PortResult<()> {
        self.tables.lock().await.drug_names.push(suggestion);
        Ok(())
    }

    async fn list_drug_name_suggestions(
        &self,
        user_id: Uuid,
    ) -> PortResult<Vec<DrugNameSuggestion>> {
        let t = self.tables.lock().await;
        let owned: Vec<_> = t.drug_names.iter().filter(|s| s.user_id == user_id).cloned().collect();
        Ok(newest_first(&owned, |s| s.created_at))
    }

    async fn get_drug_name_suggestion(&self, id: Uuid) -> PortResult<DrugNameSuggestion> {
        let t = self.tables.lock().await;
        t.drug_names
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Drug name suggestion {} not found", id)))
    }

    async fn delete_pending_drug_name_suggestion(&self, id: Uuid) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        let before = t.drug_names.len();
        t.drug_names
            .retain(|s| !(s.id == id && s.status == SuggestionStatus::Pending));
        if t.drug_names.len() == before {
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
        let mut t = self.tables.lock().await;
        let suggestion_idx = t
            .drug_names
            .iter()
            .position(|s| s.id == id && s.status == SuggestionStatus::Pending)
            .ok_or_else(|| PortError::Conflict(format!("Drug name suggestion {} is no longer pending", id)))?;
        let molecule_idx = match molecule_id {
            Some(molecule_id) => {
                if self.fail_molecule_writes.load(Ordering::SeqCst) {
                    return Err(PortError::Unexpected("molecule write failed".to_string()));
                }
                let idx = t
                    .molecules
                    .iter()
                    .position(|m| m.id == molecule_id)
                    .ok_or_else(|| PortError::NotFound(format!("Molecule {} not found", molecule_id)))?;
                Some(idx)
            }
            None => None,
        };

        let suggestion = &mut t.drug_names[suggestion_idx];
        suggestion.status = SuggestionStatus::Accepted;
        suggestion.accepted_name = Some(name.to_string());
        if let Some(idx) = molecule_idx {
            t.molecules[idx].accepted_name = Some(name.to_string());
        }
        Ok(())
    }

    async fn save_research_paper(&self, paper: ResearchPaper) -> PortResult<()> {
        self.tables.lock().await.papers.push(paper);
        Ok(())
    }

    async fn list_research_papers(&self, user_id: Uuid) -> PortResult<Vec<ResearchPaper>> {
        let t = self.tables.lock().await;
        let owned: Vec<_> = t.papers.iter().filter(|p| p.user_id == user_id).cloned().collect();
        Ok(newest_first(&owned, |p| p.created_at))
    }

    async fn find_research_paper(
        &self,
        user_id: Uuid,
        title: &str,
        kind: PaperKind,
    ) -> PortResult<Option<ResearchPaper>> {
        let t = self.tables.lock().await;
        Ok(t
            .papers
            .iter()
            .find(|p| p.user_id == user_id && p.title == title && p.kind == kind)
            .cloned())
    }

    async fn save_saved_search(&self, search: SavedSearch) -> PortResult<()> {
        self.tables.lock().await.saved_searches.push(search);
        Ok(())
    }

    async fn list_saved_searches(&self, user_id: Uuid) -> PortResult<Vec<SavedSearch>> {
        let t = self.tables.lock().await;
        let owned: Vec<_> = t
            .saved_searches
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |s| s.created_at))
    }

    async fn delete_saved_search(&self, user_id: Uuid, id: Uuid) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        let before = t.saved_searches.len();
        t.saved_searches
            .retain(|s| !(s.id == id && s.user_id == user_id));
        if t.saved_searches.len() == before {
            return Err(PortError::NotFound(format!("Saved search {} not found", id)));
        }
        Ok(())
    }
}

//=========================================================================================
// Upstream Services
//=========================================================================================

/// Replays queued replies in order; errors once the queue runs dry.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<PortResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub async fn reply(&self, text: &str) {
        self.replies.lock().await.push_back(Ok(text.to_string()));
    }

    pub async fn fail(&self, message: &str) {
        self.replies
            .lock()
            .await
            .push_back(Err(PortError::Unexpected(message.to_string())));
    }

    pub async fn calls(&self) -> usize {
        self.prompts.lock().await.len()
    }

    pub async fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().await.last().cloned()
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate_text(&self, prompt: &str) -> PortResult<String> {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(PortError::Unexpected("no scripted reply".to_string())))
    }
}

#[derive(Default)]
pub struct FixedLiterature {
    pub works: Vec<RelatedWork>,
}

#[async_trait]
impl LiteratureService for FixedLiterature {
    async fn search_works(&self, _query: &str, limit: usize) -> PortResult<Vec<RelatedWork>> {
        Ok(self.works.iter().take(limit).cloned().collect())
    }
}

/// Keeps every delivered code so tests can complete verification.
#[derive(Default)]
pub struct CapturedOtps {
    codes: Mutex<HashMap<String, String>>,
}

impl CapturedOtps {
    pub async fn code_for(&self, email: &str) -> Option<String> {
        self.codes.lock().await.get(email).cloned()
    }
}

#[async_trait]
impl OtpDeliveryService for CapturedOtps {
    async fn deliver(&self, email: &str, code: &str) -> PortResult<()> {
        self.codes
            .lock()
            .await
            .insert(email.to_string(), code.to_string());
        Ok(())
    }
}

//=========================================================================================
// Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub generator: Arc<ScriptedGenerator>,
    pub otps: Arc<CapturedOtps>,
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:5173".to_string(),
        gemini_api_key: None,
        gemini_base_url: "http://unused".to_string(),
        gemini_model: "test-model".to_string(),
        openalex_base_url: "http://unused".to_string(),
        openalex_mailto: None,
        session_ttl_days: 30,
        otp_ttl_minutes: 10,
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_literature(FixedLiterature::default())
    }

    pub fn with_literature(literature: FixedLiterature) -> Self {
        let db = Arc::new(InMemoryDb::default());
        let generator = Arc::new(ScriptedGenerator::default());
        let otps = Arc::new(CapturedOtps::default());

        let state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(test_config()),
            text_generator: generator.clone(),
            literature: Arc::new(literature),
            otp_delivery: otps.clone(),
            // Same attempt count as production, without the wall-clock wait.
            variant_retry: RetryPolicy {
                max_retries: RetryPolicy::VARIANT_INFO.max_retries,
                delay: Duration::ZERO,
            },
            chat_rooms: Arc::new(ChatRooms::new()),
        });

        Self {
            router: web::router(state),
            db,
            generator,
            otps,
        }
    }

    /// Sends one request and returns the status, the JSON body (Null when empty)
    /// and any `Set-Cookie` header.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, Option<String>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json, set_cookie)
    }

    /// Signs up a fresh account and returns the `session=...` cookie pair.
    pub async fn signup(&self, email: &str) -> String {
        let (status, _, set_cookie) = self
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "username": "chemist",
                    "password": "correct horse battery staple",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        session_pair(&set_cookie.expect("signup sets a cookie"))
    }
}

/// Reduces a `Set-Cookie` value to the `name=value` pair a browser would send back.
pub fn session_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .trim()
        .to_string()
}
