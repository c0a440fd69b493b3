//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: signup with email verification codes, login,
//! logout, and the profile check.

use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use drug_discovery_core::domain::{require_field, AuthSession, OtpCode, User};
use drug_discovery_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_failure, HandlerError};
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Wrong guesses allowed against one code before it is discarded.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

const OTP_SPACE: u32 = 1_000_000;
/// Largest multiple of `OTP_SPACE` a `u32` can hold; draws at or above it are redrawn.
const OTP_ACCEPT_BELOW: u32 = u32::MAX - (u32::MAX % OTP_SPACE);

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub is_verified: bool,
}

impl From<User> for AuthResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            username: user.username,
            phone: user.phone,
            is_verified: user.is_verified,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn hash_secret(secret: &str) -> Result<String, HandlerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash secret: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })
}

fn verify_secret(secret: &str, hash: &str) -> Result<bool, HandlerError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        error!("Failed to parse stored hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

/// A uniformly random six-digit code, zero-padded.
fn generate_otp() -> String {
    loop {
        let draw = OsRng.next_u32();
        if draw < OTP_ACCEPT_BELOW {
            return format!("{:06}", draw % OTP_SPACE);
        }
    }
}

fn session_cookie(session_id: &str, ttl: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        ttl.num_seconds()
    )
}

/// Reads the session id out of a `Cookie` header value.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, HandlerError> {
    let ttl = Duration::days(state.config.session_ttl_days);
    let session = AuthSession {
        id: Uuid::new_v4().to_string(),
        user_id,
        expires_at: Utc::now() + ttl,
    };
    let cookie = session_cookie(&session.id, ttl);
    state
        .db
        .create_auth_session(session)
        .await
        .map_err(|e| port_failure("Failed to create session", e))?;
    Ok(cookie)
}

/// Stores a fresh hashed code for the user and hands the plain code to delivery.
async fn issue_otp(state: &AppState, user_id: Uuid, email: &str) -> Result<(), HandlerError> {
    let code = generate_otp();
    let otp = OtpCode {
        user_id,
        code_hash: hash_secret(&code)?,
        expires_at: Utc::now() + Duration::minutes(state.config.otp_ttl_minutes),
        failed_attempts: 0,
    };
    state
        .db
        .store_otp(otp)
        .await
        .map_err(|e| port_failure("Failed to store verification code", e))?;
    state
        .otp_delivery
        .deliver(email, &code)
        .await
        .map_err(|e| port_failure("Failed to deliver verification code", e))
}

fn bad_request(e: impl ToString) -> HandlerError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new, unverified user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created; a verification code was issued", body = AuthResponse),
        (status = 400, description = "Missing field"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    // 1. Validate input
    let email = require_field("email", &req.email).map_err(bad_request)?;
    let username = require_field("username", &req.username).map_err(bad_request)?;
    require_field("password", &req.password).map_err(bad_request)?;
    let phone = req
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    // 2. Hash the password and create the user
    let password_hash = hash_secret(&req.password)?;
    let user = state
        .db
        .create_user(&email, &username, phone, &password_hash)
        .await
        .map_err(|e| port_failure("Failed to create user", e))?;
    info!(user_id = %user.user_id, "User signed up");

    // 3. Issue the first verification code
    issue_otp(&state, user.user_id, &user.email).await?;

    // 4. Start a session
    let cookie = start_session(&state, user.user_id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(user)),
    ))
}

/// POST /auth/verify - Confirm the email address with the issued code
#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account verified", body = AuthResponse),
        (status = 400, description = "Invalid or expired code, or too many wrong guesses"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn verify_otp_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let invalid = || bad_request("Invalid verification code");

    let creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            other => port_failure("Failed to get user", other),
        })?;

    let otp = state.db.get_otp(creds.user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => invalid(),
        other => port_failure("Failed to load verification code", other),
    })?;

    if otp.expires_at <= Utc::now() {
        return Err(bad_request("Verification code expired"));
    }
    if !verify_secret(req.otp.trim(), &otp.code_hash)? {
        let attempts = state
            .db
            .record_failed_otp_attempt(creds.user_id)
            .await
            .map_err(|e| port_failure("Failed to record verification attempt", e))?;
        if attempts >= MAX_OTP_ATTEMPTS {
            state
                .db
                .delete_otp(creds.user_id)
                .await
                .map_err(|e| port_failure("Failed to clear verification code", e))?;
            info!(user_id = %creds.user_id, attempts, "Verification code discarded");
            return Err(bad_request(
                "Too many failed attempts; request a new verification code",
            ));
        }
        return Err(invalid());
    }

    state
        .db
        .mark_user_verified(creds.user_id)
        .await
        .map_err(|e| port_failure("Failed to verify user", e))?;
    state
        .db
        .delete_otp(creds.user_id)
        .await
        .map_err(|e| port_failure("Failed to clear verification code", e))?;

    let user = state
        .db
        .get_user_by_id(creds.user_id)
        .await
        .map_err(|e| port_failure("Failed to get user", e))?;
    info!(user_id = %user.user_id, "User verified");

    Ok(Json(AuthResponse::from(user)))
}

/// POST /auth/resend-otp - Issue a new verification code
#[utoipa::path(
    post,
    path = "/auth/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "A new code was issued", body = MessageResponse),
        (status = 404, description = "Unknown email"),
        (status = 409, description = "Account already verified")
    )
)]
pub async fn resend_otp_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResendOtpRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|e| port_failure("Failed to get user", e))?;

    if creds.is_verified {
        return Err((StatusCode::CONFLICT, "Account is already verified".to_string()));
    }

    issue_otp(&state, creds.user_id, &creds.email).await?;

    Ok(Json(MessageResponse {
        message: "Verification code sent".to_string(),
    }))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let unauthorized = || (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string());

    // 1. Get user by email
    let user_creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|e| {
            error!("Failed to get user: {:?}", e);
            unauthorized()
        })?;

    // 2. Verify password
    if !verify_secret(&req.password, &user_creds.hashed_password)? {
        return Err(unauthorized());
    }

    // 3. Start a session
    let cookie = start_session(&state, user_creds.user_id).await?;

    let user = state
        .db
        .get_user_by_id(user_creds.user_id)
        .await
        .map_err(|e| port_failure("Failed to get user", e))?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(user)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let no_session = || (StatusCode::UNAUTHORIZED, "No session found".to_string());

    let auth_session_id = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookies)
        .ok_or_else(no_session)?;

    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| port_failure("Failed to logout", e))?;

    let cookie = session_cookie("", Duration::zero());

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/me - Profile of the logged-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state
        .db
        .get_user_by_id(user_id)
        .await
        .map_err(|e| port_failure("Failed to get user", e))?;
    Ok(Json(AuthResponse::from(user)))
}
