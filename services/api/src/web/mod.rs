pub mod auth;
pub mod chat;
pub mod drug_names;
pub mod middleware;
pub mod molecules;
pub mod protocol;
pub mod reports;
pub mod research;
pub mod rest;
pub mod saved_searches;
pub mod state;
pub mod targets;
pub mod ws_handler;

pub use middleware::require_auth;
pub use ws_handler::ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds the API router. CORS, body limits and Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/verify", post(auth::verify_otp_handler))
        .route("/auth/resend-otp", post(auth::resend_otp_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/molecules",
            post(molecules::create_molecule_handler).get(molecules::list_molecules_handler),
        )
        .route("/molecules/report", post(molecules::molecule_report_handler))
        .route("/variants/info", post(reports::variant_info_handler))
        .route(
            "/cost-estimations",
            post(reports::create_cost_estimation_handler)
                .get(reports::list_cost_estimations_handler),
        )
        .route(
            "/toxicity",
            post(reports::create_toxicity_handler).get(reports::list_toxicity_handler),
        )
        .route(
            "/drug-names",
            post(drug_names::suggest_names_handler).get(drug_names::list_names_handler),
        )
        .route("/drug-names/{id}", delete(drug_names::delete_names_handler))
        .route("/drug-names/{id}/accept", post(drug_names::accept_name_handler))
        .route("/research-papers", get(research::list_papers_handler))
        .route(
            "/research-papers/generate",
            post(research::generate_paper_handler),
        )
        .route(
            "/research-papers/related",
            post(research::related_papers_handler),
        )
        .route("/targets/predict", post(targets::predict_targets_handler))
        .route(
            "/saved-searches",
            post(saved_searches::create_saved_search_handler)
                .get(saved_searches::list_saved_searches_handler),
        )
        .route(
            "/saved-searches/{id}",
            delete(saved_searches::delete_saved_search_handler),
        )
        .route("/ws/chat", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
