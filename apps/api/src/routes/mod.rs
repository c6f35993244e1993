pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers as generation;
use crate::ledger::handlers as accounts;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Account & ledger API
        .route("/api/v1/auth/session", post(accounts::handle_create_session))
        .route("/api/v1/accounts/:id", get(accounts::handle_get_account))
        .route(
            "/api/v1/accounts/:id/usage",
            post(accounts::handle_record_usage),
        )
        .route(
            "/api/v1/accounts/:id/upgrade",
            post(accounts::handle_upgrade),
        )
        .route(
            "/api/v1/accounts/:id/referrals",
            get(accounts::handle_referral_stats),
        )
        .route(
            "/api/v1/accounts/:id/documents",
            get(accounts::handle_recent_documents),
        )
        // Generation API (quota-gated)
        .route(
            "/api/v1/generate/cover-letter",
            post(generation::handle_generate_cover_letter),
        )
        .route(
            "/api/v1/generate/email",
            post(generation::handle_generate_email),
        )
        .route(
            "/api/v1/generate/resume-analysis",
            post(generation::handle_resume_analysis),
        )
        .with_state(state)
}
