//! Axum route handlers for the account / ledger API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger;
use crate::ledger::store::ProfileStore;
use crate::models::account::{AccountRow, IdentityRecord};
use crate::models::document::RecentDocuments;
use crate::models::referral::ReferralStats;
use crate::state::AppState;

/// History page size per document kind.
const HISTORY_LIMIT: i64 = 20;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// Referral code the new user typed at signup, if any.
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: AccountRow,
    /// Display value only (`FREE_LIMIT - free_usage_count`, clamped). The
    /// authoritative gate is the conditional consume on generation.
    pub remaining_free: i32,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub free_usage_count: i32,
}

impl From<AccountRow> for AccountResponse {
    fn from(account: AccountRow) -> Self {
        let remaining_free = ledger::remaining_free(&account);
        AccountResponse {
            account,
            remaining_free,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/session
///
/// Identity-provider callback target: creates the account on first sign-in,
/// returns the existing one unchanged on re-authentication.
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let identity = IdentityRecord {
        external_id: request.external_id,
        email: request.email,
        display_name: request.display_name,
        photo_url: request.photo_url,
    };

    let account =
        ledger::create_account(state.store.as_ref(), identity, request.referral_code).await?;

    Ok(Json(account.into()))
}

/// GET /api/v1/accounts/:id
pub async fn handle_get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state
        .store
        .get_account(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))?;

    Ok(Json(account.into()))
}

/// POST /api/v1/accounts/:id/usage
///
/// Records one consumed gated action for callers that completed the action
/// out-of-band. Gated generation endpoints do NOT go through here — they
/// consume atomically inside the pipeline.
pub async fn handle_record_usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UsageResponse>, AppError> {
    let free_usage_count = ledger::record_usage(state.store.as_ref(), id).await?;
    Ok(Json(UsageResponse { free_usage_count }))
}

/// POST /api/v1/accounts/:id/upgrade
///
/// Subscription hook: flips the account to pro. Payment handling is external.
pub async fn handle_upgrade(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = ledger::upgrade_to_pro(state.store.as_ref(), id).await?;
    Ok(Json(account.into()))
}

/// GET /api/v1/accounts/:id/referrals
pub async fn handle_referral_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReferralStats>, AppError> {
    let stats = ledger::referral_stats(state.store.as_ref(), id).await?;
    Ok(Json(stats))
}

/// GET /api/v1/accounts/:id/documents
///
/// History tracking is a pro feature; free accounts get 403.
pub async fn handle_recent_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecentDocuments>, AppError> {
    let account = state
        .store
        .get_account(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))?;

    if !account.is_pro {
        return Err(AppError::Forbidden);
    }

    let documents = state
        .store
        .recent_documents(account.id, HISTORY_LIMIT)
        .await?;

    Ok(Json(documents))
}
