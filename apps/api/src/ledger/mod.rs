//! Quota & Referral Ledger — free-tier metering and referral attribution.
//!
//! Owns two invariants:
//! 1. A non-pro account consumes at most FREE_LIMIT gated actions. The
//!    enforcement point is `consume_quota` — one atomic conditional
//!    increment in the store, NOT a read-check-then-increment sequence.
//! 2. A referral code grants a one-time bonus to its owner when redeemed by
//!    exactly one new account, at signup only. At most one event per
//!    referee, enforced by the store's unique index.
//!
//! All operations are request-scoped and stateless; the store handle is
//! passed in explicitly so tests can substitute `MemoryProfileStore`.

pub mod handlers;
pub mod memory;
pub mod store;

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::store::{ProfileStore, QuotaConsume};
use crate::models::account::{AccountRow, IdentityRecord, NewAccount};
use crate::models::referral::{NewReferralEvent, ReferralEventRow, ReferralStats, ReferralStatus};

/// Gated actions a non-pro account may consume, total. No periodic reset.
pub const FREE_LIMIT: i32 = 3;
/// Reward units per completed referral. Unit semantics live outside the
/// ledger (percent-off or bonus actions).
pub const REFERRAL_BONUS: i32 = 10;
pub const REFERRAL_CODE_LENGTH: usize = 6;

/// Lookup-retry attempts when minting a referral code before giving up and
/// letting the unique index reject the insert.
const MAX_CODE_ATTEMPTS: usize = 8;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// ────────────────────────────────────────────────────────────────────────────
// Quota
// ────────────────────────────────────────────────────────────────────────────

/// Snapshot quota check. Pure — evaluates the given account state only.
/// Display and pre-flight use; the authoritative gate is `consume_quota`.
pub fn check_quota(account: &AccountRow) -> bool {
    account.is_pro || account.free_usage_count < FREE_LIMIT
}

/// Remaining free actions, clamped to >= 0. Display-only, not authoritative.
pub fn remaining_free(account: &AccountRow) -> i32 {
    (FREE_LIMIT - account.free_usage_count).max(0)
}

/// Unconditional `+1` for callers that completed a gated action out-of-band.
/// Not idempotent: exactly one call per consumed action. Store errors
/// propagate — swallowing one here would let an action go uncounted.
pub async fn record_usage(store: &dyn ProfileStore, account_id: Uuid) -> Result<i32, AppError> {
    store.increment_usage(account_id).await
}

/// The hardened consumption path: one atomic conditional increment against
/// the store. Two concurrent requests at `FREE_LIMIT - 1` cannot both win.
pub async fn consume_quota(
    store: &dyn ProfileStore,
    account_id: Uuid,
) -> Result<QuotaConsume, AppError> {
    store.consume_quota(account_id, FREE_LIMIT).await
}

/// Flips the account to pro. Idempotent. The payment/subscription event that
/// triggers this lives outside the ledger.
pub async fn upgrade_to_pro(
    store: &dyn ProfileStore,
    account_id: Uuid,
) -> Result<AccountRow, AppError> {
    let account = store.set_pro(account_id, true).await?;
    info!("Account {} upgraded to Pro", account.id);
    Ok(account)
}

// ────────────────────────────────────────────────────────────────────────────
// Signup & referral attribution
// ────────────────────────────────────────────────────────────────────────────

/// Creates the account for a freshly authenticated identity, or returns the
/// existing one unchanged (idempotent on re-authentication — referral
/// redemption is never re-attempted for an existing account).
///
/// `referral_code_input` is stored verbatim as `referred_by` whether or not
/// it resolves to an owner; redemption is best-effort and its failure never
/// fails signup.
pub async fn create_account(
    store: &dyn ProfileStore,
    identity: IdentityRecord,
    referral_code_input: Option<String>,
) -> Result<AccountRow, AppError> {
    if identity.external_id.trim().is_empty() {
        return Err(AppError::Validation(
            "external_id cannot be empty".to_string(),
        ));
    }
    if identity.email.trim().is_empty() {
        return Err(AppError::Validation("email cannot be empty".to_string()));
    }

    if let Some(existing) = store.find_by_external_id(&identity.external_id).await? {
        return Ok(existing);
    }

    let referral_code = mint_referral_code(store).await?;
    let referred_by = referral_code_input.filter(|c| !c.is_empty());

    let account = store
        .insert_account(NewAccount {
            id: Uuid::new_v4(),
            external_id: identity.external_id,
            email: identity.email,
            display_name: identity.display_name,
            photo_url: identity.photo_url,
            referral_code,
            referred_by: referred_by.clone(),
        })
        .await?;

    info!("Created account {} ({})", account.id, account.email);

    if let Some(code) = referred_by {
        match redeem_referral(store, &code, account.id).await {
            Ok(Some(event)) => info!(
                "Referral {} redeemed: referrer {} -> referee {}",
                event.id, event.referrer_id, event.referee_id
            ),
            Ok(None) => {}
            Err(e) => warn!("Referral redemption failed for account {}: {e}", account.id),
        }
    }

    Ok(account)
}

/// Redeems `code` for a newly created account. Unknown or mistyped codes
/// return `None` with no error — the signup surface must not reveal which
/// codes are valid. Self-referral returns `None`. A duplicate redemption for
/// the same referee is absorbed by the store and also returns `None`.
///
/// Never retried automatically: a caller retry after a transient failure
/// relies on the referee uniqueness constraint, not on this function.
pub async fn redeem_referral(
    store: &dyn ProfileStore,
    code: &str,
    referee_id: Uuid,
) -> Result<Option<ReferralEventRow>, AppError> {
    let Some(referrer) = store.find_by_referral_code(code).await? else {
        return Ok(None);
    };

    if referrer.id == referee_id {
        warn!("Self-referral rejected for account {referee_id}");
        return Ok(None);
    }

    store
        .insert_referral_event(NewReferralEvent {
            id: Uuid::new_v4(),
            referrer_id: referrer.id,
            referee_id,
            status: ReferralStatus::Completed,
            bonus: REFERRAL_BONUS,
        })
        .await
}

/// Referral activity summary for the code owner's dashboard.
pub async fn referral_stats(
    store: &dyn ProfileStore,
    account_id: Uuid,
) -> Result<ReferralStats, AppError> {
    let account = store
        .get_account(account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {account_id} not found")))?;

    let events = store.referrals_by_referrer(account.id).await?;
    let total_bonus = events.iter().map(|e| i64::from(e.bonus)).sum();

    Ok(ReferralStats {
        total_referrals: events.len(),
        total_bonus,
        events,
    })
}

/// Mints a referral code not currently owned by any account. Collisions are
/// detected by lookup with bounded retries; the unique index on
/// `accounts.referral_code` is the backstop if two instances race.
async fn mint_referral_code(store: &dyn ProfileStore) -> Result<String, AppError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_referral_code();
        if store.find_by_referral_code(&code).await?.is_none() {
            return Ok(code);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not mint a unique referral code after {MAX_CODE_ATTEMPTS} attempts"
    )))
}

/// Uppercase alphanumeric code of REFERRAL_CODE_LENGTH chars, derived from
/// v4 uuid bytes.
fn generate_referral_code() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(REFERRAL_CODE_LENGTH)
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::memory::MemoryProfileStore;
    use chrono::Utc;

    fn identity(external_id: &str) -> IdentityRecord {
        IdentityRecord {
            external_id: external_id.to_string(),
            email: format!("{external_id}@example.com"),
            display_name: Some("Test User".to_string()),
            photo_url: None,
        }
    }

    fn snapshot(is_pro: bool, free_usage_count: i32) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4(),
            external_id: "ext".to_string(),
            email: "ext@example.com".to_string(),
            display_name: None,
            photo_url: None,
            is_pro,
            free_usage_count,
            referral_code: "ABC123".to_string(),
            referred_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_check_quota_free_below_limit() {
        assert!(check_quota(&snapshot(false, 0)));
        assert!(check_quota(&snapshot(false, FREE_LIMIT - 1)));
    }

    #[test]
    fn test_check_quota_free_at_limit() {
        assert!(!check_quota(&snapshot(false, FREE_LIMIT)));
        assert!(!check_quota(&snapshot(false, FREE_LIMIT + 5)));
    }

    #[test]
    fn test_check_quota_pro_exempt_regardless_of_count() {
        assert!(check_quota(&snapshot(true, 0)));
        assert!(check_quota(&snapshot(true, FREE_LIMIT)));
        assert!(check_quota(&snapshot(true, 100)));
    }

    #[test]
    fn test_remaining_free_clamps_to_zero() {
        assert_eq!(remaining_free(&snapshot(false, 0)), FREE_LIMIT);
        assert_eq!(remaining_free(&snapshot(false, 2)), 1);
        assert_eq!(remaining_free(&snapshot(false, FREE_LIMIT)), 0);
        assert_eq!(remaining_free(&snapshot(false, FREE_LIMIT + 4)), 0);
    }

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..100 {
            let code = generate_referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LENGTH);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_create_account_defaults() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("u1"), None).await.unwrap();

        assert!(!account.is_pro);
        assert_eq!(account.free_usage_count, 0);
        assert_eq!(account.referral_code.len(), REFERRAL_CODE_LENGTH);
        assert_eq!(account.referred_by, None);
    }

    #[tokio::test]
    async fn test_create_account_rejects_blank_identity() {
        let store = MemoryProfileStore::new();
        assert!(matches!(
            create_account(&store, identity(" "), None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_account_idempotent_on_reauth() {
        let store = MemoryProfileStore::new();
        let first = create_account(&store, identity("u1"), None).await.unwrap();
        record_usage(&store, first.id).await.unwrap();

        // Re-authentication returns the existing record unchanged.
        let second = create_account(&store, identity("u1"), None).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.free_usage_count, 1);
        assert_eq!(second.referral_code, first.referral_code);
    }

    #[tokio::test]
    async fn test_reauth_does_not_reattempt_referral() {
        let store = MemoryProfileStore::new();
        let referrer = create_account(&store, identity("a"), None).await.unwrap();
        let referee = create_account(&store, identity("b"), None).await.unwrap();

        // A code supplied on a later re-authentication is ignored entirely.
        create_account(&store, identity("b"), Some(referrer.referral_code.clone()))
            .await
            .unwrap();

        let refreshed = store.get_account(referee.id).await.unwrap().unwrap();
        assert_eq!(refreshed.referred_by, None);
        let stats = referral_stats(&store, referrer.id).await.unwrap();
        assert_eq!(stats.total_referrals, 0);
    }

    #[tokio::test]
    async fn test_unknown_code_still_creates_usable_account() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("u1"), Some("NOTACODE123".to_string()))
            .await
            .unwrap();

        // Stored verbatim for audit, no event, account fully usable.
        assert_eq!(account.referred_by.as_deref(), Some("NOTACODE123"));
        assert!(check_quota(&account));

        let event = redeem_referral(&store, "NOTACODE123", account.id)
            .await
            .unwrap();
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_signup_with_valid_code_creates_event() {
        let store = MemoryProfileStore::new();
        let referrer = create_account(&store, identity("a"), None).await.unwrap();

        let referee = create_account(&store, identity("b"), Some(referrer.referral_code.clone()))
            .await
            .unwrap();

        let stats = referral_stats(&store, referrer.id).await.unwrap();
        assert_eq!(stats.total_referrals, 1);
        assert_eq!(stats.total_bonus, i64::from(REFERRAL_BONUS));

        let event = &stats.events[0];
        assert_eq!(event.referrer_id, referrer.id);
        assert_eq!(event.referee_id, referee.id);
        assert_eq!(event.bonus, REFERRAL_BONUS);
        assert_eq!(event.status, ReferralStatus::Completed);
    }

    #[tokio::test]
    async fn test_same_code_two_referees_two_events() {
        let store = MemoryProfileStore::new();
        let referrer = create_account(&store, identity("a"), None).await.unwrap();

        create_account(&store, identity("b"), Some(referrer.referral_code.clone()))
            .await
            .unwrap();
        create_account(&store, identity("c"), Some(referrer.referral_code.clone()))
            .await
            .unwrap();

        let stats = referral_stats(&store, referrer.id).await.unwrap();
        assert_eq!(stats.total_referrals, 2);
        let referees: Vec<Uuid> = stats.events.iter().map(|e| e.referee_id).collect();
        assert_ne!(referees[0], referees[1]);
    }

    #[tokio::test]
    async fn test_duplicate_referee_redeems_at_most_once() {
        let store = MemoryProfileStore::new();
        let referrer = create_account(&store, identity("a"), None).await.unwrap();
        let referee = create_account(&store, identity("b"), None).await.unwrap();

        let first = redeem_referral(&store, &referrer.referral_code, referee.id)
            .await
            .unwrap();
        assert!(first.is_some());

        // Retried request: second writer loses, no error escalated.
        let second = redeem_referral(&store, &referrer.referral_code, referee.id)
            .await
            .unwrap();
        assert!(second.is_none());

        let stats = referral_stats(&store, referrer.id).await.unwrap();
        assert_eq!(stats.total_referrals, 1);
    }

    #[tokio::test]
    async fn test_self_referral_rejected() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("a"), None).await.unwrap();

        let event = redeem_referral(&store, &account.referral_code, account.id)
            .await
            .unwrap();
        assert!(event.is_none());

        let stats = referral_stats(&store, account.id).await.unwrap();
        assert_eq!(stats.total_referrals, 0);
    }

    #[tokio::test]
    async fn test_referral_code_lookup_is_case_sensitive() {
        let store = MemoryProfileStore::new();
        let referrer = create_account(&store, identity("a"), None).await.unwrap();
        let referee = create_account(&store, identity("b"), None).await.unwrap();

        let lowered = referrer.referral_code.to_lowercase();
        if lowered != referrer.referral_code {
            let event = redeem_referral(&store, &lowered, referee.id).await.unwrap();
            assert!(event.is_none());
        }
    }

    #[tokio::test]
    async fn test_record_usage_monotonic_increments() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("u1"), None).await.unwrap();

        assert_eq!(record_usage(&store, account.id).await.unwrap(), 1);
        assert_eq!(record_usage(&store, account.id).await.unwrap(), 2);
        assert_eq!(record_usage(&store, account.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_record_usage_unknown_account_is_not_found() {
        let store = MemoryProfileStore::new();
        assert!(matches!(
            record_usage(&store, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_consume_quota_free_account_caps_at_limit() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("u1"), None).await.unwrap();

        for expected in 1..=FREE_LIMIT {
            let outcome = consume_quota(&store, account.id).await.unwrap();
            assert_eq!(outcome, QuotaConsume::Consumed { count: expected });
        }

        let outcome = consume_quota(&store, account.id).await.unwrap();
        assert_eq!(outcome, QuotaConsume::Exhausted { count: FREE_LIMIT });

        // Rejected attempts never move the counter.
        let refreshed = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(refreshed.free_usage_count, FREE_LIMIT);
    }

    #[tokio::test]
    async fn test_consume_quota_pro_is_unmetered() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("u1"), None).await.unwrap();
        upgrade_to_pro(&store, account.id).await.unwrap();

        for _ in 0..10 {
            let outcome = consume_quota(&store, account.id).await.unwrap();
            assert_eq!(outcome, QuotaConsume::Unmetered);
        }

        let refreshed = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(refreshed.free_usage_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_consumes_exactly_one_wins_last_unit() {
        let store = Arc::new(MemoryProfileStore::new());
        let account = create_account(store.as_ref(), identity("u1"), None)
            .await
            .unwrap();

        // Sit one below the cap, then race K attempts for the last unit.
        for _ in 0..FREE_LIMIT - 1 {
            consume_quota(store.as_ref(), account.id).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let id = account.id;
            handles.push(tokio::spawn(async move {
                consume_quota(store.as_ref(), id).await.unwrap()
            }));
        }

        let mut consumed = 0;
        let mut exhausted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                QuotaConsume::Consumed { .. } => consumed += 1,
                QuotaConsume::Exhausted { .. } => exhausted += 1,
                QuotaConsume::Unmetered => panic!("free account reported unmetered"),
            }
        }

        assert_eq!(consumed, 1);
        assert_eq!(exhausted, 7);

        let refreshed = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(refreshed.free_usage_count, FREE_LIMIT);
    }

    #[tokio::test]
    async fn test_scenario_free_account_exhausts_after_three_actions() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("a"), None).await.unwrap();
        assert!(check_quota(&account));

        for expected in 1..=3 {
            let count = record_usage(&store, account.id).await.unwrap();
            assert_eq!(count, expected);
        }

        let refreshed = store.get_account(account.id).await.unwrap().unwrap();
        assert!(!check_quota(&refreshed));
        assert_eq!(remaining_free(&refreshed), 0);
    }

    #[tokio::test]
    async fn test_upgrade_to_pro_is_idempotent() {
        let store = MemoryProfileStore::new();
        let account = create_account(&store, identity("u1"), None).await.unwrap();

        let upgraded = upgrade_to_pro(&store, account.id).await.unwrap();
        assert!(upgraded.is_pro);
        let again = upgrade_to_pro(&store, account.id).await.unwrap();
        assert!(again.is_pro);
    }
}
