use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub is_pro: bool,
    pub free_usage_count: i32,
    pub referral_code: String,
    /// The referral code supplied at signup, stored verbatim. Not validated
    /// against the ledger — a lookup key for audit, not an ownership relation.
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A freshly authenticated identity as delivered by the identity provider
/// callback. The API trusts the upstream provider; only shape is validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Insert parameters for a new account. `is_pro`, `free_usage_count`, and
/// `created_at` are set by the store (false, 0, now).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<String>,
}
