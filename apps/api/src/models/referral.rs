use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a referral event. Events are written as `Completed`
/// at creation and never transitioned; `Pending` exists for wire
/// compatibility with older records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "referral_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Completed,
}

/// One successful referral redemption. At most one row exists per
/// `referee_id` — enforced by a unique index, not application logic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferralEventRow {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referee_id: Uuid,
    pub status: ReferralStatus,
    pub bonus: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReferralEvent {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referee_id: Uuid,
    pub status: ReferralStatus,
    pub bonus: i32,
}

/// Aggregate view of an account's referral activity.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralStats {
    pub total_referrals: usize,
    pub total_bonus: i64,
    pub events: Vec<ReferralEventRow>,
}
