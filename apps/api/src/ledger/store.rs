//! Profile store — the persistence seam for accounts, referral events, and
//! generated documents.
//!
//! The ledger is stateless per call and multiple API instances may run
//! concurrently, so every correctness-bearing write here is a single atomic
//! statement against the store: the quota consume is one conditional UPDATE,
//! and referral uniqueness is a unique index absorbed via ON CONFLICT.
//! No application-level locking.
//!
//! `AppState` holds an `Arc<dyn ProfileStore>`. Default: `PgProfileStore`.
//! Swap via STORE_BACKEND env (`MemoryProfileStore` for tests/local dev).

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::account::{AccountRow, NewAccount};
use crate::models::document::{
    CoverLetterRow, EmailRow, NewCoverLetter, NewEmail, NewResumeAnalysis, RecentDocuments,
    ResumeAnalysisRow,
};
use crate::models::referral::{NewReferralEvent, ReferralEventRow};

/// Outcome of the atomic conditional quota consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaConsume {
    /// Pro account — exempt from metering, nothing was incremented.
    Unmetered,
    /// Pre-increment count was below the limit; `count` is the new value.
    Consumed { count: i32 },
    /// Cap already spent; nothing was incremented.
    Exhausted { count: i32 },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    // ── Accounts ────────────────────────────────────────────────────────────

    async fn get_account(&self, id: Uuid) -> Result<Option<AccountRow>, AppError>;

    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<AccountRow>, AppError>;

    /// Case-sensitive exact match on the referral code.
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<AccountRow>, AppError>;

    async fn insert_account(&self, account: NewAccount) -> Result<AccountRow, AppError>;

    /// Unconditional atomic `+1`. Returns the new count.
    /// NOT idempotent — callers invoke it exactly once per consumed action.
    async fn increment_usage(&self, id: Uuid) -> Result<i32, AppError>;

    /// Atomic conditional consume: increments only if the account is
    /// non-pro and the pre-increment count is below `limit`, as one
    /// read-modify-write. Closes the check-then-increment race.
    async fn consume_quota(&self, id: Uuid, limit: i32) -> Result<QuotaConsume, AppError>;

    async fn set_pro(&self, id: Uuid, is_pro: bool) -> Result<AccountRow, AppError>;

    // ── Referral events ─────────────────────────────────────────────────────

    /// Persists a referral event. Returns `None` if an event already exists
    /// for this referee — the second writer loses, silently.
    async fn insert_referral_event(
        &self,
        event: NewReferralEvent,
    ) -> Result<Option<ReferralEventRow>, AppError>;

    async fn referrals_by_referrer(
        &self,
        referrer_id: Uuid,
    ) -> Result<Vec<ReferralEventRow>, AppError>;

    // ── Generated documents ─────────────────────────────────────────────────

    async fn insert_cover_letter(&self, doc: NewCoverLetter) -> Result<CoverLetterRow, AppError>;

    async fn insert_email(&self, doc: NewEmail) -> Result<EmailRow, AppError>;

    async fn insert_resume_analysis(
        &self,
        doc: NewResumeAnalysis,
    ) -> Result<ResumeAnalysisRow, AppError>;

    async fn recent_documents(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<RecentDocuments, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PgProfileStore — production backend
// ────────────────────────────────────────────────────────────────────────────

/// PostgreSQL-backed profile store.
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<AccountRow>, AppError> {
        Ok(
            sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<AccountRow>, AppError> {
        Ok(
            sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<AccountRow>, AppError> {
        Ok(
            sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE referral_code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_account(&self, account: NewAccount) -> Result<AccountRow, AppError> {
        Ok(sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts
                (id, external_id, email, display_name, photo_url, referral_code, referred_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(&account.external_id)
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.photo_url)
        .bind(&account.referral_code)
        .bind(&account.referred_by)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn increment_usage(&self, id: Uuid) -> Result<i32, AppError> {
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET free_usage_count = free_usage_count + 1
            WHERE id = $1
            RETURNING free_usage_count
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        count.ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))
    }

    async fn consume_quota(&self, id: Uuid, limit: i32) -> Result<QuotaConsume, AppError> {
        // Single-statement conditional increment. Concurrent callers at the
        // cap boundary serialize on the row; exactly one wins the last unit.
        let consumed: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET free_usage_count = free_usage_count + 1
            WHERE id = $1 AND is_pro = FALSE AND free_usage_count < $2
            RETURNING free_usage_count
            "#,
        )
        .bind(id)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(count) = consumed {
            return Ok(QuotaConsume::Consumed { count });
        }

        // No row matched: the account is pro, exhausted, or missing.
        let account = self
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))?;

        if account.is_pro {
            Ok(QuotaConsume::Unmetered)
        } else {
            Ok(QuotaConsume::Exhausted {
                count: account.free_usage_count,
            })
        }
    }

    async fn set_pro(&self, id: Uuid, is_pro: bool) -> Result<AccountRow, AppError> {
        sqlx::query_as::<_, AccountRow>(
            "UPDATE accounts SET is_pro = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_pro)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))
    }

    async fn insert_referral_event(
        &self,
        event: NewReferralEvent,
    ) -> Result<Option<ReferralEventRow>, AppError> {
        // The unique index on referee_id makes a concurrent duplicate a
        // benign no-op rather than an error surfaced to the signup flow.
        Ok(sqlx::query_as::<_, ReferralEventRow>(
            r#"
            INSERT INTO referral_events (id, referrer_id, referee_id, status, bonus)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (referee_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(event.referrer_id)
        .bind(event.referee_id)
        .bind(event.status)
        .bind(event.bonus)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn referrals_by_referrer(
        &self,
        referrer_id: Uuid,
    ) -> Result<Vec<ReferralEventRow>, AppError> {
        Ok(sqlx::query_as::<_, ReferralEventRow>(
            "SELECT * FROM referral_events WHERE referrer_id = $1 ORDER BY created_at DESC",
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_cover_letter(&self, doc: NewCoverLetter) -> Result<CoverLetterRow, AppError> {
        Ok(sqlx::query_as::<_, CoverLetterRow>(
            r#"
            INSERT INTO cover_letters
                (id, account_id, job_title, company_name, content, tone, language)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(doc.id)
        .bind(doc.account_id)
        .bind(&doc.job_title)
        .bind(&doc.company_name)
        .bind(&doc.content)
        .bind(&doc.tone)
        .bind(&doc.language)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_email(&self, doc: NewEmail) -> Result<EmailRow, AppError> {
        Ok(sqlx::query_as::<_, EmailRow>(
            r#"
            INSERT INTO emails (id, account_id, kind, subject, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(doc.id)
        .bind(doc.account_id)
        .bind(&doc.kind)
        .bind(&doc.subject)
        .bind(&doc.content)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_resume_analysis(
        &self,
        doc: NewResumeAnalysis,
    ) -> Result<ResumeAnalysisRow, AppError> {
        Ok(sqlx::query_as::<_, ResumeAnalysisRow>(
            r#"
            INSERT INTO resume_analyses
                (id, account_id, file_name, score, suggestions, keyword_matches, missing_keywords)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(doc.id)
        .bind(doc.account_id)
        .bind(&doc.file_name)
        .bind(doc.score)
        .bind(&doc.suggestions)
        .bind(&doc.keyword_matches)
        .bind(&doc.missing_keywords)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn recent_documents(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<RecentDocuments, AppError> {
        let cover_letters = sqlx::query_as::<_, CoverLetterRow>(
            "SELECT * FROM cover_letters WHERE account_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let emails = sqlx::query_as::<_, EmailRow>(
            "SELECT * FROM emails WHERE account_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let resume_analyses = sqlx::query_as::<_, ResumeAnalysisRow>(
            "SELECT * FROM resume_analyses WHERE account_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(RecentDocuments {
            cover_letters,
            emails,
            resume_analyses,
        })
    }
}
