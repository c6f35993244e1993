//! In-memory profile store — the test double and the `STORE_BACKEND=memory`
//! local-dev backend.
//!
//! Every trait method takes the single mutex for its whole read-modify-write,
//! so the consume and referral-uniqueness semantics match the Postgres
//! backend's single-statement atomicity.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::store::{ProfileStore, QuotaConsume};
use crate::models::account::{AccountRow, NewAccount};
use crate::models::document::{
    CoverLetterRow, EmailRow, NewCoverLetter, NewEmail, NewResumeAnalysis, RecentDocuments,
    ResumeAnalysisRow,
};
use crate::models::referral::{NewReferralEvent, ReferralEventRow};

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, AccountRow>,
    /// Keyed by referee_id — the in-memory rendition of the unique index.
    referrals: HashMap<Uuid, ReferralEventRow>,
    cover_letters: Vec<CoverLetterRow>,
    emails: Vec<EmailRow>,
    resume_analyses: Vec<ResumeAnalysisRow>,
}

#[derive(Default)]
pub struct MemoryProfileStore {
    inner: Mutex<Inner>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<AccountRow>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.get(&id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<AccountRow>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .values()
            .find(|a| a.external_id == external_id)
            .cloned())
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<AccountRow>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .values()
            .find(|a| a.referral_code == code)
            .cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<AccountRow, AppError> {
        let mut inner = self.inner.lock().unwrap();

        // Mirror the unique indexes on external_id and referral_code.
        if inner
            .accounts
            .values()
            .any(|a| a.external_id == account.external_id)
        {
            return Err(AppError::Internal(anyhow!(
                "duplicate external_id {}",
                account.external_id
            )));
        }
        if inner
            .accounts
            .values()
            .any(|a| a.referral_code == account.referral_code)
        {
            return Err(AppError::Internal(anyhow!(
                "duplicate referral_code {}",
                account.referral_code
            )));
        }

        let row = AccountRow {
            id: account.id,
            external_id: account.external_id,
            email: account.email,
            display_name: account.display_name,
            photo_url: account.photo_url,
            is_pro: false,
            free_usage_count: 0,
            referral_code: account.referral_code,
            referred_by: account.referred_by,
            created_at: Utc::now(),
        };
        inner.accounts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn increment_usage(&self, id: Uuid) -> Result<i32, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let account = inner
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))?;
        account.free_usage_count += 1;
        Ok(account.free_usage_count)
    }

    async fn consume_quota(&self, id: Uuid, limit: i32) -> Result<QuotaConsume, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let account = inner
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))?;

        if account.is_pro {
            Ok(QuotaConsume::Unmetered)
        } else if account.free_usage_count < limit {
            account.free_usage_count += 1;
            Ok(QuotaConsume::Consumed {
                count: account.free_usage_count,
            })
        } else {
            Ok(QuotaConsume::Exhausted {
                count: account.free_usage_count,
            })
        }
    }

    async fn set_pro(&self, id: Uuid, is_pro: bool) -> Result<AccountRow, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let account = inner
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Account {id} not found")))?;
        account.is_pro = is_pro;
        Ok(account.clone())
    }

    async fn insert_referral_event(
        &self,
        event: NewReferralEvent,
    ) -> Result<Option<ReferralEventRow>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.referrals.contains_key(&event.referee_id) {
            return Ok(None);
        }
        let row = ReferralEventRow {
            id: event.id,
            referrer_id: event.referrer_id,
            referee_id: event.referee_id,
            status: event.status,
            bonus: event.bonus,
            created_at: Utc::now(),
        };
        inner.referrals.insert(row.referee_id, row.clone());
        Ok(Some(row))
    }

    async fn referrals_by_referrer(
        &self,
        referrer_id: Uuid,
    ) -> Result<Vec<ReferralEventRow>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut events: Vec<ReferralEventRow> = inner
            .referrals
            .values()
            .filter(|e| e.referrer_id == referrer_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn insert_cover_letter(&self, doc: NewCoverLetter) -> Result<CoverLetterRow, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let row = CoverLetterRow {
            id: doc.id,
            account_id: doc.account_id,
            job_title: doc.job_title,
            company_name: doc.company_name,
            content: doc.content,
            tone: doc.tone,
            language: doc.language,
            created_at: Utc::now(),
        };
        inner.cover_letters.push(row.clone());
        Ok(row)
    }

    async fn insert_email(&self, doc: NewEmail) -> Result<EmailRow, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let row = EmailRow {
            id: doc.id,
            account_id: doc.account_id,
            kind: doc.kind,
            subject: doc.subject,
            content: doc.content,
            created_at: Utc::now(),
        };
        inner.emails.push(row.clone());
        Ok(row)
    }

    async fn insert_resume_analysis(
        &self,
        doc: NewResumeAnalysis,
    ) -> Result<ResumeAnalysisRow, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let row = ResumeAnalysisRow {
            id: doc.id,
            account_id: doc.account_id,
            file_name: doc.file_name,
            score: doc.score,
            suggestions: doc.suggestions,
            keyword_matches: doc.keyword_matches,
            missing_keywords: doc.missing_keywords,
            created_at: Utc::now(),
        };
        inner.resume_analyses.push(row.clone());
        Ok(row)
    }

    async fn recent_documents(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<RecentDocuments, AppError> {
        let inner = self.inner.lock().unwrap();
        let limit = limit.max(0) as usize;

        let mut cover_letters: Vec<CoverLetterRow> = inner
            .cover_letters
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect();
        cover_letters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        cover_letters.truncate(limit);

        let mut emails: Vec<EmailRow> = inner
            .emails
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect();
        emails.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        emails.truncate(limit);

        let mut resume_analyses: Vec<ResumeAnalysisRow> = inner
            .resume_analyses
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect();
        resume_analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        resume_analyses.truncate(limit);

        Ok(RecentDocuments {
            cover_letters,
            emails,
            resume_analyses,
        })
    }
}
