//! Gated generation pipeline.
//!
//! Flow: validate input → consume quota (atomic conditional increment) →
//!       render → persist document → return content + remaining-free.
//!
//! The consume is the commit point for free-tier usage: a request rejected
//! at validation consumes nothing, and a free account at the cap is refused
//! before any rendering happens. Pro accounts pass through unmetered.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::analyzer::analyze_resume;
use crate::generation::templates::{render_cover_letter, render_email, EmailKind, Tone};
use crate::ledger;
use crate::ledger::store::{ProfileStore, QuotaConsume};
use crate::models::document::{
    CoverLetterRow, EmailRow, NewCoverLetter, NewEmail, NewResumeAnalysis, ResumeAnalysisRow,
};

const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_FILE_NAME: &str = "resume.txt";

// ────────────────────────────────────────────────────────────────────────────
// Request / Result types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CoverLetterRequest {
    pub account_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub resume_text: String,
    #[serde(default)]
    pub tone: Tone,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailRequest {
    pub account_id: Uuid,
    pub kind: EmailKind,
    pub job_title: String,
    pub company_name: String,
    pub hiring_manager_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeAnalysisRequest {
    pub account_id: Uuid,
    pub resume_text: String,
    pub job_description: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CoverLetterResult {
    pub cover_letter: CoverLetterRow,
    /// `None` for pro accounts (unmetered).
    pub remaining_free: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct EmailResult {
    pub email: EmailRow,
    pub remaining_free: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ResumeAnalysisResult {
    pub analysis: ResumeAnalysisRow,
    pub remaining_free: Option<i32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipelines
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_cover_letter(
    store: &dyn ProfileStore,
    request: CoverLetterRequest,
) -> Result<CoverLetterResult, AppError> {
    require_non_empty(&request.job_title, "job_title")?;
    require_non_empty(&request.company_name, "company_name")?;
    require_non_empty(&request.resume_text, "resume_text")?;

    let remaining_free = consume_gated_action(store, request.account_id).await?;

    let content = render_cover_letter(request.tone, &request.job_title, &request.company_name);
    let language = request
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let cover_letter = store
        .insert_cover_letter(NewCoverLetter {
            id: Uuid::new_v4(),
            account_id: request.account_id,
            job_title: request.job_title,
            company_name: request.company_name,
            content,
            tone: request.tone.as_str().to_string(),
            language,
        })
        .await?;

    info!(
        "Generated {} cover letter {} for account {}",
        cover_letter.tone, cover_letter.id, cover_letter.account_id
    );

    Ok(CoverLetterResult {
        cover_letter,
        remaining_free,
    })
}

pub async fn generate_email(
    store: &dyn ProfileStore,
    request: EmailRequest,
) -> Result<EmailResult, AppError> {
    require_non_empty(&request.job_title, "job_title")?;
    require_non_empty(&request.company_name, "company_name")?;

    let remaining_free = consume_gated_action(store, request.account_id).await?;

    let (subject, content) = render_email(
        request.kind,
        &request.job_title,
        &request.company_name,
        request.hiring_manager_name.as_deref(),
    );

    let email = store
        .insert_email(NewEmail {
            id: Uuid::new_v4(),
            account_id: request.account_id,
            kind: request.kind.as_str().to_string(),
            subject,
            content,
        })
        .await?;

    info!(
        "Generated {} email {} for account {}",
        email.kind, email.id, email.account_id
    );

    Ok(EmailResult {
        email,
        remaining_free,
    })
}

pub async fn run_resume_analysis(
    store: &dyn ProfileStore,
    request: ResumeAnalysisRequest,
) -> Result<ResumeAnalysisResult, AppError> {
    require_non_empty(&request.resume_text, "resume_text")?;

    let remaining_free = consume_gated_action(store, request.account_id).await?;

    let report = analyze_resume(&request.resume_text, request.job_description.as_deref());
    let file_name = request
        .file_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

    let analysis = store
        .insert_resume_analysis(NewResumeAnalysis {
            id: Uuid::new_v4(),
            account_id: request.account_id,
            file_name,
            score: report.score,
            suggestions: report.suggestions,
            keyword_matches: report.keyword_matches,
            missing_keywords: report.missing_keywords,
        })
        .await?;

    info!(
        "Analyzed resume {} for account {}: score {}",
        analysis.id, analysis.account_id, analysis.score
    );

    Ok(ResumeAnalysisResult {
        analysis,
        remaining_free,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Quota gate
// ────────────────────────────────────────────────────────────────────────────

/// Consumes one gated action. Returns the remaining-free display value, or
/// `None` for unmetered pro accounts. `QuotaExceeded` redirects the caller
/// to the upgrade path.
async fn consume_gated_action(
    store: &dyn ProfileStore,
    account_id: Uuid,
) -> Result<Option<i32>, AppError> {
    match ledger::consume_quota(store, account_id).await? {
        QuotaConsume::Unmetered => Ok(None),
        QuotaConsume::Consumed { count } => Ok(Some((ledger::FREE_LIMIT - count).max(0))),
        QuotaConsume::Exhausted { .. } => Err(AppError::QuotaExceeded),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

fn require_non_empty(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryProfileStore;
    use crate::models::account::IdentityRecord;

    async fn account(store: &MemoryProfileStore, ext: &str) -> Uuid {
        ledger::create_account(
            store,
            IdentityRecord {
                external_id: ext.to_string(),
                email: format!("{ext}@example.com"),
                display_name: None,
                photo_url: None,
            },
            None,
        )
        .await
        .unwrap()
        .id
    }

    fn letter_request(account_id: Uuid) -> CoverLetterRequest {
        CoverLetterRequest {
            account_id,
            job_title: "Staff Engineer".to_string(),
            company_name: "Acme Corp".to_string(),
            resume_text: "Experience: ten years of systems work.".to_string(),
            tone: Tone::Professional,
            language: None,
        }
    }

    #[tokio::test]
    async fn test_free_account_gets_three_generations_then_quota_error() {
        let store = MemoryProfileStore::new();
        let id = account(&store, "u1").await;

        for expected_remaining in [2, 1, 0] {
            let result = generate_cover_letter(&store, letter_request(id))
                .await
                .unwrap();
            assert_eq!(result.remaining_free, Some(expected_remaining));
        }

        let err = generate_cover_letter(&store, letter_request(id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded));

        // The rejected attempt produced no document and no extra count.
        let refreshed = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(refreshed.free_usage_count, ledger::FREE_LIMIT);
        let docs = store.recent_documents(id, 10).await.unwrap();
        assert_eq!(docs.cover_letters.len(), 3);
    }

    #[tokio::test]
    async fn test_pro_account_is_not_metered() {
        let store = MemoryProfileStore::new();
        let id = account(&store, "u1").await;
        ledger::upgrade_to_pro(&store, id).await.unwrap();

        for _ in 0..5 {
            let result = generate_cover_letter(&store, letter_request(id))
                .await
                .unwrap();
            assert_eq!(result.remaining_free, None);
        }

        let refreshed = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(refreshed.free_usage_count, 0);
    }

    #[tokio::test]
    async fn test_validation_failure_consumes_no_quota() {
        let store = MemoryProfileStore::new();
        let id = account(&store, "u1").await;

        let mut request = letter_request(id);
        request.job_title = "  ".to_string();
        let err = generate_cover_letter(&store, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let refreshed = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(refreshed.free_usage_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let store = MemoryProfileStore::new();
        let err = generate_cover_letter(&store, letter_request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_email_pipeline_persists_row() {
        let store = MemoryProfileStore::new();
        let id = account(&store, "u1").await;

        let result = generate_email(
            &store,
            EmailRequest {
                account_id: id,
                kind: EmailKind::ThankYou,
                job_title: "SWE".to_string(),
                company_name: "Acme".to_string(),
                hiring_manager_name: Some("Dana Reyes".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(result.email.kind, "thank-you");
        assert!(result.email.content.contains("Dana Reyes"));
        assert_eq!(result.remaining_free, Some(ledger::FREE_LIMIT - 1));

        let docs = store.recent_documents(id, 10).await.unwrap();
        assert_eq!(docs.emails.len(), 1);
    }

    #[tokio::test]
    async fn test_resume_analysis_pipeline_persists_report() {
        let store = MemoryProfileStore::new();
        let id = account(&store, "u1").await;

        let result = run_resume_analysis(
            &store,
            ResumeAnalysisRequest {
                account_id: id,
                resume_text: "Experience with Rust and Kubernetes. jane@example.com".to_string(),
                job_description: Some("Rust engineer, Kubernetes required".to_string()),
                file_name: None,
            },
        )
        .await
        .unwrap();

        assert!(result.analysis.score >= 50);
        assert_eq!(result.analysis.file_name, "resume.txt");
        assert!(result
            .analysis
            .keyword_matches
            .contains(&"rust".to_string()));

        let docs = store.recent_documents(id, 10).await.unwrap();
        assert_eq!(docs.resume_analyses.len(), 1);
    }

    #[tokio::test]
    async fn test_mixed_gated_actions_share_one_quota() {
        let store = MemoryProfileStore::new();
        let id = account(&store, "u1").await;

        generate_cover_letter(&store, letter_request(id))
            .await
            .unwrap();
        generate_email(
            &store,
            EmailRequest {
                account_id: id,
                kind: EmailKind::Application,
                job_title: "SWE".to_string(),
                company_name: "Acme".to_string(),
                hiring_manager_name: None,
            },
        )
        .await
        .unwrap();
        run_resume_analysis(
            &store,
            ResumeAnalysisRequest {
                account_id: id,
                resume_text: "Experience: systems.".to_string(),
                job_description: None,
                file_name: None,
            },
        )
        .await
        .unwrap();

        // All three kinds drained the same counter.
        let err = generate_cover_letter(&store, letter_request(id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded));
    }
}
