use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoverLetterRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub content: String,
    pub tone: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: String,
    pub subject: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeAnalysisRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub file_name: String,
    pub score: i32,
    pub suggestions: Vec<String>,
    pub keyword_matches: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCoverLetter {
    pub id: Uuid,
    pub account_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub content: String,
    pub tone: String,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct NewEmail {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: String,
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewResumeAnalysis {
    pub id: Uuid,
    pub account_id: Uuid,
    pub file_name: String,
    pub score: i32,
    pub suggestions: Vec<String>,
    pub keyword_matches: Vec<String>,
    pub missing_keywords: Vec<String>,
}

/// Most recent generated documents of each kind, for the history view.
#[derive(Debug, Clone, Serialize)]
pub struct RecentDocuments {
    pub cover_letters: Vec<CoverLetterRow>,
    pub emails: Vec<EmailRow>,
    pub resume_analyses: Vec<ResumeAnalysisRow>,
}
