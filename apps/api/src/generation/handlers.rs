//! Axum route handlers for the Generation API.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::generation::generator::{
    generate_cover_letter, generate_email, run_resume_analysis, CoverLetterRequest,
    CoverLetterResult, EmailRequest, EmailResult, ResumeAnalysisRequest, ResumeAnalysisResult,
};
use crate::state::AppState;

/// POST /api/v1/generate/cover-letter
///
/// Gated: consumes one free-tier action unless the account is pro.
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Json(request): Json<CoverLetterRequest>,
) -> Result<Json<CoverLetterResult>, AppError> {
    let result = generate_cover_letter(state.store.as_ref(), request).await?;
    Ok(Json(result))
}

/// POST /api/v1/generate/email
pub async fn handle_generate_email(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<EmailResult>, AppError> {
    let result = generate_email(state.store.as_ref(), request).await?;
    Ok(Json(result))
}

/// POST /api/v1/generate/resume-analysis
pub async fn handle_resume_analysis(
    State(state): State<AppState>,
    Json(request): Json<ResumeAnalysisRequest>,
) -> Result<Json<ResumeAnalysisResult>, AppError> {
    let result = run_resume_analysis(state.store.as_ref(), request).await?;
    Ok(Json(result))
}
