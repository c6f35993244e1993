//! Resume analyzer — pure-Rust heuristic scoring, fast and deterministic.
//!
//! Scoring model:
//! 1. Base 50.
//! 2. +5 per resume section keyword present (experience, skills, education,
//!    work, project, achievement).
//! 3. +10 over 500 chars, +10 more over 1000.
//! 4. +5 for a contact email, +5 for a phone number.
//! 5. Up to +20 for job-description keyword overlap (2 per matched keyword).
//! 6. Capped at 100.

use std::collections::HashMap;

use serde::Serialize;

/// Resume section markers worth +5 each.
const SECTION_KEYWORDS: &[&str] = &[
    "experience",
    "skills",
    "education",
    "work",
    "project",
    "achievement",
];

/// Action verbs recruiters scan for.
const ACTION_VERBS: &[&str] = &[
    "led", "built", "designed", "launched", "improved", "managed", "created", "delivered",
    "reduced", "increased",
];

/// Words too generic to count as job-description keywords.
const STOPWORDS: &[&str] = &[
    "with", "that", "this", "will", "your", "have", "from", "their", "about", "them", "then",
    "than", "were", "been", "being", "what", "when", "where", "which", "while", "would", "could",
    "should", "must", "also", "into", "over", "more", "most", "some", "such", "other", "team",
    "role", "work", "years", "plus", "and", "the", "for", "you",
];

/// Most keywords extracted from one job description.
const MAX_KEYWORDS: usize = 12;

const BASE_SCORE: i32 = 50;
const MAX_SCORE: i32 = 100;
const MAX_KEYWORD_BONUS: i32 = 20;

/// Outcome of one resume analysis. Persisted verbatim on the analysis row.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub score: i32,
    pub suggestions: Vec<String>,
    pub keyword_matches: Vec<String>,
    pub missing_keywords: Vec<String>,
}

/// Analyzes resume text, optionally against a job description.
pub fn analyze_resume(resume_text: &str, job_description: Option<&str>) -> AnalysisReport {
    let resume_lower = resume_text.to_lowercase();

    let mut score = BASE_SCORE;

    let sections_found = SECTION_KEYWORDS
        .iter()
        .filter(|kw| resume_lower.contains(*kw))
        .count();
    score += 5 * sections_found as i32;

    if resume_text.len() > 500 {
        score += 10;
    }
    if resume_text.len() > 1000 {
        score += 10;
    }

    let has_email = resume_text.contains('@');
    if has_email {
        score += 5;
    }
    let has_phone = contains_phone_number(resume_text);
    if has_phone {
        score += 5;
    }

    let (keyword_matches, missing_keywords) = match job_description {
        Some(jd) => {
            let keywords = extract_keywords(jd);
            let (matched, missing): (Vec<String>, Vec<String>) = keywords
                .into_iter()
                .partition(|kw| resume_lower.contains(kw.as_str()));
            score += (2 * matched.len() as i32).min(MAX_KEYWORD_BONUS);
            (matched, missing)
        }
        None => (Vec::new(), Vec::new()),
    };

    let score = score.min(MAX_SCORE);

    let suggestions = build_suggestions(
        &resume_lower,
        sections_found,
        has_email,
        has_phone,
        &missing_keywords,
    );

    AnalysisReport {
        score,
        suggestions,
        keyword_matches,
        missing_keywords,
    }
}

/// Extracts up to MAX_KEYWORDS lowercase keywords from a job description:
/// words of length >= 4, stopwords dropped, ranked by frequency then first
/// occurrence.
pub fn extract_keywords(job_description: &str) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u32> = HashMap::new();

    for raw in job_description.split(|c: char| !c.is_alphanumeric()) {
        let word = raw.to_lowercase();
        if word.len() < 4 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if !counts.contains_key(&word) {
            order.push(word.clone());
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    let mut ranked: Vec<(usize, String)> = order.into_iter().enumerate().collect();
    ranked.sort_by(|(ia, a), (ib, b)| counts[b].cmp(&counts[a]).then(ia.cmp(ib)));

    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(_, w)| w)
        .collect()
}

/// Detects a NNN[-.]?NNN[-.]?NNNN phone pattern without a regex engine.
fn contains_phone_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    (0..bytes.len()).any(|start| matches_phone_at(bytes, start))
}

fn matches_phone_at(bytes: &[u8], start: usize) -> bool {
    let mut pos = start;
    for (group, len) in [3usize, 3, 4].into_iter().enumerate() {
        let mut digits = 0;
        while digits < len {
            match bytes.get(pos) {
                Some(b) if b.is_ascii_digit() => {
                    pos += 1;
                    digits += 1;
                }
                _ => return false,
            }
        }
        if group < 2 {
            if let Some(b'-' | b'.') = bytes.get(pos) {
                pos += 1;
            }
        }
    }
    true
}

fn build_suggestions(
    resume_lower: &str,
    sections_found: usize,
    has_email: bool,
    has_phone: bool,
    missing_keywords: &[String],
) -> Vec<String> {
    let mut suggestions = Vec::new();

    let digit_count = resume_lower.chars().filter(char::is_ascii_digit).count();
    if digit_count < 5 {
        suggestions.push(
            "Add more quantifiable achievements with specific numbers and percentages".to_string(),
        );
    }
    if !missing_keywords.is_empty() {
        suggestions.push("Include relevant keywords from the job description".to_string());
    }
    if sections_found < 3 {
        suggestions.push("Improve the formatting for better ATS compatibility".to_string());
    }
    if !resume_lower.contains("summary") {
        suggestions.push("Add a professional summary section at the top".to_string());
    }
    if !ACTION_VERBS.iter().any(|v| resume_lower.contains(v)) {
        suggestions.push("Include more action verbs to describe your accomplishments".to_string());
    }
    if !has_email || !has_phone {
        suggestions.push("Add complete contact information (email and phone)".to_string());
    }
    if !resume_lower.contains("certification") && !resume_lower.contains("skills") {
        suggestions.push("Consider adding relevant certifications or skills".to_string());
    }

    suggestions
}
