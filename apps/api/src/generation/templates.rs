//! Deterministic generation backends for cover letters and outreach emails.
//!
//! Template substitution only — no model call, no randomness. The rendered
//! text is a function of (tone | kind, job title, company), so outputs are
//! stable across retries and testable byte-for-byte.

use serde::{Deserialize, Serialize};

/// Requested voice of a cover letter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Enthusiastic,
    Concise,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Concise => "concise",
        }
    }
}

/// Outreach email flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailKind {
    Application,
    FollowUp,
    ThankYou,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Application => "application",
            EmailKind::FollowUp => "follow-up",
            EmailKind::ThankYou => "thank-you",
        }
    }
}

const COVER_LETTER_PROFESSIONAL: &str = "\
Dear Hiring Manager,

I am writing to express my strong interest in the {job_title} position at {company_name}. With my background and experience outlined in my resume, I am confident that I would be a valuable addition to your team.

My skills and experience align well with the requirements for this role. I have demonstrated expertise in relevant areas and am excited about the opportunity to contribute to {company_name}'s continued success.

I am particularly drawn to this position because it represents an excellent opportunity to apply my skills in a dynamic environment. I am eager to bring my passion and dedication to help drive meaningful results for your organization.

Thank you for your time and consideration. I look forward to the opportunity to discuss how my background and enthusiasm can contribute to your team's success.

Sincerely,
[Your Name]";

const COVER_LETTER_ENTHUSIASTIC: &str = "\
Dear Hiring Team,

I am thrilled to apply for the {job_title} position at {company_name}! This opportunity perfectly aligns with my career goals and passion for the industry.

Throughout my career, I have developed strong skills that directly translate to success in this role. I am excited about the possibility of bringing my enthusiasm and expertise to your innovative team at {company_name}.

What excites me most about this opportunity is the chance to work with a company that values innovation and excellence. I am confident that my proactive approach and dedication would make a positive impact on your organization.

I would love the opportunity to discuss how my background and enthusiasm can contribute to {company_name}'s continued growth and success. Thank you for considering my application!

Best regards,
[Your Name]";

const COVER_LETTER_CONCISE: &str = "\
Dear Hiring Manager,

I am applying for the {job_title} position at {company_name}. My experience and skills make me well-suited for this role.

Key qualifications include:
\u{2022} Relevant experience in the field
\u{2022} Strong technical and communication skills
\u{2022} Proven track record of success

I am excited about the opportunity to contribute to {company_name} and would welcome the chance to discuss my qualifications further.

Thank you for your consideration.

Best regards,
[Your Name]";

/// Renders a cover letter for the given tone.
pub fn render_cover_letter(tone: Tone, job_title: &str, company_name: &str) -> String {
    let template = match tone {
        Tone::Professional => COVER_LETTER_PROFESSIONAL,
        Tone::Enthusiastic => COVER_LETTER_ENTHUSIASTIC,
        Tone::Concise => COVER_LETTER_CONCISE,
    };
    template
        .replace("{job_title}", job_title)
        .replace("{company_name}", company_name)
}

const EMAIL_APPLICATION: &str = "\
Dear Hiring Manager,

I hope this email finds you well. I am writing to formally submit my application for the {job_title} position at {company_name}.

I have attached my resume and cover letter for your review. I am very interested in this opportunity and believe my background and skills align well with your requirements.

I would welcome the opportunity to discuss how I can contribute to your team. Please let me know if you need any additional information.

Thank you for your time and consideration.

Best regards,
[Your Name]";

const EMAIL_FOLLOW_UP: &str = "\
Dear Hiring Manager,

I hope you are doing well. I wanted to follow up on my application for the {job_title} position at {company_name}, which I submitted recently.

I remain very interested in this opportunity and am excited about the possibility of joining your team. If you need any additional information or have any questions, please don't hesitate to reach out.

I look forward to hearing from you soon.

Best regards,
[Your Name]";

const EMAIL_THANK_YOU: &str = "\
Dear {hiring_manager},

Thank you for taking the time to meet with me today to discuss the {job_title} position at {company_name}. I enjoyed our conversation and learning more about the role and your team.

Our discussion reinforced my enthusiasm for this opportunity. I am confident that my skills and experience would enable me to make a positive contribution to your organization.

Please don't hesitate to contact me if you need any additional information. I look forward to hearing about the next steps in the process.

Thank you again for your time and consideration.

Best regards,
[Your Name]";

/// Renders an outreach email. Returns `(subject, content)`.
pub fn render_email(
    kind: EmailKind,
    job_title: &str,
    company_name: &str,
    hiring_manager_name: Option<&str>,
) -> (String, String) {
    let (subject, template) = match kind {
        EmailKind::Application => (format!("Application for {job_title} Position"), EMAIL_APPLICATION),
        EmailKind::FollowUp => (
            format!("Following up on {job_title} Application"),
            EMAIL_FOLLOW_UP,
        ),
        EmailKind::ThankYou => (format!("Thank you for the {job_title} Interview"), EMAIL_THANK_YOU),
    };

    let content = template
        .replace("{job_title}", job_title)
        .replace("{company_name}", company_name)
        .replace(
            "{hiring_manager}",
            hiring_manager_name.unwrap_or("Hiring Manager"),
        );

    (subject, content)
}
