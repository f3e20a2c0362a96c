use log::{info, warn};

use crate::{
    completion::CompletionClient,
    config::CandidateProfile,
    contacts::ContactRecord,
    research::{is_placeholder_summary, CompanyResearcher},
    utils::preview,
};

const GENERIC_SALUTATION: &str = "Hiring Manager";
const GENERIC_COMPANY: &str = "your company";
const GENERIC_TITLE: &str = "HR Professional";

/// Leading tokens dropped from a display name before picking the first name
const HONORIFICS: [&str; 4] = ["mr", "ms", "mrs", "dr"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftedEmail {
    pub subject: String,
    pub body: String,
}

/// Writes one email per recipient, by AI if possible and from a template otherwise
pub struct EmailDrafter {
    client: Box<dyn CompletionClient>,
    researcher: CompanyResearcher,
}

/// Recipient fields after cleaning, shared by the prompt and the template
struct Recipient {
    first_name: String,
    company: String,
    title: String,
}

impl EmailDrafter {
    pub fn new(client: Box<dyn CompletionClient>, researcher: CompanyResearcher) -> Self {
        Self { client, researcher }
    }

    pub fn draft(&mut self, recipient: &ContactRecord, candidate: &CandidateProfile) -> DraftedEmail {
        let recipient = Recipient {
            first_name: first_name(&recipient.display_name),
            company: non_empty_or(&recipient.company, GENERIC_COMPANY),
            title: non_empty_or(&recipient.title, GENERIC_TITLE),
        };

        info!("Researching {}", recipient.company);
        let company_info = self.researcher.get_summary(&recipient.company);
        info!("Company info: {}", preview(&company_info, 200));

        let prompt = build_prompt(&recipient, candidate, &company_info);
        match self.client.complete(&prompt) {
            Ok(content) => parse_email(&content, &recipient.company),
            Err(e) => {
                warn!("AI generation failed, using template instead: {e:#}");
                fallback_email(&recipient, candidate, &company_info)
            }
        }
    }
}

fn non_empty_or(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// "Dr. Jane Smith" -> "Jane"
pub fn first_name(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .skip_while(|token| {
            let bare = token.trim_end_matches('.').to_lowercase();
            HONORIFICS.contains(&bare.as_str())
        })
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_SALUTATION.to_string())
}

fn build_prompt(recipient: &Recipient, candidate: &CandidateProfile, company_info: &str) -> String {
    let Recipient {
        first_name,
        company,
        title,
    } = recipient;
    let portfolio = if candidate.portfolio.trim().is_empty() {
        String::new()
    } else {
        format!("\n- Portfolio: {}", candidate.portfolio.trim())
    };
    format!(
        r#"You are an experienced career coach and copywriter. Write a cold email that makes this HR person want to reply and shortlist the candidate.

RECIPIENT:
- First name: {first_name}
- Company: {company}
- Title: {title}

WHAT WE KNOW ABOUT THE COMPANY (use it to personalize):
{company_info}

CANDIDATE:
- Name: {name}
- Skills: {skills}
- Experience: {experience}
- Education: {education}
- LinkedIn: {linkedin}{portfolio}

AREAS THE CANDIDATE WANTS TO WORK IN:
{target_roles}

RULES:
1. Subject line: specific and intriguing, mentions {company} and something particular about the candidate. Never "Application for Position" or "Job Inquiry".
2. Open with something real about the company taken from the information above.
3. Do not ask for a role by name. Let the skills and projects hint at the areas of interest.
4. Connect the candidate's skills to what the company does.
5. Close with a low pressure call to action.
6. Plain, friendly, human words. Avoid "leverage", "synergy", "spearhead", "utilize", "endeavor", "paramount".
7. Use **double asterisks** to bold one or two key points only.
8. No em dashes. No "I hope this email finds you well", "I am writing to express my interest" or "I believe I would be a great fit".
9. 80 to 120 words at most.
10. No placeholders or [bracketed] text.

ANSWER IN EXACTLY THIS FORMAT:
SUBJECT: <subject line>

<email body>

Best regards,
{name}
LinkedIn: {linkedin}"#,
        name = candidate.name,
        skills = candidate.skills,
        experience = candidate.experience,
        education = candidate.education,
        linkedin = candidate.linkedin,
        target_roles = candidate.target_roles,
    )
}

/// Splits a model answer on its first "SUBJECT:" line
fn parse_email(content: &str, company: &str) -> DraftedEmail {
    let mut subject: Option<String> = None;
    let mut body_lines: Vec<&str> = vec![];
    for line in content.trim().lines() {
        if subject.is_none() {
            if let Some(found) = subject_from_line(line) {
                subject = Some(found);
            }
            continue;
        }
        body_lines.push(line);
    }

    let body = body_lines.join("\n").trim().to_string();
    let subject = subject
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("Exploring Opportunities at {company}"));
    let body = if body.is_empty() {
        content.trim().to_string()
    } else {
        body
    };
    DraftedEmail { subject, body }
}

fn subject_from_line(line: &str) -> Option<String> {
    let stripped = line.trim_start().trim_start_matches(['*', '#', ' ']);
    let marker = stripped.get(..8)?;
    if !marker.eq_ignore_ascii_case("subject:") {
        return None;
    }
    Some(stripped[8..].trim().trim_matches('*').trim().to_string())
}

fn fallback_email(recipient: &Recipient, candidate: &CandidateProfile, company_info: &str) -> DraftedEmail {
    let Recipient {
        first_name,
        company,
        ..
    } = recipient;
    let subject = format!("Application for Entry-Level Opportunity at {company}");
    let company_hook = if company_info.is_empty() || is_placeholder_summary(company_info) {
        String::new()
    } else {
        format!("I've been following {company}'s work and am impressed by your impact in the industry. ")
    };
    let body = format!(
        "Dear {first_name},

{company_hook}I am {name}, {experience}. My skills in {skills} align well with the innovative work at {company}.

I would love the opportunity to discuss how I could contribute to your team.

Best regards,
{name}
{linkedin}",
        name = candidate.name,
        experience = candidate.experience,
        skills = candidate.skills,
        linkedin = candidate.linkedin,
    );
    DraftedEmail { subject, body }
}
