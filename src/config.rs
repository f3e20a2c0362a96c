use std::{fs, path::Path, path::PathBuf};

use anyhow::{bail, Context};
use log::debug;
use serde::Deserialize;

use crate::units::{DelayRange, Seconds};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Account used to log in to the mail relay, also the From address
    pub email_address: String,

    /// App password for the mail account (spaces are ignored)
    pub app_password: String,

    /// Key for the AI chat completion endpoint
    pub openrouter_api_key: String,

    /// Details about the person looking for a job
    pub candidate: CandidateProfile,

    /// Maximum number of contacts handled in one run
    #[serde(default = "default_daily_limit")]
    pub daily_limit: usize,

    /// Where `--test` sends its sample
    pub test_email: String,

    /// Optional address copied on every email
    #[serde(default)]
    pub bcc_email: Option<String>,

    /// Random pause between two sends
    #[serde(default)]
    pub delay: DelayRange,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// Submission port, STARTTLS is used
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default = "default_ai_endpoint")]
    pub ai_endpoint: String,

    #[serde(default = "default_ai_model")]
    pub ai_model: String,

    #[serde(default = "default_ai_timeout")]
    pub ai_timeout: Seconds,

    /// Timeout for each company research request
    #[serde(default = "default_research_timeout")]
    pub research_timeout: Seconds,

    /// Spreadsheet (or csv) with the columns Email, Name, Company, Title
    #[serde(default = "default_contacts_path")]
    pub contacts_path: PathBuf,

    #[serde(default = "default_send_log_path")]
    pub send_log_path: PathBuf,

    /// Folder searched for the resume pdf
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CandidateProfile {
    pub name: String,
    pub phone: String,
    pub linkedin: String,
    #[serde(default)]
    pub portfolio: String,
    pub skills: String,
    pub experience: String,
    pub education: String,
    /// Roles the candidate is after, hinted at rather than stated in the emails
    pub target_roles: String,
}

fn default_daily_limit() -> usize {
    10
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_ai_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_ai_model() -> String {
    "arcee-ai/trinity-large-preview:free".to_string()
}

fn default_ai_timeout() -> Seconds {
    60.into()
}

fn default_research_timeout() -> Seconds {
    10.into()
}

fn default_contacts_path() -> PathBuf {
    PathBuf::from("HR_Contact_List.xlsx")
}

fn default_send_log_path() -> PathBuf {
    PathBuf::from("sent_log.csv")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

impl Config {
    pub fn load_from(config_path: &Path) -> anyhow::Result<Config> {
        debug!("Loading Config from: {config_path:?}");
        if !config_path.exists() {
            bail!("Config file not found at {config_path:?}. Create it from config.example.json");
        }
        let file_contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read contents of {config_path:?}"))?;
        let result: Config = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse contents of {config_path:?}"))?;
        result
            .validate()
            .with_context(|| format!("Invalid config in {config_path:?}"))?;
        Ok(result)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.email_address.trim().is_empty() {
            bail!("email_address must not be empty");
        }
        if !self.delay.is_valid() {
            bail!("delay.min ({}) is larger than delay.max ({})", self.delay.min, self.delay.max);
        }
        Ok(())
    }

    /// The app password as the relay expects it (Google shows it with spaces)
    pub fn smtp_password(&self) -> String {
        self.app_password.replace(' ', "")
    }

    /// Non empty BCC address if one is configured
    pub fn bcc(&self) -> Option<&str> {
        self.bcc_email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample_config() -> Config {
        serde_json::from_value(json!({
            "email_address": "me@example.com",
            "app_password": "abcd efgh ijkl mnop",
            "openrouter_api_key": "sk-test",
            "candidate": {
                "name": "Jane Doe",
                "phone": "+1-555-0100",
                "linkedin": "https://www.linkedin.com/in/jane-doe/",
                "skills": "Rust, SQL",
                "experience": "a backend developer with two years of experience",
                "education": "BSc Computer Science",
                "target_roles": "Backend Engineer"
            },
            "test_email": "me+test@example.com"
        }))
        .expect("sample config is valid")
    }

    #[test]
    fn defaults_applied() {
        let config = sample_config();
        assert_eq!(config.daily_limit, 10);
        assert_eq!(config.delay, DelayRange::default());
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.contacts_path, PathBuf::from("HR_Contact_List.xlsx"));
        assert_eq!(config.send_log_path, PathBuf::from("sent_log.csv"));
        assert!(config.candidate.portfolio.is_empty());
        assert_eq!(config.bcc(), None);
    }

    #[test]
    fn password_spaces_removed() {
        assert_eq!(sample_config().smtp_password(), "abcdefghijklmnop");
    }

    #[test]
    fn blank_bcc_ignored() {
        let mut config = sample_config();
        config.bcc_email = Some("  ".to_string());
        assert_eq!(config.bcc(), None);
        config.bcc_email = Some("boss@example.com".to_string());
        assert_eq!(config.bcc(), Some("boss@example.com"));
    }

    #[test]
    fn inverted_delay_rejected() {
        let mut config = sample_config();
        config.delay = DelayRange {
            min: 30.into(),
            max: 10.into(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("config.json")).unwrap_err();
        assert!(format!("{err}").contains("not found"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let body = json!({
            "email_address": "me@example.com",
            "app_password": "x",
            "openrouter_api_key": "k",
            "candidate": {
                "name": "A", "phone": "1", "linkedin": "l", "skills": "s",
                "experience": "e", "education": "ed", "target_roles": "t"
            },
            "daily_limit": 3,
            "delay": { "min": 1, "max": 2 },
            "test_email": "t@example.com"
        });
        fs::write(&path, body.to_string()).unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.daily_limit, 3);
        assert_eq!(config.delay.max, 2.into());
    }
}
