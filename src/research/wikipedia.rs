use std::{rc::Rc, time::Duration};

use log::debug;
use serde::Deserialize;

use super::{ResearchResult, ResearchStrategy};
use crate::{http::HttpClient, utils::truncate_chars};

const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const USER_AGENT: &str = "ColdMail/0.1 (personal job search tool)";

/// Extracts this short are usually disambiguation stubs
const MIN_EXTRACT_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 500;

/// Encyclopedia page summary, retried with a "(company)" suffix
pub struct Wikipedia {
    http: Rc<HttpClient>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
}

impl Wikipedia {
    pub fn new(http: Rc<HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    fn fetch(&self, page_title: &str) -> anyhow::Result<Option<ResearchResult>> {
        let url = format!("{SUMMARY_URL}{}", urlencoding::encode(page_title));
        let response = self.http.get(&url, USER_AGENT, self.timeout)?;
        if !response.is_ok() {
            debug!("Wikipedia returned {} for {page_title:?}", response.status);
            return Ok(None);
        }
        Ok(parse_summary(&response.body))
    }
}

impl ResearchStrategy for Wikipedia {
    fn name(&self) -> &str {
        "Wikipedia"
    }

    fn lookup(&self, company_name: &str) -> anyhow::Result<ResearchResult> {
        if let Some(result) = self.fetch(company_name)? {
            return Ok(result);
        }
        let disambiguated = format!("{company_name} (company)");
        Ok(self.fetch(&disambiguated)?.unwrap_or_default())
    }
}

fn parse_summary(body: &str) -> Option<ResearchResult> {
    let summary: PageSummary = match serde_json::from_str(body) {
        Ok(summary) => summary,
        Err(e) => {
            debug!("Unexpected Wikipedia summary body: {e}");
            return None;
        }
    };
    if summary.extract.chars().count() <= MIN_EXTRACT_CHARS {
        return None;
    }
    Some(ResearchResult {
        description: truncate_chars(&summary.extract, DESCRIPTION_MAX_CHARS).to_string(),
        heading: summary.title,
        related_info: String::new(),
        found: true,
    })
}
