use std::{rc::Rc, time::Duration};

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::{ResearchResult, ResearchStrategy};
use crate::{
    http::{HttpClient, BROWSER_USER_AGENT},
    utils::truncate_chars,
};

const API_URL: &str = "https://api.duckduckgo.com/";
const MAX_RELATED_TOPICS: usize = 3;
const RELATED_MAX_CHARS: usize = 300;

/// Instant answer API, uses the abstract or else the first related topics
pub struct DuckDuckGo {
    http: Rc<HttpClient>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "Abstract")]
    abstract_html: String,
    #[serde(default)]
    heading: String,
    /// Entries are either topics with a `Text` or nested groups
    #[serde(default)]
    related_topics: Vec<Value>,
}

impl DuckDuckGo {
    pub fn new(http: Rc<HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

impl ResearchStrategy for DuckDuckGo {
    fn name(&self) -> &str {
        "DuckDuckGo"
    }

    fn lookup(&self, company_name: &str) -> anyhow::Result<ResearchResult> {
        let query = format!("{company_name} company");
        let url = format!(
            "{API_URL}?q={}&format=json&no_html=1",
            urlencoding::encode(&query)
        );
        let response = self.http.get(&url, BROWSER_USER_AGENT, self.timeout)?;
        if !response.is_ok() {
            debug!("DuckDuckGo returned {} for {query:?}", response.status);
            return Ok(ResearchResult::empty());
        }
        Ok(parse_instant_answer(&response.body))
    }
}

fn parse_instant_answer(body: &str) -> ResearchResult {
    let answer: InstantAnswer = match serde_json::from_str(body) {
        Ok(answer) => answer,
        Err(e) => {
            debug!("Unexpected DuckDuckGo body: {e}");
            return ResearchResult::empty();
        }
    };

    let related: Vec<&str> = answer
        .related_topics
        .iter()
        .take(MAX_RELATED_TOPICS)
        .filter_map(|topic| topic.get("Text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .collect();

    let abstract_text = if answer.abstract_text.is_empty() {
        answer.abstract_html
    } else {
        answer.abstract_text
    };
    let description = match (abstract_text.is_empty(), related.first()) {
        (false, _) => abstract_text,
        (true, Some(first)) => first.to_string(),
        (true, None) => return ResearchResult::empty(),
    };

    ResearchResult {
        description,
        heading: answer.heading,
        related_info: truncate_chars(&related.join(" "), RELATED_MAX_CHARS).to_string(),
        found: true,
    }
}
