use std::{rc::Rc, sync::OnceLock, time::Duration};

use log::debug;
use regex::Regex;

use super::{ResearchResult, ResearchStrategy};
use crate::{
    http::{HttpClient, BROWSER_USER_AGENT},
    utils::{normalize_whitespace, truncate_chars},
};

const SEARCH_URL: &str = "https://www.bing.com/search";

/// Shorter snippets are mostly navigation text
const MIN_SNIPPET_CHARS: usize = 80;
const MAX_SNIPPETS: usize = 2;
const DESCRIPTION_MAX_CHARS: usize = 400;
const RELATED_MAX_CHARS: usize = 200;

/// Snippets mentioning any of these are site boilerplate
const BOILERPLATE: [&str; 4] = ["cookie", "privacy", "sign in", "log in"];

/// Last resort, scrapes text snippets off a search results page
pub struct WebSearch {
    http: Rc<HttpClient>,
    timeout: Duration,
}

impl WebSearch {
    pub fn new(http: Rc<HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

impl ResearchStrategy for WebSearch {
    fn name(&self) -> &str {
        "web search"
    }

    fn lookup(&self, company_name: &str) -> anyhow::Result<ResearchResult> {
        let query = format!("{company_name} company about us");
        let url = format!("{SEARCH_URL}?q={}", urlencoding::encode(&query));
        let response = self.http.get(&url, BROWSER_USER_AGENT, self.timeout)?;
        if !response.is_ok() {
            debug!("Search page returned {} for {query:?}", response.status);
            return Ok(ResearchResult::empty());
        }
        Ok(extract_snippets(&response.body, company_name))
    }
}

fn extract_snippets(html: &str, company_name: &str) -> ResearchResult {
    let needle = company_name.to_lowercase();
    let mut snippets: Vec<String> = vec![];
    for block in text_blocks(html) {
        let text = normalize_whitespace(&decode_entities(&block));
        let lowered = text.to_lowercase();
        if text.chars().count() <= MIN_SNIPPET_CHARS || !lowered.contains(&needle) {
            continue;
        }
        if BOILERPLATE.iter().any(|skip| lowered.contains(skip)) {
            continue;
        }
        snippets.push(text);
        if snippets.len() >= MAX_SNIPPETS {
            break;
        }
    }

    let Some(first) = snippets.first() else {
        return ResearchResult::empty();
    };
    ResearchResult {
        description: truncate_chars(first, DESCRIPTION_MAX_CHARS).to_string(),
        heading: company_name.to_string(),
        related_info: snippets
            .get(1)
            .map(|s| truncate_chars(s, RELATED_MAX_CHARS).to_string())
            .unwrap_or_default(),
        found: true,
    }
}

/// Inner text of every `p`, `span` and `li` element, nested ones included,
/// in the order the elements open. Unclosed elements are dropped.
fn text_blocks(html: &str) -> Vec<String> {
    static CELL_BLOCK_TAG: OnceLock<Regex> = OnceLock::new();
    static CELL_TAG: OnceLock<Regex> = OnceLock::new();
    let re_block_tag = CELL_BLOCK_TAG.get_or_init(|| {
        Regex::new(r"(?i)<(/?)(p|span|li)\b[^>]*>").expect("failed to compile regex")
    });
    let re_tag = CELL_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("failed to compile regex"));

    // (element name, where the opening tag starts, where its content starts)
    let mut open: Vec<(String, usize, usize)> = vec![];
    let mut closed: Vec<(usize, String)> = vec![];
    for captures in re_block_tag.captures_iter(html) {
        let Some(tag) = captures.get(0) else {
            continue;
        };
        let name = captures[2].to_lowercase();
        if captures[1].is_empty() {
            open.push((name, tag.start(), tag.end()));
            continue;
        }
        let Some(pos) = open.iter().rposition(|(open_name, _, _)| *open_name == name) else {
            continue; // Stray closing tag
        };
        // Anything opened after the match was never closed
        let (_, start, content_start) = open[pos].clone();
        open.truncate(pos);
        let inner = &html[content_start..tag.start()];
        closed.push((start, re_tag.replace_all(inner, " ").into_owned()));
    }
    closed.sort_by_key(|(start, _)| *start);
    closed.into_iter().map(|(_, text)| text).collect()
}

/// Only the handful of entities that show up in result snippets
fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
