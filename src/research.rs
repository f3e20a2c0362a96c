//! Finds a short blurb about a company to personalize emails with.
//!
//! Sources are tried in a fixed order and the first one that finds
//! something wins. Failures of a source are never surfaced, they only mean
//! the next source is asked.

mod duckduckgo;
mod web_search;
mod wikipedia;

use std::collections::HashMap;

use log::{debug, info};

pub use duckduckgo::DuckDuckGo;
pub use web_search::WebSearch;
pub use wikipedia::Wikipedia;

use crate::utils::{normalize_whitespace, truncate_chars};

/// Company names that mean "unknown" and are not worth looking up
const PLACEHOLDER_NAMES: [&str; 3] = ["", "nan", "your company"];

const SUMMARY_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchResult {
    pub description: String,
    pub heading: String,
    pub related_info: String,
    pub found: bool,
}

impl ResearchResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A single source of company information
pub trait ResearchStrategy {
    /// Used in log messages
    fn name(&self) -> &str;

    /// Errors and "not found" are treated the same by the caller
    fn lookup(&self, company_name: &str) -> anyhow::Result<ResearchResult>;
}

pub struct CompanyResearcher {
    strategies: Vec<Box<dyn ResearchStrategy>>,
    cache: HashMap<String, ResearchResult>,
}

impl CompanyResearcher {
    /// Strategies are asked in the order given
    pub fn new(strategies: Vec<Box<dyn ResearchStrategy>>) -> Self {
        Self {
            strategies,
            cache: HashMap::new(),
        }
    }

    pub fn research(&mut self, company_name: &str) -> ResearchResult {
        let key = cache_key(company_name);
        if PLACEHOLDER_NAMES.contains(&key.as_str()) {
            debug!("Not researching placeholder company name {company_name:?}");
            return ResearchResult::empty();
        }
        if let Some(cached) = self.cache.get(&key) {
            debug!("Research cache hit for {key:?}");
            return cached.clone();
        }

        let mut result = ResearchResult::empty();
        for strategy in self.strategies.iter() {
            match strategy.lookup(company_name.trim()) {
                Ok(found) if found.found => {
                    info!("Found information on {company_name:?} via {}", strategy.name());
                    result = found;
                    break;
                }
                Ok(_) => debug!("{} has nothing on {company_name:?}", strategy.name()),
                Err(e) => debug!("{} failed for {company_name:?}: {e:#}", strategy.name()),
            }
        }
        if !result.found {
            info!("No information found on {company_name:?}");
        }
        self.cache.insert(key, result.clone());
        result
    }

    /// One string to drop into a prompt, never empty
    pub fn get_summary(&mut self, company_name: &str) -> String {
        let info = self.research(company_name);
        if !info.found {
            return no_information_placeholder(company_name);
        }
        let mut summary = info.description;
        if !info.related_info.is_empty() {
            summary.push(' ');
            summary.push_str(&info.related_info);
        }
        let summary = normalize_whitespace(&summary);
        truncate_chars(&summary, SUMMARY_MAX_CHARS).to_string()
    }
}

pub fn no_information_placeholder(company_name: &str) -> String {
    format!("{company_name} (no additional information found)")
}

/// True for summaries produced by [`no_information_placeholder`]
pub fn is_placeholder_summary(summary: &str) -> bool {
    summary.ends_with("(no additional information found)")
}

fn cache_key(company_name: &str) -> String {
    company_name.trim().to_lowercase()
}
