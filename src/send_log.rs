use std::{
    collections::HashSet,
    fmt::Display,
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Local;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const HEADER: [&str; 4] = ["email", "status", "timestamp", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Sent,
    Failed,
}

impl Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendStatus::Sent => write!(f, "sent"),
            SendStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new() -> Self {
        Self(format!("{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f")))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub email: String,
    pub status: SendStatus,
    pub timestamp: Timestamp,
    pub error: Option<String>,
}

/// Append only record of send attempts, one csv row per attempt
#[derive(Debug)]
pub struct SendLog {
    path: PathBuf,
    skip_set: HashSet<String>,
}

impl SendLog {
    /// An unreadable log is reported and treated as empty
    pub fn open(path: &Path) -> Self {
        let skip_set = if path.exists() {
            match read_entries(path) {
                Ok(entries) => skip_set_from(&entries),
                Err(e) => {
                    warn!("Could not load send log {path:?}: {e:#}");
                    HashSet::new()
                }
            }
        } else {
            debug!("No send log at {path:?} yet");
            HashSet::new()
        };
        info!("Loaded {} previously sent emails", skip_set.len());
        Self {
            path: path.to_path_buf(),
            skip_set,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_sent(&self, email: &str) -> bool {
        self.skip_set.contains(&email_key(email))
    }

    pub fn skip_set(&self) -> &HashSet<String> {
        &self.skip_set
    }

    /// Appends one row, writing the header first when the file is new
    pub fn record(&mut self, email: &str, status: SendStatus, error: Option<&str>) -> anyhow::Result<()> {
        let entry = LogEntry {
            email: email.to_string(),
            status,
            timestamp: Timestamp::new(),
            error: error.map(str::to_string),
        };
        self.append(&entry)
            .with_context(|| format!("Failed to write to send log {:?}", self.path))?;
        match status {
            SendStatus::Sent => self.skip_set.insert(email_key(email)),
            SendStatus::Failed => self.skip_set.remove(&email_key(email)),
        };
        Ok(())
    }

    fn append(&self, entry: &LogEntry) -> anyhow::Result<()> {
        let is_new = match self.path.metadata() {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        let file = File::options()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Unable to open {:?} for append", self.path))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
        }
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }
}

/// Rows that can't be understood are skipped with a warning
pub fn read_entries(path: &Path) -> anyhow::Result<Vec<LogEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    let mut result = vec![];
    for (idx, row) in reader.deserialize::<LogEntry>().enumerate() {
        match row {
            Ok(entry) => result.push(entry),
            Err(e) => warn!("Skipping unreadable row {} of {path:?}: {e}", idx + 1),
        }
    }
    Ok(result)
}

/// Replays entries in order, the last status recorded for an address wins
pub fn skip_set_from(entries: &[LogEntry]) -> HashSet<String> {
    let mut result = HashSet::new();
    for entry in entries {
        let key = email_key(&entry.email);
        match entry.status {
            SendStatus::Sent => result.insert(key),
            SendStatus::Failed => result.remove(&key),
        };
    }
    result
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}
