//! Knock configuration: the per-user record file and run settings.
//!
//! Records live one per line in `~/.kexec`:
//!
//! ```text
//! # host:proto:port,...
//! router: tcp:7000, udp:7001, tcp:22
//! ```
//!
//! Whitespace anywhere in a line is ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tracing::debug;

use crate::domain::{ConfigRecord, HostMatch, Sequence};
use crate::error::{Error, Result};

/// Name of the configuration file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".kexec";

/// Pause between consecutive knocks unless overridden at run time.
#[cfg(feature = "sleep")]
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(100);
#[cfg(not(feature = "sleep"))]
pub const DEFAULT_STEP_DELAY: Duration = Duration::ZERO;

// =========================================================================
// Settings
// =========================================================================

/// Run-time knobs handed to the engine at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnockSettings {
    /// Print every knock to stdout before it is sent.
    pub verbose: bool,

    /// Sleep between each pair of consecutive knocks.
    pub step_delay: Duration,
}

impl KnockSettings {
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }
}

impl Default for KnockSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }
}

// =========================================================================
// Record table
// =========================================================================

/// All usable records of a configuration file, indexed by host key.
///
/// Comments and blank lines are dropped at load time. When a key appears
/// more than once the first record wins.
#[derive(Debug, Clone, Default)]
pub struct KnockTable {
    records: Vec<ConfigRecord>,
    by_host: HashMap<String, usize>,
}

impl KnockTable {
    /// Build a table from the text of a configuration file.
    pub fn parse(content: &str) -> Self {
        let records: Vec<ConfigRecord> = content
            .lines()
            .map(ConfigRecord::from_line)
            .filter(|record| !record.is_comment() && !record.is_blank())
            .collect();

        let mut by_host = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            if let Some(key) = record.key() {
                by_host.entry(key.to_string()).or_insert(idx);
            }
        }

        Self { records, by_host }
    }

    /// Find the record for `host`.
    pub fn lookup(&self, host: &str, mode: HostMatch) -> Option<&ConfigRecord> {
        match mode {
            HostMatch::Exact => self.by_host.get(host).map(|&idx| &self.records[idx]),
            HostMatch::Substring => self
                .records
                .iter()
                .find(|record| record.matches(host, mode)),
        }
    }

    /// Host keys in file order, without duplicates.
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<(usize, &str)> = self
            .by_host
            .iter()
            .map(|(host, &idx)| (idx, host.as_str()))
            .collect();
        hosts.sort_by_key(|(idx, _)| *idx);
        hosts.into_iter().map(|(_, host)| host).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =========================================================================
// Store
// =========================================================================

/// Reader for the knock configuration file.
///
/// The file is read fresh on every call; nothing is cached between lookups.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a store for the default path, `~/.kexec`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| Error::ConfigUnavailable {
            path: PathBuf::from("~").join(CONFIG_FILE_NAME),
            reason: "Could not determine home directory".to_string(),
        })?;

        Ok(Self {
            config_path: home.join(CONFIG_FILE_NAME),
        })
    }

    /// Create a store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load every record from disk.
    ///
    /// A missing or unreadable file is `ConfigUnavailable`, never an empty
    /// table. Invalid UTF-8 is replaced rather than rejected.
    pub async fn load(&self) -> Result<KnockTable> {
        let bytes = fs::read(&self.config_path)
            .await
            .map_err(|e| Error::ConfigUnavailable {
                path: self.config_path.clone(),
                reason: e.to_string(),
            })?;

        let table = KnockTable::parse(&decode_config(&bytes));
        debug!(
            path = %self.config_path.display(),
            records = table.len(),
            "Loaded knock configuration"
        );
        Ok(table)
    }

    /// Find the record for `host`.
    pub async fn find_entry(&self, host: &str, mode: HostMatch) -> Result<ConfigRecord> {
        let table = self.load().await?;
        match table.lookup(host, mode) {
            Some(record) => Ok(record.clone()),
            None => {
                debug!(host, known = ?table.hosts(), "No record for host");
                Err(Error::NoMatchingEntry(host.to_string()))
            }
        }
    }

    /// Look up `host` and split its record into a knock sequence.
    pub async fn sequence_for(&self, host: &str, mode: HostMatch) -> Result<Sequence> {
        let record = self.find_entry(host, mode).await?;
        Sequence::from_record(&record, host)
    }
}

/// Decode the file, replacing each invalid byte with a single `?`.
///
/// Token ports sit at a fixed byte offset, so a replacement must never
/// change how many bytes a line has.
fn decode_config(mut bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                text.push_str(valid);
                return text;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let invalid = e.error_len().unwrap_or(rest.len());
                text.extend(std::iter::repeat('?').take(invalid));
                bytes = &rest[invalid..];
            }
        }
    }
}
