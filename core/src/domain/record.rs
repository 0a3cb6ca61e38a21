//! Configuration records and host matching.

/// How a host identifier is matched against configuration records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostMatch {
    /// The record key (text before the first `:`) must equal the host.
    #[default]
    Exact,
    /// The host may appear anywhere in the record. First match wins, which
    /// lets `router` hit a `myrouter:` line listed earlier.
    Substring,
}

/// One whitespace-free line of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    line: String,
}

impl ConfigRecord {
    /// Build a record from a raw line, dropping every whitespace character.
    pub fn from_line(raw: &str) -> Self {
        Self {
            line: strip_whitespace(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn is_comment(&self) -> bool {
        self.line.starts_with('#')
    }

    pub fn is_blank(&self) -> bool {
        self.line.is_empty()
    }

    /// Text before the first `:`, or `None` for a line without one.
    pub fn key(&self) -> Option<&str> {
        self.line.split_once(':').map(|(key, _)| key)
    }

    /// Whether this record is a candidate for `host` under `mode`.
    pub fn matches(&self, host: &str, mode: HostMatch) -> bool {
        if self.is_comment() || self.is_blank() {
            return false;
        }
        match mode {
            HostMatch::Exact => self.key() == Some(host),
            HostMatch::Substring => self.line.contains(host),
        }
    }
}

/// Remove every character C's `isspace` accepts, wherever it occurs.
pub fn strip_whitespace(raw: &str) -> String {
    raw.chars()
        .filter(|c| !(c.is_ascii_whitespace() || *c == '\x0b'))
        .collect()
}
