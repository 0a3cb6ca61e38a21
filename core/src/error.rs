//! Error types for the kexec-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for kexec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a knock run.
///
/// Every variant is terminal: nothing is retried, and packets already sent
/// before the error stay sent.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be located, opened or read.
    #[error("Cannot open configuration {}: {}", .path.display(), .reason)]
    ConfigUnavailable { path: PathBuf, reason: String },

    /// No record in the configuration matches the host.
    #[error("No configuration entry found for {0}")]
    NoMatchingEntry(String),

    /// The matched record does not start with `<host>:`.
    #[error("Malformed record for {host}: {record}")]
    MalformedRecord { host: String, record: String },

    /// A knock token could not be parsed.
    #[error("Malformed token '{token}': {fault}")]
    MalformedToken { token: String, fault: TokenFault },

    /// Host name resolution failed or produced no IPv4 address.
    #[error("Cannot resolve host {host}: {reason}")]
    UnresolvedHost { host: String, reason: String },

    /// Socket creation or send failed.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Why a single knock token was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFault {
    #[error("unknown protocol")]
    UnknownProtocol,

    #[error("no digits were found")]
    NoDigits,

    #[error("numeric overflow")]
    Overflow,

    #[error("not a valid port range")]
    OutOfRange,
}
