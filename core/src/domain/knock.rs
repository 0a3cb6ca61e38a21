//! Knock steps and sequence parsing.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::ConfigRecord;
use crate::error::{Error, Result, TokenFault};

/// Byte offset of the port digits inside a token such as `t00:22`.
const PORT_OFFSET: usize = 4;

// ============================================================================
// Protocol
// ============================================================================

/// Transport used for a single knock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// A lone SYN from a non-blocking connect.
    Tcp,
    /// A single one-byte datagram.
    Udp,
}

impl Protocol {
    /// Map the first character of a token to a protocol.
    pub fn from_discriminator(c: char) -> Option<Self> {
        match c {
            't' => Some(Protocol::Tcp),
            'u' => Some(Protocol::Udp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// KnockStep
// ============================================================================

/// One packet of a knock sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct KnockStep {
    pub protocol: Protocol,
    pub port: u16,
}

impl KnockStep {
    pub fn new(protocol: Protocol, port: u16) -> Self {
        Self { protocol, port }
    }

    pub fn tcp(port: u16) -> Self {
        Self::new(Protocol::Tcp, port)
    }

    pub fn udp(port: u16) -> Self {
        Self::new(Protocol::Udp, port)
    }
}

impl fmt::Display for KnockStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.port)
    }
}

impl FromStr for KnockStep {
    type Err = Error;

    /// Parse a `<proto><pad>:<port>` token.
    ///
    /// The port is validated before the protocol letter, so `x00:0` reports
    /// a range error rather than an unknown protocol.
    fn from_str(token: &str) -> Result<Self> {
        let malformed = |fault| Error::MalformedToken {
            token: token.to_string(),
            fault,
        };

        let port = parse_port(token.as_bytes().get(PORT_OFFSET..).unwrap_or_default())
            .map_err(malformed)?;
        let protocol = token
            .chars()
            .next()
            .and_then(Protocol::from_discriminator)
            .ok_or_else(|| malformed(TokenFault::UnknownProtocol))?;

        Ok(Self { protocol, port })
    }
}

/// Parse a port the way `strtol` reads it: optional sign, leading decimal
/// digits, anything after the digits ignored. Works on raw bytes so the
/// fixed offset never depends on how the filler is encoded.
fn parse_port(text: &[u8]) -> std::result::Result<u16, TokenFault> {
    let (negative, rest) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, text),
    };

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Err(TokenFault::NoDigits);
    }

    let magnitude = rest[..digits]
        .iter()
        .try_fold(0i64, |acc, b| acc.checked_mul(10)?.checked_add(i64::from(b - b'0')))
        .ok_or(TokenFault::Overflow)?;
    let value = if negative { -magnitude } else { magnitude };

    u16::try_from(value)
        .ok()
        .filter(|port| *port != 0)
        .ok_or(TokenFault::OutOfRange)
}

// ============================================================================
// Sequence
// ============================================================================

/// The ordered knock tokens of one record.
///
/// Tokens are kept raw and parsed one at a time while knocking, so a bad
/// token only stops the run when it is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    host: String,
    tokens: Vec<String>,
}

impl Sequence {
    /// Split a matched record into its tokens.
    ///
    /// The record must begin with `<host>:`. Empty tokens are dropped, so
    /// `host:` and `host:,` both give an empty sequence.
    pub fn from_record(record: &ConfigRecord, host: &str) -> Result<Self> {
        let payload = record
            .as_str()
            .strip_prefix(host)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| Error::MalformedRecord {
                host: host.to_string(),
                record: record.as_str().to_string(),
            })?;

        let tokens = payload
            .split(',')
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            host: host.to_string(),
            tokens,
        })
    }

    /// The host this sequence knocks.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Lazily parse each token, in order.
    pub fn steps(&self) -> impl Iterator<Item = Result<KnockStep>> + '_ {
        self.tokens.iter().map(|token| token.parse())
    }

    /// Parse every token up front, failing on the first bad one.
    pub fn parse_all(&self) -> Result<Vec<KnockStep>> {
        self.steps().collect()
    }
}
