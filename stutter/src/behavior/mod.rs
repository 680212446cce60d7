//! Per-request misbehavior policy, decoded from the query string.
//!
//! A [`BehaviorDescriptor`] is created once per request and is read-only
//! afterwards. It describes *all* steps of a session; which step applies to
//! the current request is decided by the [`step`](crate::step) resolver.

use std::{fmt, num::NonZeroU64, time::Duration};

use rama::http::StatusCode;

mod error;
mod query;

pub use error::BehaviorParseError;


/// Immutable description of how the server has to misbehave
/// for the request it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorDescriptor {
    session_id: String,
    size: u64,
    bytes_per_second: Option<NonZeroU64>,
    payload_kind: PayloadKind,
    delay: DelaySpec,
    status_codes: Vec<StatusCode>,
    cut_offs: Vec<Option<u64>>,
}

impl BehaviorDescriptor {
    /// Parse a descriptor from a raw (url encoded) query string.
    ///
    /// Any malformed field aborts parsing, no partial descriptor is produced.
    pub fn from_query(query: &str) -> Result<Self, BehaviorParseError> {
        query::parse(query)
    }

    /// Key of the session counter this request advances.
    ///
    /// The empty string is a valid key, shared by all requests without `id`.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Total payload size in bytes, as declared in `Content-Length`.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bandwidth cap: one chunk of this many bytes per second.
    #[must_use]
    pub fn bytes_per_second(&self) -> Option<NonZeroU64> {
        self.bytes_per_second
    }

    #[must_use]
    pub fn payload_kind(&self) -> PayloadKind {
        self.payload_kind
    }

    #[must_use]
    pub fn delay(&self) -> &DelaySpec {
        &self.delay
    }

    #[must_use]
    pub fn status_codes(&self) -> &[StatusCode] {
        &self.status_codes
    }

    /// Truncation limits per step, `None` meaning "no truncation" for that step.
    #[must_use]
    pub fn cut_offs(&self) -> &[Option<u64>] {
        &self.cut_offs
    }
}

/// Alphabet and content type of the generated payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadKind {
    /// Printable ASCII drawn from `a-z A-Z 0-9`, space and newline.
    #[default]
    Text,
    /// Cryptographically random bytes.
    Binary,
}

impl PayloadKind {
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=us-ascii",
            Self::Binary => "application/octet-stream",
        }
    }
}

/// Shape of the `delay` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DelaySpec {
    /// No delay requested.
    #[default]
    None,
    /// Uniformly random delay in the half-open interval `[min, max)`,
    /// sampled with millisecond granularity.
    Range { min: Duration, max: Duration },
    /// The same delay for every step.
    Fixed(Duration),
    /// One delay per step, clamped to the last entry.
    Sequence(Vec<Duration>),
}

impl fmt::Display for DelaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Range { min, max } => write!(
                f,
                "[{}, {})",
                humantime::format_duration(*min),
                humantime::format_duration(*max)
            ),
            Self::Fixed(d) => write!(f, "{}", humantime::format_duration(*d)),
            Self::Sequence(delays) => {
                for (idx, d) in delays.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", humantime::format_duration(*d))?;
                }
                Ok(())
            }
        }
    }
}
