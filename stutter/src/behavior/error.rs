use std::fmt;

/// Reason a query string could not be turned into a
/// [`BehaviorDescriptor`](super::BehaviorDescriptor).
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum BehaviorParseError {
    InvalidQuery(String),
    MissingSize,
    InvalidSize(String),
    InvalidBytesPerSecond(String),
    ZeroBytesPerSecond,
    InvalidDuration { token: String, reason: String },
    InvalidDelayRange(String),
    InvalidCutOff(String),
    InvalidStatusCode(String),
}

impl fmt::Display for BehaviorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuery(reason) => write!(f, "malformed query string: {reason}"),
            Self::MissingSize => write!(f, r#"required "size" parameter is missing"#),
            Self::InvalidSize(raw) => write!(f, "can't parse size {raw:?}"),
            Self::InvalidBytesPerSecond(raw) => {
                write!(f, "can't parse bytes per second {raw:?}")
            }
            Self::ZeroBytesPerSecond => write!(f, "bytes per second (bps) must be positive"),
            Self::InvalidDuration { token, reason } => {
                write!(f, "can't parse duration {token:?}: {reason}")
            }
            Self::InvalidDelayRange(raw) => write!(
                f,
                "invalid delay range {raw:?}: lower bound must be smaller than upper bound"
            ),
            Self::InvalidCutOff(token) => write!(f, "can't parse cut off {token:?}"),
            Self::InvalidStatusCode(token) => write!(f, "can't parse status code {token:?}"),
        }
    }
}

impl std::error::Error for BehaviorParseError {}
