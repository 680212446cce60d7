use std::{borrow::Cow, num::NonZeroU64, time::Duration};

use rama::http::StatusCode;
use serde::Deserialize;

use super::{BehaviorDescriptor, BehaviorParseError, DelaySpec, PayloadKind};

/// Raw view on the recognised query keys.
///
/// Every key is collected as a list so repeated keys never fail to decode,
/// only the first value of each key is used.
#[derive(Debug, Default, Deserialize)]
struct RawQuery<'a> {
    #[serde(default, borrow)]
    size: Vec<Cow<'a, str>>,
    #[serde(default, borrow)]
    bps: Vec<Cow<'a, str>>,
    #[serde(default, borrow)]
    bin: Vec<Cow<'a, str>>,
    #[serde(default, borrow)]
    id: Vec<Cow<'a, str>>,
    #[serde(default, borrow)]
    delay: Vec<Cow<'a, str>>,
    #[serde(default, borrow, rename = "cutOffs")]
    cut_offs: Vec<Cow<'a, str>>,
    #[serde(default, borrow)]
    codes: Vec<Cow<'a, str>>,
}

fn first<'b>(values: &'b [Cow<'_, str>]) -> Option<&'b str> {
    values.first().map(|v| v.as_ref())
}

fn first_non_empty<'b>(values: &'b [Cow<'_, str>]) -> Option<&'b str> {
    first(values).filter(|v| !v.is_empty())
}

pub(super) fn parse(query: &str) -> Result<BehaviorDescriptor, BehaviorParseError> {
    let raw: RawQuery<'_> = serde_html_form::from_str(query)
        .map_err(|err| BehaviorParseError::InvalidQuery(err.to_string()))?;

    let delay = first_non_empty(&raw.delay)
        .map(parse_delay)
        .transpose()?
        .unwrap_or_default();

    let size = parse_size(first_non_empty(&raw.size))?;

    let bytes_per_second = first_non_empty(&raw.bps)
        .map(parse_bytes_per_second)
        .transpose()?;

    let cut_offs = first_non_empty(&raw.cut_offs)
        .map(parse_cut_offs)
        .transpose()?
        .unwrap_or_default();

    let status_codes = first_non_empty(&raw.codes)
        .map(parse_status_codes)
        .transpose()?
        .unwrap_or_default();

    let payload_kind = if raw.bin.is_empty() {
        PayloadKind::Text
    } else {
        PayloadKind::Binary
    };

    Ok(BehaviorDescriptor {
        session_id: first(&raw.id).unwrap_or_default().to_owned(),
        size,
        bytes_per_second,
        payload_kind,
        delay,
        status_codes,
        cut_offs,
    })
}

fn parse_size(raw: Option<&str>) -> Result<u64, BehaviorParseError> {
    let raw = raw.ok_or(BehaviorParseError::MissingSize)?;
    raw.trim()
        .parse()
        .map_err(|_| BehaviorParseError::InvalidSize(raw.to_owned()))
}

fn parse_bytes_per_second(raw: &str) -> Result<NonZeroU64, BehaviorParseError> {
    let bps: u64 = raw
        .trim()
        .parse()
        .map_err(|_| BehaviorParseError::InvalidBytesPerSecond(raw.to_owned()))?;
    NonZeroU64::new(bps).ok_or(BehaviorParseError::ZeroBytesPerSecond)
}

fn parse_duration(token: &str) -> Result<Duration, BehaviorParseError> {
    humantime::parse_duration(token.trim()).map_err(|err| BehaviorParseError::InvalidDuration {
        token: token.to_owned(),
        reason: err.to_string(),
    })
}

/// `dmin-dmax` selects a random range, anything else is
/// a comma separated list of durations.
fn parse_delay(raw: &str) -> Result<DelaySpec, BehaviorParseError> {
    if let Some((lower, upper)) = raw.split_once('-')
        && !upper.contains('-')
    {
        let min = parse_duration(lower)?;
        let max = parse_duration(upper)?;
        if min.as_millis() >= max.as_millis() {
            return Err(BehaviorParseError::InvalidDelayRange(raw.to_owned()));
        }
        return Ok(DelaySpec::Range { min, max });
    }

    let mut delays = raw
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(parse_duration)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match delays.len() {
        0 => DelaySpec::None,
        1 => DelaySpec::Fixed(delays.remove(0)),
        _ => DelaySpec::Sequence(delays),
    })
}

/// Empty tokens (and negative numbers) disable truncation for their step.
fn parse_cut_offs(raw: &str) -> Result<Vec<Option<u64>>, BehaviorParseError> {
    raw.split(',')
        .map(|token| {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let n: i64 = trimmed
                .parse()
                .map_err(|_| BehaviorParseError::InvalidCutOff(token.to_owned()))?;
            Ok(u64::try_from(n).ok())
        })
        .collect()
}

fn parse_status_codes(raw: &str) -> Result<Vec<StatusCode>, BehaviorParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u16>()
                .ok()
                .and_then(|n| StatusCode::from_u16(n).ok())
                .filter(|code| !code.is_informational())
                .ok_or_else(|| BehaviorParseError::InvalidStatusCode(token.to_owned()))
        })
        .collect()
}
