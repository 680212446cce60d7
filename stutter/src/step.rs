//! Resolve the concrete behavior of a single request,
//! given its descriptor and the step index claimed for its session.
//!
//! All per-step lists share the same index but are clamped independently:
//! an index beyond a list resolves to its last element, so that
//! "the first N requests behave one way, everything after like the N-th"
//! can be expressed with short lists.

use std::time::Duration;

use rama::http::StatusCode;
use rand::RngExt as _;

use crate::behavior::{BehaviorDescriptor, DelaySpec};

/// Concrete delay, status and truncation limit for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStep {
    pub step: u64,
    pub delay: Duration,
    pub status: StatusCode,
    /// Number of body bytes after which the connection is severed.
    pub cut_off: Option<u64>,
}

impl ResolvedStep {
    /// Resolve the step.
    ///
    /// A random delay range is sampled exactly once here,
    /// the result has to be used for the whole request.
    #[must_use]
    pub fn resolve(descriptor: &BehaviorDescriptor, step: u64) -> Self {
        Self {
            step,
            delay: delay_for_step(descriptor.delay(), step),
            status: status_for_step(descriptor.status_codes(), step),
            cut_off: cut_off_for_step(descriptor.cut_offs(), step),
        }
    }
}

fn clamp_to_last<T>(items: &[T], step: u64) -> Option<&T> {
    let last = items.len().checked_sub(1)?;
    let idx = usize::try_from(step).unwrap_or(usize::MAX).min(last);
    items.get(idx)
}

fn delay_for_step(spec: &DelaySpec, step: u64) -> Duration {
    match spec {
        DelaySpec::None => Duration::ZERO,
        DelaySpec::Range { min, max } => {
            let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
            let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
            if min_ms >= max_ms {
                return Duration::from_millis(min_ms);
            }
            Duration::from_millis(rand::rng().random_range(min_ms..max_ms))
        }
        DelaySpec::Fixed(delay) => *delay,
        DelaySpec::Sequence(delays) => clamp_to_last(delays, step).copied().unwrap_or_default(),
    }
}

fn status_for_step(codes: &[StatusCode], step: u64) -> StatusCode {
    clamp_to_last(codes, step).copied().unwrap_or(StatusCode::OK)
}

fn cut_off_for_step(cut_offs: &[Option<u64>], step: u64) -> Option<u64> {
    clamp_to_last(cut_offs, step).copied().flatten()
}
