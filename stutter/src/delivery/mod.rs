//! Streaming of the synthetic payload under pacing and truncation.
//!
//! The body is produced by a stream which follows a [`DeliveryPlan`]:
//! each planned chunk is written (and flushed by the HTTP/1 connection
//! driver as soon as the stream yields), followed by either a pacing sleep,
//! the end of the body, or a sever. A sever is expressed as a stream error,
//! which makes the connection driver abandon the response and drop the
//! socket while the declared `Content-Length` is still unfulfilled.
//!
//! The connection driver discards whatever it still buffers when the body
//! fails, so the sever is only raised once the [`FlushTracker`] of the
//! connection reports a completed flush.

use std::{io, num::NonZeroU64, time::Duration};

use futures::Stream;
use rama::{
    bytes::Bytes,
    http::{
        Body, HeaderValue, Response,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    telemetry::tracing,
};

use crate::{behavior::BehaviorDescriptor, step::ResolvedStep};

mod flush;
pub mod payload;
mod plan;

pub use flush::FlushTracker;
pub use plan::{Chunk, ChunkEnd, DeliveryPlan};

/// Pause between two paced chunks.
pub const PACING_INTERVAL: Duration = Duration::from_secs(1);

/// Create the (2xx) payload response for a resolved request.
///
/// `Content-Length` always declares the full size,
/// even when the resolved cut off will sever the transfer early.
pub fn payload_response(
    descriptor: &BehaviorDescriptor,
    resolved: &ResolvedStep,
    flush: Option<FlushTracker>,
) -> Response {
    let kind = descriptor.payload_kind();
    let plan = DeliveryPlan::new(
        descriptor.size(),
        descriptor.bytes_per_second().map(NonZeroU64::get),
        resolved.cut_off,
    );
    let payload = payload::generate(kind, plan.max_chunk_len());

    let body = Body::from_stream(body_stream(payload, plan, descriptor.size(), flush));

    let mut response = Response::new(body);
    *response.status_mut() = resolved.status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(kind.content_type()));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(descriptor.size()));

    response
}

/// Stream the frames of `plan`, sourcing every chunk from the start of `payload`.
///
/// A chunk larger than `payload` is split into back-to-back frames
/// that repeat the buffer, without pacing in between.
///
/// Without a `flush` tracker the sever only yields once to the
/// connection driver before failing the body.
pub fn body_stream(
    payload: Bytes,
    plan: DeliveryPlan,
    declared: u64,
    flush: Option<FlushTracker>,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    let state = DeliveryState {
        payload,
        plan,
        current: None,
        delivered: 0,
        declared,
        flush,
    };
    futures::stream::unfold(state, DeliveryState::next_frame)
}

#[derive(Debug)]
struct DeliveryState {
    payload: Bytes,
    plan: DeliveryPlan,
    /// bytes left in the chunk in flight and what follows it
    current: Option<(u64, ChunkEnd)>,
    delivered: u64,
    declared: u64,
    flush: Option<FlushTracker>,
}

impl DeliveryState {
    async fn next_frame(mut self) -> Option<(io::Result<Bytes>, Self)> {
        loop {
            if let Some((left, end)) = self.current {
                if left > 0 && !self.payload.is_empty() {
                    let n = usize::try_from(left)
                        .unwrap_or(usize::MAX)
                        .min(self.payload.len());
                    self.current = Some((left - n as u64, end));
                    self.delivered += n as u64;
                    let frame = self.payload.slice(..n);
                    return Some((Ok(frame), self));
                }

                self.current = None;
                match end {
                    ChunkEnd::Done => {
                        tracing::trace!(delivered = self.delivered, "payload fully delivered");
                        return None;
                    }
                    ChunkEnd::Pace => tokio::time::sleep(PACING_INTERVAL).await,
                    ChunkEnd::Sever => {
                        self.wait_for_flush().await;
                        tracing::debug!(
                            delivered = self.delivered,
                            declared = self.declared,
                            "cut off reached: sever connection"
                        );
                        let err = io::Error::new(
                            io::ErrorKind::ConnectionAborted,
                            format!(
                                "connection severed after {} of {} bytes",
                                self.delivered, self.declared
                            ),
                        );
                        return Some((Err(err), self));
                    }
                }
            }

            let chunk = self.plan.next()?;
            self.current = Some((chunk.len, chunk.end));
        }
    }

    /// Every frame yielded so far has been handed to the connection driver,
    /// wait until it reached the transport.
    async fn wait_for_flush(&self) {
        match self.flush.as_ref() {
            Some(tracker) => {
                let mark = tracker.flush_count();
                tracker.flushed_since(mark).await;
                tracing::trace!(
                    transport.written = tracker.written(),
                    "transport flushed before sever"
                );
            }
            None => tokio::task::yield_now().await,
        }
    }
}
