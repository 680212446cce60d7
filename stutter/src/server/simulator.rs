use std::convert::Infallible;

use rama::{
    Service,
    extensions::ExtensionsRef as _,
    http::{
        Body, HeaderValue, Request, Response, StatusCode, Version,
        header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    },
    telemetry::tracing,
};

use crate::{
    behavior::{BehaviorDescriptor, BehaviorParseError},
    delivery::{self, FlushTracker},
    session::SessionRegistry,
    step::ResolvedStep,
};

/// Usage summary appended to every `400 Bad Request`.
pub const USAGE: &str = r#"Usage: GET /?size=<bytes>[&id=<session>][&bin][&delay=<delay>][&bps=<bytes>][&cutOffs=<n0,n1,...>][&codes=<c0,c1,...>]

  size     total response bytes (required)
  id       session identifier, every request advances its step counter
  bin      binary payload served as application/octet-stream
  delay    dmin-dmax (random in [dmin, dmax)), d0,d1,... (per step) or d (always)
  bps      bandwidth cap: one chunk of this many bytes per second
  cutOffs  per step byte count after which the connection is severed,
           an empty entry disables the cut off for that step
  codes    per step HTTP status codes, non-2xx codes are served without payload

Lists are indexed by the session step, the last entry applies to all further steps.
Durations are written as value+unit, e.g. 500ms or 2s.
"#;

/// HTTP service which reproduces the misbehavior encoded
/// in the query string of each request.
///
/// The only state shared between requests is the [`SessionRegistry`].
#[derive(Debug, Clone)]
pub struct SimulatorHttpService<R> {
    sessions: R,
}

impl<R> SimulatorHttpService<R> {
    #[inline(always)]
    pub fn new(sessions: R) -> Self {
        Self { sessions }
    }
}

impl<R: SessionRegistry> Service<Request> for SimulatorHttpService<R> {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        if !supports_connection_takeover(req.version()) {
            tracing::debug!(
                "reject request over {:?}: connection cannot be severed mid-response",
                req.version()
            );
            return Ok(plain_text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Hijacking not supported by this connection".to_owned(),
            ));
        }

        let descriptor = match BehaviorDescriptor::from_query(req.uri().query().unwrap_or_default())
        {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::debug!("reject request with invalid query: {err}");
                return Ok(bad_request_response(&err));
            }
        };

        let step = self.sessions.claim_step(descriptor.session_id());
        let resolved = ResolvedStep::resolve(&descriptor, step);
        tracing::debug!(
            session = descriptor.session_id(),
            step,
            status = resolved.status.as_u16(),
            delay = ?resolved.delay,
            cut_off = ?resolved.cut_off,
            size = descriptor.size(),
            bps = ?descriptor.bytes_per_second(),
            "resolved behavior for request"
        );

        if !resolved.delay.is_zero() {
            tracing::info!("delay: {}", humantime::format_duration(resolved.delay));
            tokio::time::sleep(resolved.delay).await;
        }

        if !status_carries_content(resolved.status) {
            return Ok(empty_response(resolved.status));
        }

        if !resolved.status.is_success() {
            return Ok(status_response(resolved.status));
        }

        let flush = req.extensions().get::<FlushTracker>().cloned();
        Ok(delivery::payload_response(&descriptor, &resolved, flush))
    }
}

/// Only HTTP/1 connections can be severed without affecting other requests,
/// multiplexed protocols would reset a stream instead.
fn supports_connection_takeover(version: Version) -> bool {
    matches!(
        version,
        Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11
    )
}

/// `204`, `205` and `304` never have content, neither payload nor reason phrase.
fn status_carries_content(status: StatusCode) -> bool {
    !matches!(
        status,
        StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT | StatusCode::NOT_MODIFIED
    )
}

fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn plain_text_response(status: StatusCode, text: String) -> Response {
    let mut response = Response::new(Body::from(text));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    response
}

/// Simulated failure: the status with its reason phrase as the only body.
fn status_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or_default();
    plain_text_response(status, format!("{reason}\n"))
}

fn bad_request_response(err: &BehaviorParseError) -> Response {
    plain_text_response(
        StatusCode::BAD_REQUEST,
        format!("Error parsing query string: {err}\n\n{USAGE}"),
    )
}
