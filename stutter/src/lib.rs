//! HTTP server which misbehaves on request.
//!
//! Every request describes, in its query string, how the response should
//! fail: slow (delay, bandwidth cap), truncated (connection severed after a
//! number of bytes) or with an unexpected status code. Behaviors can change
//! from one request to the next by sharing a session `id`.

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod behavior;
pub mod cli;
pub mod delivery;
pub mod server;
pub mod session;
pub mod step;
pub mod utils;
