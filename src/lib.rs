//! Window Limiter - per-key sliding-window rate limiting
//!
//! This crate keeps a log of admitted request timestamps per key and admits a
//! new request only while fewer than `max_requests` of them fall inside the
//! trailing `window_seconds`. State lives in process memory and is safe to
//! share across threads.

pub mod config;
pub mod error;
pub mod ratelimit;
