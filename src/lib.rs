//! # Taskaro (Accounts & Calendar Tasks)
//!
//! `taskaro` is the backend for a calendar/to-do application. It owns account
//! registration with email verification, credential login, password reset,
//! and per-user calendar task CRUD.
//!
//! ## Account Verification (OTP)
//!
//! New accounts start unverified. Registration issues a one-time 4-digit code
//! that is emailed to the user and expires after 15 minutes. Logging in with
//! an unverified account re-issues a fresh code instead of a session, and the
//! client is routed back to the verification step. A correct code before
//! expiry flips the account to verified; from then on the verified flag is
//! the only gate.
//!
//! ## Sessions
//!
//! Verified logins receive a random session token in an `HttpOnly` cookie.
//! Only a SHA-256 hash of the token is stored server-side. Calendar task
//! endpoints resolve the cookie to a user and scope every query to it.
//!
//! ## Email Delivery
//!
//! Auth flows never send email inline. They enqueue a row in `email_outbox`
//! within the same transaction that mutates auth state; a background worker
//! delivers the message and retries failures with exponential backoff, so
//! request latency and correctness never depend on the mail provider.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
