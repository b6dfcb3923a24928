//! Account signup, login, OTP verification, password reset, and sessions.
//!
//! ### Verification life cycle
//!
//! Signup creates an unverified account and issues a 4-digit one-time code
//! with a 15 minute expiry. Logging in before verification re-issues a fresh
//! code instead of a session. Each account has at most one pending code (the
//! user id is the ledger's primary key), so issuing is always an upsert that
//! invalidates the previous code. A correct code before expiry flips the
//! account to verified and deletes the ledger row; afterwards the verified
//! flag is the only gate and re-verifying is a no-op success.
//!
//! Every code issuance enqueues an `email_outbox` row in the same transaction;
//! delivery is the outbox worker's problem, never the request's.

pub mod error;
pub mod login;
pub mod password;
pub mod principal;
pub mod rate_limit;
pub mod session;
pub mod signup;
pub mod state;
pub(crate) mod storage;
pub mod types;
pub(crate) mod utils;
pub mod verification;

pub use self::rate_limit::{NoopRateLimiter, RateLimiter};
pub use self::state::{AuthConfig, AuthState};
