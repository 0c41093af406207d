//! HTTP middleware stack.
//!
//! Re-exports the CORS, trace and hardening layers used by the router.

pub mod cors;
pub mod security;
pub mod trace;
