//! Service plumbing shared by Clinic services.
//!
//! Nothing in here knows about patients or the outbox; it covers startup
//! (tracing, env config), HTTP probes and middleware, and sea-orm helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod serde;
pub mod tracing;
