//! Database queries for the Signoff Control Plane.
//!
//! Query functions take `impl PgExecutor` so they run against the pool or
//! inside a caller-owned transaction.

pub mod audit;
pub mod delegation;
pub mod instance;
pub mod notification;
pub mod request;
pub mod roster;
pub mod workflow;
