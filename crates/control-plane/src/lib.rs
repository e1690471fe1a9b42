//! Signoff Control Plane Library
//!
//! This crate provides the approval workflow control plane for Signoff,
//! handling:
//!
//! - **Workflow Definitions**: Versioned, immutable stage pipelines with
//!   quorum rules (`all`, `anyN`, `weighted`) per stage
//! - **Approval Instances**: One execution of a definition per submitted
//!   request, with per-stage runtime state
//! - **Decisions**: Approver (and delegate) actions, evaluated against the
//!   stage rule after every action
//! - **Resubmission Chains**: Rejected instances can be resubmitted once,
//!   linking parent and child
//! - **Audit Trail**: Append-only log of everything that happened to an
//!   instance
//!
//! ## Architecture
//!
//! All state lives in PostgreSQL. The pure engine
//! ([`engine::evaluate`](crate::engine::evaluate) and
//! [`engine::plan`](crate::engine::plan)) decides stage outcomes and
//! transitions over in-memory snapshots; services load state, consult the
//! engine, and apply the result in a single transaction per operation.
//! Invariants that must hold under concurrency (one decision per roster
//! slot, one pending instance per request, one resubmission per instance)
//! are also enforced as Postgres unique constraints.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`db`]: Database connectivity, models, and queries
//! - [`engine`]: Pure rule evaluation and stage transition planning
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`services`]: Business logic services
//! - [`state`]: Shared application state

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod result_ext;
pub mod services;
pub mod state;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
