//! Database models for the Signoff Control Plane.

mod audit;
mod delegation;
mod employee;
mod instance;
mod notification;
mod request;
mod workflow;

pub use audit::{AuditEntry, AuditKind};
pub use delegation::DelegationRule;
pub use employee::EmployeeRef;
pub use instance::{ApprovalStatus, Decision, DecisionRow, InstanceRow, StageStatusRow};
pub use notification::Notification;
pub use request::RequestRow;
pub use workflow::{ApprovalRule, RequestType, StageApproverRow, StageRow, WorkflowRow};
