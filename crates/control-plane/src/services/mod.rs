//! Business logic services for the Signoff Control Plane.

pub mod approval;
pub mod audit;
pub mod delegation;
pub mod resubmission;
pub mod workflow;

pub use approval::ApprovalService;
pub use audit::AuditService;
pub use delegation::DelegationService;
pub use resubmission::ResubmissionService;
pub use workflow::WorkflowService;
