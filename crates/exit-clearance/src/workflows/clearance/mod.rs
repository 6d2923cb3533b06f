//! Exit clearance tracking for separating employees.
//!
//! Departments own checklists of questions. Assigning an employee to a
//! department provisions one response per applicable question plus a single
//! comment slot, and the employee status is derived from how many assigned
//! departments have every response checked.

pub mod domain;
pub mod memory;
pub mod provisioner;
pub mod repository;
pub mod router;
pub mod selection;
pub mod service;
pub mod status;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    ClearanceStatus, Comment, CommentId, Department, DepartmentId, Employee, EmployeeId,
    Identity, NewDepartment, NewEmployee, NewQuestion, Question, QuestionId, Response,
    ResponseId, SeparationType,
};
pub use memory::InMemoryClearanceRepository;
pub use provisioner::reconcile;
pub use repository::{ClearanceRepository, PairFilter, ProvisionOutcome, RepositoryError};
pub use router::{clearance_router, identity_from_headers, DEPARTMENT_HEADER, ROLE_HEADER};
pub use selection::applicable_questions;
pub use service::{
    ClearanceError, ClearancePolicy, ClearanceService, CommentEdit, CommentUpsert,
};
pub use status::{ClearanceSummary, DepartmentProgress};
pub use views::{
    ChecklistItem, CommentData, DepartmentClearanceView, EmployeeClearanceView,
    EmployeeChecklist, QuestionStateView, ResponseUpdate,
};
