//! Status aggregation.
//!
//! Two employee-level formulas coexist and both are load-bearing:
//!
//! - [`employee_status`] backs the stored `Employee::status`. It counts a
//!   department as cleared when every response row recorded for the pair is
//!   checked, stale rows for no-longer-applicable questions included.
//! - [`overall_view_status`] backs the per-employee breakdown. It works from
//!   department statuses computed over applicable questions only.
//!
//! They agree whenever no stale rows exist.

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{ClearanceStatus, DepartmentId, Employee, Response};

/// Department-level status for one (employee, department) response set.
pub fn department_status<'a, I>(responses: I) -> ClearanceStatus
where
    I: IntoIterator<Item = &'a Response>,
{
    let mut total = 0usize;
    let mut checked = 0usize;
    for response in responses {
        total += 1;
        if response.is_checked {
            checked += 1;
        }
    }

    if total == 0 || checked == 0 {
        ClearanceStatus::Pending
    } else if checked == total {
        ClearanceStatus::Done
    } else {
        ClearanceStatus::InProgress
    }
}

/// A department is cleared once its response set is non-empty and fully checked.
pub fn is_cleared<'a, I>(responses: I) -> bool
where
    I: IntoIterator<Item = &'a Response>,
{
    department_status(responses) == ClearanceStatus::Done
}

/// Employee-level status from department completion counts.
pub fn employee_status(cleared: usize, assigned: usize) -> ClearanceStatus {
    if cleared == 0 {
        ClearanceStatus::Pending
    } else if cleared < assigned {
        ClearanceStatus::InProgress
    } else {
        ClearanceStatus::Done
    }
}

/// Derive the stored status of `employee` from every response row it owns.
///
/// Rows for departments outside the current assignment are ignored.
pub fn derive_employee_status(employee: &Employee, responses: &[Response]) -> ClearanceStatus {
    let mut by_department: BTreeMap<DepartmentId, Vec<&Response>> = BTreeMap::new();
    for response in responses
        .iter()
        .filter(|response| response.employee_id == employee.id)
    {
        by_department
            .entry(response.department_id)
            .or_default()
            .push(response);
    }

    let cleared = employee
        .assigned_departments
        .iter()
        .filter(|department| {
            by_department
                .get(*department)
                .is_some_and(|rows| is_cleared(rows.iter().copied()))
        })
        .count();

    employee_status(cleared, employee.assigned_departments.len())
}

/// Overall status shown next to the per-department breakdown.
pub fn overall_view_status(department_statuses: &[ClearanceStatus]) -> ClearanceStatus {
    let any_done = department_statuses
        .iter()
        .any(|status| *status == ClearanceStatus::Done);
    let all_done = department_statuses
        .iter()
        .all(|status| *status == ClearanceStatus::Done);

    if all_done && !department_statuses.is_empty() {
        ClearanceStatus::Done
    } else if any_done {
        ClearanceStatus::InProgress
    } else {
        ClearanceStatus::Pending
    }
}

/// Completion counts for employees assigned to a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepartmentProgress {
    pub department_id: DepartmentId,
    pub total: usize,
    pub done: usize,
    pub pending: usize,
}

impl DepartmentProgress {
    pub fn new(department_id: DepartmentId, total: usize, done: usize) -> Self {
        Self {
            department_id,
            total,
            done,
            pending: total.saturating_sub(done),
        }
    }
}

/// Global tally of employees by stored status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearanceSummary {
    pub total: usize,
    pub pending: usize,
    #[serde(rename = "inprogress")]
    pub in_progress: usize,
    pub done: usize,
}

impl ClearanceSummary {
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ClearanceStatus>,
    {
        statuses
            .into_iter()
            .fold(Self::default(), |mut summary, status| {
                summary.total += 1;
                match status {
                    ClearanceStatus::Pending => summary.pending += 1,
                    ClearanceStatus::InProgress => summary.in_progress += 1,
                    ClearanceStatus::Done => summary.done += 1,
                }
                summary
            })
    }
}
