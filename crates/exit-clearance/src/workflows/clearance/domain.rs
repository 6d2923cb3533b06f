use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for departments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub u64);

/// Identifier wrapper for checklist questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u64);

/// Internal identifier for employee records (distinct from the external employee code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clearance status shared by the department-level and employee-level derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClearanceStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "inprogress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl ClearanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ClearanceStatus::Pending => "pending",
            ClearanceStatus::InProgress => "inprogress",
            ClearanceStatus::Done => "done",
        }
    }
}

impl fmt::Display for ClearanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparationType {
    Resignation,
    Termination,
    Retirement,
    Other,
}

/// Organizational unit that answers a clearance checklist.
///
/// Only departments flagged `is_assignable` take part in clearance workflows;
/// the rest are administrative-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub secret: Option<String>,
    pub is_assignable: bool,
    pub created_at: DateTime<Utc>,
}

impl Department {
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_assignable: bool,
}

/// Checklist question owned by exactly one department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub department_id: DepartmentId,
    pub text: String,
    /// Asked only when the employee's home department is the owning department.
    pub concerned_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub department_id: DepartmentId,
    pub text: String,
    #[serde(default)]
    pub concerned_only: bool,
}

/// Departing employee tracked through clearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub employee_code: String,
    /// Free-text home department; compared to `Department::name` verbatim.
    pub home_department: Option<String>,
    pub designation: String,
    pub last_working_date: NaiveDate,
    pub separation_type: SeparationType,
    pub assigned_departments: BTreeSet<DepartmentId>,
    /// Cached derivation, only ever written by status recomputation.
    pub status: ClearanceStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn is_assigned(&self, department: DepartmentId) -> bool {
        self.assigned_departments.contains(&department)
    }
}

/// Registration payload submitted by HR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub employee_code: String,
    #[serde(default)]
    pub home_department: Option<String>,
    pub designation: String,
    pub last_working_date: NaiveDate,
    pub separation_type: SeparationType,
    #[serde(default)]
    pub assigned_departments: Vec<DepartmentId>,
}

/// One checklist answer for an (employee, department, question) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub employee_id: EmployeeId,
    pub department_id: DepartmentId,
    pub question_id: QuestionId,
    pub is_checked: bool,
}

/// Department sign-off for an employee; one per (employee, department) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub employee_id: EmployeeId,
    pub department_id: DepartmentId,
    pub text: String,
    pub department_head_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Authenticated caller, resolved upstream and handed to every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "department_id", rename_all = "snake_case")]
pub enum Identity {
    Hr,
    Department(DepartmentId),
}

impl Identity {
    pub fn is_hr(&self) -> bool {
        matches!(self, Identity::Hr)
    }

    pub fn department(&self) -> Option<DepartmentId> {
        match self {
            Identity::Hr => None,
            Identity::Department(id) => Some(*id),
        }
    }

    /// HR reads everything; a department only its own rows.
    pub fn can_read(&self, department: DepartmentId) -> bool {
        match self {
            Identity::Hr => true,
            Identity::Department(own) => *own == department,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Identity::Hr => "hr".to_string(),
            Identity::Department(id) => format!("department:{id}"),
        }
    }
}
