use serde::{Deserialize, Serialize};

use super::domain::{
    ClearanceStatus, Comment, CommentId, Department, DepartmentId, Employee, EmployeeId,
    NewDepartment, NewEmployee, NewQuestion, Question, QuestionId, Response, ResponseId,
};

/// Optional (employee, department) narrowing used by response and comment queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFilter {
    #[serde(default)]
    pub employee: Option<EmployeeId>,
    #[serde(default)]
    pub department: Option<DepartmentId>,
}

impl PairFilter {
    pub fn pair(employee: EmployeeId, department: DepartmentId) -> Self {
        Self {
            employee: Some(employee),
            department: Some(department),
        }
    }

    pub fn employee(employee: EmployeeId) -> Self {
        Self {
            employee: Some(employee),
            department: None,
        }
    }

    pub fn matches(&self, employee: EmployeeId, department: DepartmentId) -> bool {
        self.employee.map_or(true, |wanted| wanted == employee)
            && self.department.map_or(true, |wanted| wanted == department)
    }
}

/// Rows created by a single provisioning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    pub responses_created: usize,
    pub comment_created: bool,
}

impl ProvisionOutcome {
    pub fn is_noop(&self) -> bool {
        self.responses_created == 0 && !self.comment_created
    }
}

/// Storage contract consumed by the clearance service.
///
/// Implementations own identifier assignment and uniqueness: department name
/// and email, employee code, one response per (employee, department, question)
/// and one comment per (employee, department). Deleting an employee or a
/// department removes its responses and comments.
pub trait ClearanceRepository: Send + Sync {
    fn insert_department(&self, draft: NewDepartment) -> Result<Department, RepositoryError>;
    fn update_department(&self, department: Department) -> Result<(), RepositoryError>;
    fn fetch_department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError>;
    fn find_department_by_email(&self, email: &str)
        -> Result<Option<Department>, RepositoryError>;
    fn departments(&self) -> Result<Vec<Department>, RepositoryError>;
    /// Also drops the department's questions and its id from every assignment.
    fn delete_department(&self, id: DepartmentId) -> Result<(), RepositoryError>;

    fn insert_question(&self, draft: NewQuestion) -> Result<Question, RepositoryError>;
    fn fetch_question(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError>;
    fn questions(&self, department: Option<DepartmentId>)
        -> Result<Vec<Question>, RepositoryError>;

    fn insert_employee(&self, draft: NewEmployee) -> Result<Employee, RepositoryError>;
    fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError>;
    /// Write only the cached status column.
    fn set_employee_status(
        &self,
        id: EmployeeId,
        status: ClearanceStatus,
    ) -> Result<(), RepositoryError>;
    fn fetch_employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    /// Newest first; `department` keeps only employees assigned to it.
    fn employees(&self, department: Option<DepartmentId>)
        -> Result<Vec<Employee>, RepositoryError>;
    fn delete_employee(&self, id: EmployeeId) -> Result<(), RepositoryError>;

    /// Get-or-create the responses for `questions` and the pair's comment in one
    /// atomic step. Existing rows are left untouched.
    fn provision(
        &self,
        employee: EmployeeId,
        department: DepartmentId,
        questions: &[QuestionId],
    ) -> Result<ProvisionOutcome, RepositoryError>;
    fn fetch_response(&self, id: ResponseId) -> Result<Option<Response>, RepositoryError>;
    fn update_response(&self, response: Response) -> Result<(), RepositoryError>;
    fn responses(&self, filter: PairFilter) -> Result<Vec<Response>, RepositoryError>;

    fn fetch_comment(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError>;
    /// Create the pair's comment or overwrite its text and department head.
    fn upsert_comment(
        &self,
        employee: EmployeeId,
        department: DepartmentId,
        text: String,
        department_head_id: Option<String>,
    ) -> Result<Comment, RepositoryError>;
    fn update_comment(&self, comment: Comment) -> Result<(), RepositoryError>;
    fn comments(&self, filter: PairFilter) -> Result<Vec<Comment>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Conflict(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
