use serde::Serialize;

use super::domain::{
    ClearanceStatus, Comment, CommentId, DepartmentId, EmployeeId, QuestionId, Response,
    ResponseId,
};

/// Per-employee clearance breakdown across the assigned departments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeClearanceView {
    pub employee_id: EmployeeId,
    pub employee: String,
    pub employee_department: Option<String>,
    pub overall_status: ClearanceStatus,
    pub departments: Vec<DepartmentClearanceView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentClearanceView {
    pub department_id: DepartmentId,
    pub department: String,
    pub status: ClearanceStatus,
    pub questions: Vec<QuestionStateView>,
    pub comment: String,
    pub department_head_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionStateView {
    pub id: QuestionId,
    pub text: String,
    pub is_checked: bool,
    pub is_concerned_question: bool,
}

/// Result of the provisioning lookup for one (employee, department) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeChecklist {
    pub employee_id: EmployeeId,
    pub department_id: DepartmentId,
    pub questions: Vec<ChecklistItem>,
    pub department_comment_data: CommentData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub id: QuestionId,
    pub text: String,
    pub response_id: ResponseId,
    pub is_checked: bool,
    pub is_concerned_question: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentData {
    pub comment_id: Option<CommentId>,
    pub comment_text: String,
    pub department_head_id: Option<String>,
}

impl From<Option<&Comment>> for CommentData {
    fn from(comment: Option<&Comment>) -> Self {
        match comment {
            Some(comment) => Self {
                comment_id: Some(comment.id),
                comment_text: comment.text.clone(),
                department_head_id: comment.department_head_id.clone(),
            },
            None => Self::default(),
        }
    }
}

/// Outcome of a checklist answer, carrying the statuses it invalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseUpdate {
    pub response: Response,
    pub department_status: ClearanceStatus,
    pub employee_status: ClearanceStatus,
}
