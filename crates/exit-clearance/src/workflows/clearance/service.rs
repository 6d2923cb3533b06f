use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    ClearanceStatus, Comment, CommentId, Department, DepartmentId, Employee, EmployeeId, Identity,
    NewDepartment, NewEmployee, NewQuestion, Question, QuestionId, Response, ResponseId,
};
use super::provisioner::reconcile;
use super::repository::{ClearanceRepository, PairFilter, RepositoryError};
use super::selection::{applicable_question_ids, applicable_questions, display_key};
use super::status::{
    department_status, derive_employee_status, is_cleared, overall_view_status,
    ClearanceSummary, DepartmentProgress,
};
use super::views::{
    ChecklistItem, CommentData, DepartmentClearanceView, EmployeeChecklist,
    EmployeeClearanceView, QuestionStateView, ResponseUpdate,
};

/// Tunables for behavior the workflow leaves to deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearancePolicy {
    /// Let the checklist lookup provision pairs outside the employee's assignment.
    pub provision_unassigned_lookups: bool,
}

impl Default for ClearancePolicy {
    fn default() -> Self {
        Self {
            provision_unassigned_lookups: true,
        }
    }
}

/// Department sign-off request. Ids are optional so missing ones surface as
/// `InvalidInput` rather than a body rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentUpsert {
    #[serde(default)]
    pub employee: Option<EmployeeId>,
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub comment_text: String,
    #[serde(default)]
    pub department_head_id: Option<String>,
}

/// Edit of an existing comment; an omitted head id keeps the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEdit {
    #[serde(default)]
    pub comment_text: String,
    #[serde(default)]
    pub department_head_id: Option<String>,
}

/// Facade over the catalog, registry and ledgers.
///
/// Every write that can change an employee's checklist re-runs provisioning
/// for the affected pairs and then recomputes the cached `Employee::status`
/// before returning.
pub struct ClearanceService<R> {
    repository: Arc<R>,
    policy: ClearancePolicy,
}

impl<R> ClearanceService<R>
where
    R: ClearanceRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: ClearancePolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> ClearancePolicy {
        self.policy
    }

    pub fn create_department(
        &self,
        identity: &Identity,
        draft: NewDepartment,
    ) -> Result<Department, ClearanceError> {
        require_hr(identity, "create departments")?;

        let name = draft.name.trim().to_string();
        let email = draft.email.trim().to_string();
        if name.is_empty() {
            return Err(ClearanceError::InvalidInput(
                "department name is required".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(ClearanceError::InvalidInput(format!(
                "'{email}' is not a valid department email"
            )));
        }

        let department = self.repository.insert_department(NewDepartment {
            name,
            email,
            is_assignable: draft.is_assignable,
        })?;
        info!(
            department = %department.id,
            name = %department.name,
            assignable = department.is_assignable,
            "department created"
        );
        Ok(department)
    }

    pub fn list_departments(&self) -> Result<Vec<Department>, ClearanceError> {
        Ok(self.repository.departments()?)
    }

    pub fn get_department(&self, id: DepartmentId) -> Result<Department, ClearanceError> {
        self.department(id)
    }

    /// Remove a department together with its questions, responses and comments.
    pub fn delete_department(
        &self,
        identity: &Identity,
        id: DepartmentId,
    ) -> Result<(), ClearanceError> {
        require_hr(identity, "delete departments")?;
        let department = self.department(id)?;
        let affected = self.repository.employees(Some(id))?;

        self.repository.delete_department(id)?;
        info!(department = %id, name = %department.name, "department deleted");

        for employee in &affected {
            self.recompute_status(employee.id)?;
        }
        Ok(())
    }

    /// Set the shared secret a department authenticates with. Re-setting
    /// overwrites the previous secret.
    pub fn set_department_secret(
        &self,
        identity: &Identity,
        email: &str,
        secret: &str,
    ) -> Result<(), ClearanceError> {
        require_hr(identity, "set department secrets")?;
        if secret.trim().is_empty() {
            return Err(ClearanceError::InvalidInput(
                "department secret must not be empty".to_string(),
            ));
        }

        let mut department = self
            .repository
            .find_department_by_email(email.trim())?
            .ok_or_else(|| ClearanceError::not_found("department", email))?;
        if department.has_secret() {
            warn!(department = %department.id, "overwriting existing department secret");
        }
        department.secret = Some(secret.to_string());
        self.repository.update_department(department)?;
        Ok(())
    }

    /// Resolve a department identity from its email and shared secret.
    pub fn authenticate_department(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<(Identity, Department), ClearanceError> {
        let department = self
            .repository
            .find_department_by_email(email.trim())?
            .ok_or_else(|| ClearanceError::not_found("department", email))?;

        match department.secret.as_deref() {
            Some(stored) if stored == secret => {
                Ok((Identity::Department(department.id), department))
            }
            _ => {
                warn!(department = %department.id, "department authentication rejected");
                Err(ClearanceError::Forbidden(
                    "invalid department credentials".to_string(),
                ))
            }
        }
    }

    /// Add a question and provision it for every employee assigned to its department.
    pub fn create_question(
        &self,
        identity: &Identity,
        draft: NewQuestion,
    ) -> Result<Question, ClearanceError> {
        require_hr(identity, "create questions")?;

        let text = draft.text.trim().to_string();
        if text.is_empty() {
            return Err(ClearanceError::InvalidInput(
                "question text is required".to_string(),
            ));
        }
        let department = self.department(draft.department_id)?;

        let question = self.repository.insert_question(NewQuestion {
            department_id: department.id,
            text,
            concerned_only: draft.concerned_only,
        })?;
        info!(
            question = %question.id,
            department = %department.id,
            concerned_only = question.concerned_only,
            "question created"
        );

        let assigned = self.repository.employees(Some(department.id))?;
        for employee in &assigned {
            reconcile(self.repository.as_ref(), employee, &department)?;
        }
        for employee in &assigned {
            self.recompute_status(employee.id)?;
        }
        Ok(question)
    }

    /// Questions grouped by department, general questions before concerned ones.
    pub fn list_questions(
        &self,
        department: Option<DepartmentId>,
    ) -> Result<Vec<Question>, ClearanceError> {
        let mut questions = self.repository.questions(department)?;
        questions.sort_by_key(|question| (question.department_id, display_key(question)));
        Ok(questions)
    }

    /// Get-or-provision read: reconciles the pair, then returns its checklist.
    ///
    /// Older employee/question combinations heal on this path. Pairs outside
    /// the employee's assignment are provisioned too unless the policy
    /// disables it.
    pub fn questions_for_employee(
        &self,
        identity: &Identity,
        employee_id: EmployeeId,
        department_id: DepartmentId,
    ) -> Result<EmployeeChecklist, ClearanceError> {
        if !identity.can_read(department_id) {
            return Err(forbidden(
                identity,
                "a department can only read its own checklist",
            ));
        }
        let employee = self.employee(employee_id)?;
        let department = self.department(department_id)?;

        let assigned = employee.is_assigned(department.id);
        if !assigned && !self.policy.provision_unassigned_lookups {
            return Err(ClearanceError::InvalidInput(format!(
                "department {} is not assigned to employee {}",
                department.id, employee.id
            )));
        }

        let outcome = reconcile(self.repository.as_ref(), &employee, &department)?;
        if assigned && outcome.responses_created > 0 {
            self.recompute_status(employee.id)?;
        }

        let catalog = self.repository.questions(Some(department.id))?;
        let responses = self
            .repository
            .responses(PairFilter::pair(employee.id, department.id))?;
        let by_question: HashMap<QuestionId, &Response> = responses
            .iter()
            .map(|response| (response.question_id, response))
            .collect();

        let questions = applicable_questions(&employee, &department, &catalog)
            .into_iter()
            .filter_map(|question| {
                by_question.get(&question.id).map(|response| ChecklistItem {
                    id: question.id,
                    text: question.text,
                    response_id: response.id,
                    is_checked: response.is_checked,
                    is_concerned_question: question.concerned_only,
                })
            })
            .collect();

        let comments = self
            .repository
            .comments(PairFilter::pair(employee.id, department.id))?;

        Ok(EmployeeChecklist {
            employee_id: employee.id,
            department_id: department.id,
            questions,
            department_comment_data: CommentData::from(comments.first()),
        })
    }

    /// Register a departing employee and provision every assigned department.
    pub fn create_employee(
        &self,
        identity: &Identity,
        draft: NewEmployee,
    ) -> Result<Employee, ClearanceError> {
        require_hr(identity, "register employees")?;

        let name = required(&draft.name, "employee name")?;
        let employee_code = required(&draft.employee_code, "employee code")?;
        let designation = required(&draft.designation, "designation")?;
        let departments = self.assignable_departments(&draft.assigned_departments)?;

        let employee = self.repository.insert_employee(NewEmployee {
            name,
            employee_code,
            designation,
            assigned_departments: departments
                .iter()
                .map(|department| department.id)
                .collect(),
            ..draft
        })?;
        info!(
            employee = %employee.id,
            code = %employee.employee_code,
            departments = departments.len(),
            "employee registered for clearance"
        );

        for department in &departments {
            reconcile(self.repository.as_ref(), &employee, department)?;
        }
        self.recompute_status(employee.id)?;
        self.employee(employee.id)
    }

    pub fn list_employees(
        &self,
        department: Option<DepartmentId>,
    ) -> Result<Vec<Employee>, ClearanceError> {
        Ok(self.repository.employees(department)?)
    }

    pub fn get_employee(&self, id: EmployeeId) -> Result<Employee, ClearanceError> {
        self.employee(id)
    }

    /// Replace the assigned departments.
    ///
    /// Newly assigned departments are provisioned. Rows belonging to departments
    /// that were dropped stay in place.
    pub fn update_assignments(
        &self,
        identity: &Identity,
        employee_id: EmployeeId,
        departments: &[DepartmentId],
    ) -> Result<Employee, ClearanceError> {
        require_hr(identity, "change department assignments")?;
        let mut employee = self.employee(employee_id)?;
        let resolved = self.assignable_departments(departments)?;

        employee.assigned_departments = resolved
            .iter()
            .map(|department| department.id)
            .collect();
        self.repository.update_employee(employee.clone())?;
        info!(
            employee = %employee.id,
            departments = resolved.len(),
            "department assignments updated"
        );

        for department in &resolved {
            reconcile(self.repository.as_ref(), &employee, department)?;
        }
        self.recompute_status(employee.id)?;
        self.employee(employee.id)
    }

    pub fn delete_employee(
        &self,
        identity: &Identity,
        id: EmployeeId,
    ) -> Result<(), ClearanceError> {
        require_hr(identity, "delete employees")?;
        self.repository.delete_employee(id)?;
        info!(employee = %id, "employee deleted");
        Ok(())
    }

    pub fn list_responses(
        &self,
        identity: &Identity,
        filter: PairFilter,
    ) -> Result<Vec<Response>, ClearanceError> {
        let filter = scope_filter(identity, filter)?;
        Ok(self.repository.responses(filter)?)
    }

    /// Record a checklist answer and return the statuses it changed.
    ///
    /// The department status counts applicable questions only, as the
    /// breakdown does. The employee status is the stored count formula.
    pub fn update_response(
        &self,
        identity: &Identity,
        response_id: ResponseId,
        is_checked: bool,
    ) -> Result<ResponseUpdate, ClearanceError> {
        let mut response = self
            .repository
            .fetch_response(response_id)?
            .ok_or_else(|| ClearanceError::not_found("response", response_id))?;

        if identity.department() != Some(response.department_id) {
            return Err(forbidden(
                identity,
                "only the owning department can answer its checklist",
            ));
        }

        response.is_checked = is_checked;
        self.repository.update_response(response.clone())?;

        let employee = self.employee(response.employee_id)?;
        let department = self.department(response.department_id)?;
        let catalog = self.repository.questions(Some(department.id))?;
        let applicable = applicable_question_ids(&employee, &department, &catalog);
        let pair = self
            .repository
            .responses(PairFilter::pair(employee.id, department.id))?;
        let department_status =
            department_status(pair.iter().filter(|row| applicable.contains(&row.question_id)));
        let employee_status = self.recompute_status(response.employee_id)?;

        Ok(ResponseUpdate {
            response,
            department_status,
            employee_status,
        })
    }

    /// Create or overwrite the calling department's comment for an employee.
    pub fn upsert_comment(
        &self,
        identity: &Identity,
        request: CommentUpsert,
    ) -> Result<Comment, ClearanceError> {
        let (Some(employee_id), Some(department_id)) = (request.employee, request.department)
        else {
            return Err(ClearanceError::InvalidInput(
                "employee and department ids are required".to_string(),
            ));
        };

        let Some(own) = identity.department() else {
            return Err(forbidden(identity, "only department users can write comments"));
        };
        if own != department_id {
            return Err(forbidden(
                identity,
                "a department can only comment for itself",
            ));
        }

        let employee = self.employee(employee_id)?;
        if !employee.is_assigned(department_id) {
            return Err(ClearanceError::InvalidInput(
                "department is not assigned to this employee".to_string(),
            ));
        }

        let comment = self.repository.upsert_comment(
            employee_id,
            department_id,
            request.comment_text,
            request.department_head_id,
        )?;
        info!(
            comment = %comment.id,
            employee = %employee_id,
            department = %department_id,
            "department comment saved"
        );
        Ok(comment)
    }

    pub fn update_comment(
        &self,
        identity: &Identity,
        comment_id: CommentId,
        edit: CommentEdit,
    ) -> Result<Comment, ClearanceError> {
        let mut comment = self
            .repository
            .fetch_comment(comment_id)?
            .ok_or_else(|| ClearanceError::not_found("comment", comment_id))?;

        if identity.department() != Some(comment.department_id) {
            return Err(forbidden(
                identity,
                "a department can only update its own comments",
            ));
        }

        comment.text = edit.comment_text;
        if let Some(head) = edit.department_head_id {
            comment.department_head_id = Some(head);
        }
        self.repository.update_comment(comment)?;

        self.repository
            .fetch_comment(comment_id)?
            .ok_or_else(|| ClearanceError::not_found("comment", comment_id))
    }

    pub fn list_comments(
        &self,
        identity: &Identity,
        filter: PairFilter,
    ) -> Result<Vec<Comment>, ClearanceError> {
        let filter = scope_filter(identity, filter)?;
        Ok(self.repository.comments(filter)?)
    }

    /// Per-department breakdown with the view-level overall status.
    ///
    /// Only responses for currently applicable questions are shown. A
    /// department caller sees its own entry alone and must be assigned.
    pub fn get_responses_for_employee(
        &self,
        identity: &Identity,
        employee_id: EmployeeId,
    ) -> Result<EmployeeClearanceView, ClearanceError> {
        let employee = self.employee(employee_id)?;
        if let Some(own) = identity.department() {
            if !employee.is_assigned(own) {
                return Err(forbidden(
                    identity,
                    "a department can only read employees assigned to it",
                ));
            }
        }
        let responses = self.repository.responses(PairFilter::employee(employee.id))?;
        let comments = self.repository.comments(PairFilter::employee(employee.id))?;

        let mut departments = Vec::with_capacity(employee.assigned_departments.len());
        for department_id in &employee.assigned_departments {
            let department = self.department(*department_id)?;
            let catalog = self.repository.questions(Some(department.id))?;
            let answered: HashMap<QuestionId, &Response> = responses
                .iter()
                .filter(|response| response.department_id == department.id)
                .map(|response| (response.question_id, response))
                .collect();

            let rows: Vec<(Question, &Response)> =
                applicable_questions(&employee, &department, &catalog)
                    .into_iter()
                    .filter_map(|question| {
                        answered
                            .get(&question.id)
                            .map(|response| (question, *response))
                    })
                    .collect();

            let status = department_status(rows.iter().map(|(_, response)| *response));
            let questions = rows
                .iter()
                .map(|(question, response)| QuestionStateView {
                    id: question.id,
                    text: question.text.clone(),
                    is_checked: response.is_checked,
                    is_concerned_question: question.concerned_only,
                })
                .collect();

            let comment = comments
                .iter()
                .find(|comment| comment.department_id == department.id);
            departments.push(DepartmentClearanceView {
                department_id: department.id,
                department: department.name,
                status,
                questions,
                comment: comment.map(|c| c.text.clone()).unwrap_or_default(),
                department_head_id: comment.and_then(|c| c.department_head_id.clone()),
            });
        }

        let statuses: Vec<ClearanceStatus> =
            departments.iter().map(|department| department.status).collect();
        if let Some(own) = identity.department() {
            departments.retain(|department| department.department_id == own);
        }

        Ok(EmployeeClearanceView {
            employee_id: employee.id,
            employee: employee.name,
            employee_department: employee.home_department,
            overall_status: overall_view_status(&statuses),
            departments,
        })
    }

    /// Count assigned employees whose applicable checklist is non-empty and fully checked.
    pub fn get_department_progress(
        &self,
        department_id: DepartmentId,
    ) -> Result<DepartmentProgress, ClearanceError> {
        let department = self.department(department_id)?;
        let catalog = self.repository.questions(Some(department.id))?;
        let employees = self.repository.employees(Some(department.id))?;

        let mut done = 0;
        for employee in &employees {
            let applicable = applicable_question_ids(employee, &department, &catalog);
            let responses = self
                .repository
                .responses(PairFilter::pair(employee.id, department.id))?;
            let relevant = responses
                .iter()
                .filter(|response| applicable.contains(&response.question_id));
            if is_cleared(relevant) {
                done += 1;
            }
        }

        Ok(DepartmentProgress::new(department.id, employees.len(), done))
    }

    pub fn get_summary(&self) -> Result<ClearanceSummary, ClearanceError> {
        let employees = self.repository.employees(None)?;
        Ok(ClearanceSummary::tally(
            employees.iter().map(|employee| employee.status),
        ))
    }

    /// Re-derive and store `Employee::status` from the response ledger.
    pub fn recompute_status(
        &self,
        employee_id: EmployeeId,
    ) -> Result<ClearanceStatus, ClearanceError> {
        let employee = self.employee(employee_id)?;
        let responses = self.repository.responses(PairFilter::employee(employee.id))?;
        let status = derive_employee_status(&employee, &responses);

        if status != employee.status {
            self.repository.set_employee_status(employee.id, status)?;
            info!(
                employee = %employee.id,
                from = %employee.status,
                to = %status,
                "clearance status changed"
            );
        }
        Ok(status)
    }

    fn assignable_departments(
        &self,
        ids: &[DepartmentId],
    ) -> Result<Vec<Department>, ClearanceError> {
        let unique: BTreeSet<DepartmentId> = ids.iter().copied().collect();
        let mut departments = Vec::with_capacity(unique.len());
        for id in unique {
            let department = self.department(id)?;
            if !department.is_assignable {
                return Err(ClearanceError::InvalidInput(format!(
                    "department '{}' does not take part in clearance",
                    department.name
                )));
            }
            departments.push(department);
        }
        Ok(departments)
    }

    fn department(&self, id: DepartmentId) -> Result<Department, ClearanceError> {
        self.repository
            .fetch_department(id)?
            .ok_or_else(|| ClearanceError::not_found("department", id))
    }

    fn employee(&self, id: EmployeeId) -> Result<Employee, ClearanceError> {
        self.repository
            .fetch_employee(id)?
            .ok_or_else(|| ClearanceError::not_found("employee", id))
    }
}

fn required(value: &str, field: &str) -> Result<String, ClearanceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClearanceError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn require_hr(identity: &Identity, action: &str) -> Result<(), ClearanceError> {
    if identity.is_hr() {
        Ok(())
    } else {
        Err(forbidden(identity, &format!("only HR can {action}")))
    }
}

fn forbidden(identity: &Identity, message: &str) -> ClearanceError {
    warn!(caller = %identity.label(), reason = message, "request rejected");
    ClearanceError::Forbidden(message.to_string())
}

/// Narrow a department caller's query to its own department.
fn scope_filter(identity: &Identity, filter: PairFilter) -> Result<PairFilter, ClearanceError> {
    match identity {
        Identity::Hr => Ok(filter),
        Identity::Department(own) => match filter.department {
            Some(requested) if requested != *own => Err(forbidden(
                identity,
                "a department can only read its own records",
            )),
            _ => Ok(PairFilter {
                department: Some(*own),
                ..filter
            }),
        },
    }
}

/// Error raised by the clearance service.
#[derive(Debug, thiserror::Error)]
pub enum ClearanceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl ClearanceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<RepositoryError> for ClearanceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repository(other),
        }
    }
}
