use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    ClearanceStatus, Comment, CommentId, Department, DepartmentId, Employee, EmployeeId,
    NewDepartment, NewEmployee, NewQuestion, Question, QuestionId, Response, ResponseId,
};
use super::repository::{ClearanceRepository, PairFilter, ProvisionOutcome, RepositoryError};

/// Process-local store; one lock covers every table so multi-row writes are atomic.
#[derive(Default, Clone)]
pub struct InMemoryClearanceRepository {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    sequences: Sequences,
    departments: BTreeMap<DepartmentId, Department>,
    questions: BTreeMap<QuestionId, Question>,
    employees: BTreeMap<EmployeeId, Employee>,
    responses: BTreeMap<ResponseId, Response>,
    response_index: HashMap<(EmployeeId, DepartmentId, QuestionId), ResponseId>,
    comments: BTreeMap<CommentId, Comment>,
    comment_index: HashMap<(EmployeeId, DepartmentId), CommentId>,
}

#[derive(Default)]
struct Sequences {
    department: u64,
    question: u64,
    employee: u64,
    response: u64,
    comment: u64,
}

fn bump(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn ensure_department_unique(
        &self,
        name: &str,
        email: &str,
        except: Option<DepartmentId>,
    ) -> Result<(), RepositoryError> {
        for department in self.departments.values() {
            if Some(department.id) == except {
                continue;
            }
            if department.name == name {
                return Err(RepositoryError::Conflict(format!(
                    "department name '{name}' already exists"
                )));
            }
            if department.email == email {
                return Err(RepositoryError::Conflict(format!(
                    "department email '{email}' already exists"
                )));
            }
        }
        Ok(())
    }

    fn ensure_employee_code_unique(
        &self,
        code: &str,
        except: Option<EmployeeId>,
    ) -> Result<(), RepositoryError> {
        let taken = self
            .employees
            .values()
            .any(|employee| Some(employee.id) != except && employee.employee_code == code);
        if taken {
            return Err(RepositoryError::Conflict(format!(
                "employee code '{code}' already exists"
            )));
        }
        Ok(())
    }

    fn ensure_departments_exist<'a, I>(&self, ids: I) -> Result<(), RepositoryError>
    where
        I: IntoIterator<Item = &'a DepartmentId>,
    {
        for id in ids {
            if !self.departments.contains_key(id) {
                return Err(RepositoryError::not_found("department", id));
            }
        }
        Ok(())
    }

    fn retain_pairs<F>(&mut self, mut keep: F)
    where
        F: FnMut(EmployeeId, DepartmentId) -> bool,
    {
        self.responses
            .retain(|_, response| keep(response.employee_id, response.department_id));
        self.response_index
            .retain(|(employee, department, _), _| keep(*employee, *department));
        self.comments
            .retain(|_, comment| keep(comment.employee_id, comment.department_id));
        self.comment_index
            .retain(|(employee, department), _| keep(*employee, *department));
    }
}

impl InMemoryClearanceRepository {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ClearanceRepository for InMemoryClearanceRepository {
    fn insert_department(&self, draft: NewDepartment) -> Result<Department, RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_department_unique(&draft.name, &draft.email, None)?;
        let department = Department {
            id: DepartmentId(bump(&mut tables.sequences.department)),
            name: draft.name,
            email: draft.email,
            secret: None,
            is_assignable: draft.is_assignable,
            created_at: Utc::now(),
        };
        tables.departments.insert(department.id, department.clone());
        Ok(department)
    }

    fn update_department(&self, department: Department) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.departments.contains_key(&department.id) {
            return Err(RepositoryError::not_found("department", department.id));
        }
        tables.ensure_department_unique(&department.name, &department.email, Some(department.id))?;
        tables.departments.insert(department.id, department);
        Ok(())
    }

    fn fetch_department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        Ok(self.lock()?.departments.get(&id).cloned())
    }

    fn find_department_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Department>, RepositoryError> {
        Ok(self
            .lock()?
            .departments
            .values()
            .find(|department| department.email == email)
            .cloned())
    }

    fn departments(&self) -> Result<Vec<Department>, RepositoryError> {
        Ok(self.lock()?.departments.values().cloned().collect())
    }

    fn delete_department(&self, id: DepartmentId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.departments.remove(&id).is_none() {
            return Err(RepositoryError::not_found("department", id));
        }
        tables
            .questions
            .retain(|_, question| question.department_id != id);
        tables.retain_pairs(|_, department| department != id);
        for employee in tables.employees.values_mut() {
            employee.assigned_departments.remove(&id);
        }
        Ok(())
    }

    fn insert_question(&self, draft: NewQuestion) -> Result<Question, RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_departments_exist([&draft.department_id])?;
        let question = Question {
            id: QuestionId(bump(&mut tables.sequences.question)),
            department_id: draft.department_id,
            text: draft.text,
            concerned_only: draft.concerned_only,
        };
        tables.questions.insert(question.id, question.clone());
        Ok(question)
    }

    fn fetch_question(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        Ok(self.lock()?.questions.get(&id).cloned())
    }

    fn questions(&self, department: Option<DepartmentId>) -> Result<Vec<Question>, RepositoryError> {
        Ok(self
            .lock()?
            .questions
            .values()
            .filter(|question| department.map_or(true, |id| question.department_id == id))
            .cloned()
            .collect())
    }

    fn insert_employee(&self, draft: NewEmployee) -> Result<Employee, RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_employee_code_unique(&draft.employee_code, None)?;
        tables.ensure_departments_exist(&draft.assigned_departments)?;
        let employee = Employee {
            id: EmployeeId(bump(&mut tables.sequences.employee)),
            name: draft.name,
            employee_code: draft.employee_code,
            home_department: draft.home_department,
            designation: draft.designation,
            last_working_date: draft.last_working_date,
            separation_type: draft.separation_type,
            assigned_departments: draft.assigned_departments.into_iter().collect::<BTreeSet<_>>(),
            status: ClearanceStatus::Pending,
            progress: 0,
            created_at: Utc::now(),
        };
        tables.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.employees.contains_key(&employee.id) {
            return Err(RepositoryError::not_found("employee", employee.id));
        }
        tables.ensure_employee_code_unique(&employee.employee_code, Some(employee.id))?;
        tables.ensure_departments_exist(&employee.assigned_departments)?;
        tables.employees.insert(employee.id, employee);
        Ok(())
    }

    fn set_employee_status(
        &self,
        id: EmployeeId,
        status: ClearanceStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.employees.get_mut(&id) {
            Some(employee) => {
                employee.status = status;
                Ok(())
            }
            None => Err(RepositoryError::not_found("employee", id)),
        }
    }

    fn fetch_employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.lock()?.employees.get(&id).cloned())
    }

    fn employees(&self, department: Option<DepartmentId>) -> Result<Vec<Employee>, RepositoryError> {
        let tables = self.lock()?;
        let mut employees: Vec<Employee> = tables
            .employees
            .values()
            .filter(|employee| department.map_or(true, |id| employee.is_assigned(id)))
            .cloned()
            .collect();
        employees.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(employees)
    }

    fn delete_employee(&self, id: EmployeeId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.employees.remove(&id).is_none() {
            return Err(RepositoryError::not_found("employee", id));
        }
        tables.retain_pairs(|employee, _| employee != id);
        Ok(())
    }

    fn provision(
        &self,
        employee: EmployeeId,
        department: DepartmentId,
        questions: &[QuestionId],
    ) -> Result<ProvisionOutcome, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.employees.contains_key(&employee) {
            return Err(RepositoryError::not_found("employee", employee));
        }
        tables.ensure_departments_exist([&department])?;
        if let Some(missing) = questions
            .iter()
            .find(|question| !tables.questions.contains_key(*question))
        {
            return Err(RepositoryError::not_found("question", missing));
        }

        let mut outcome = ProvisionOutcome::default();
        for question in questions {
            let key = (employee, department, *question);
            if tables.response_index.contains_key(&key) {
                continue;
            }
            let response = Response {
                id: ResponseId(bump(&mut tables.sequences.response)),
                employee_id: employee,
                department_id: department,
                question_id: *question,
                is_checked: false,
            };
            tables.response_index.insert(key, response.id);
            tables.responses.insert(response.id, response);
            outcome.responses_created += 1;
        }

        if !tables.comment_index.contains_key(&(employee, department)) {
            let now = Utc::now();
            let comment = Comment {
                id: CommentId(bump(&mut tables.sequences.comment)),
                employee_id: employee,
                department_id: department,
                text: String::new(),
                department_head_id: None,
                created_at: now,
                updated_at: now,
            };
            tables.comment_index.insert((employee, department), comment.id);
            tables.comments.insert(comment.id, comment);
            outcome.comment_created = true;
        }

        Ok(outcome)
    }

    fn fetch_response(&self, id: ResponseId) -> Result<Option<Response>, RepositoryError> {
        Ok(self.lock()?.responses.get(&id).cloned())
    }

    fn update_response(&self, response: Response) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.responses.get_mut(&response.id) {
            Some(stored) => {
                // The triple is fixed once provisioned.
                stored.is_checked = response.is_checked;
                Ok(())
            }
            None => Err(RepositoryError::not_found("response", response.id)),
        }
    }

    fn responses(&self, filter: PairFilter) -> Result<Vec<Response>, RepositoryError> {
        Ok(self
            .lock()?
            .responses
            .values()
            .filter(|response| filter.matches(response.employee_id, response.department_id))
            .cloned()
            .collect())
    }

    fn fetch_comment(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        Ok(self.lock()?.comments.get(&id).cloned())
    }

    fn upsert_comment(
        &self,
        employee: EmployeeId,
        department: DepartmentId,
        text: String,
        department_head_id: Option<String>,
    ) -> Result<Comment, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.employees.contains_key(&employee) {
            return Err(RepositoryError::not_found("employee", employee));
        }
        tables.ensure_departments_exist([&department])?;

        let now = Utc::now();
        if let Some(id) = tables.comment_index.get(&(employee, department)).copied() {
            if let Some(stored) = tables.comments.get_mut(&id) {
                stored.text = text;
                stored.department_head_id = department_head_id;
                stored.updated_at = now;
                return Ok(stored.clone());
            }
        }

        let comment = Comment {
            id: CommentId(bump(&mut tables.sequences.comment)),
            employee_id: employee,
            department_id: department,
            text,
            department_head_id,
            created_at: now,
            updated_at: now,
        };
        tables.comment_index.insert((employee, department), comment.id);
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    fn update_comment(&self, comment: Comment) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.comments.get_mut(&comment.id) {
            Some(stored) => {
                stored.text = comment.text;
                stored.department_head_id = comment.department_head_id;
                stored.updated_at = Utc::now();
                Ok(())
            }
            None => Err(RepositoryError::not_found("comment", comment.id)),
        }
    }

    fn comments(&self, filter: PairFilter) -> Result<Vec<Comment>, RepositoryError> {
        Ok(self
            .lock()?
            .comments
            .values()
            .filter(|comment| filter.matches(comment.employee_id, comment.department_id))
            .cloned()
            .collect())
    }
}
