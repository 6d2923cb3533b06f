use std::sync::Arc;

use axum::response::Response as HttpResponse;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::clearance::domain::{
    ClearanceStatus, Comment, CommentId, Department, DepartmentId, Employee, EmployeeId,
    Identity, NewDepartment, NewEmployee, NewQuestion, Question, QuestionId, Response,
    ResponseId, SeparationType,
};
use crate::workflows::clearance::repository::{
    ClearanceRepository, PairFilter, ProvisionOutcome, RepositoryError,
};
use crate::workflows::clearance::{ClearancePolicy, ClearanceService, InMemoryClearanceRepository};

pub(super) const HR: Identity = Identity::Hr;

pub(super) fn build_service() -> (
    ClearanceService<InMemoryClearanceRepository>,
    Arc<InMemoryClearanceRepository>,
) {
    build_service_with(ClearancePolicy::default())
}

pub(super) fn build_service_with(
    policy: ClearancePolicy,
) -> (
    ClearanceService<InMemoryClearanceRepository>,
    Arc<InMemoryClearanceRepository>,
) {
    let repository = Arc::new(InMemoryClearanceRepository::default());
    let service = ClearanceService::new(repository.clone(), policy);
    (service, repository)
}

pub(super) fn department_draft(name: &str) -> NewDepartment {
    NewDepartment {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        is_assignable: true,
    }
}

pub(super) fn employee_draft(
    code: &str,
    home_department: Option<&str>,
    assigned: Vec<DepartmentId>,
) -> NewEmployee {
    NewEmployee {
        name: format!("Employee {code}"),
        employee_code: code.to_string(),
        home_department: home_department.map(str::to_string),
        designation: "Analyst".to_string(),
        last_working_date: NaiveDate::from_ymd_opt(2025, 11, 28).expect("valid date"),
        separation_type: SeparationType::Resignation,
        assigned_departments: assigned,
    }
}

pub(super) fn add_question(
    service: &ClearanceService<InMemoryClearanceRepository>,
    department: DepartmentId,
    text: &str,
    concerned_only: bool,
) -> Question {
    service
        .create_question(
            &HR,
            NewQuestion {
                department_id: department,
                text: text.to_string(),
                concerned_only,
            },
        )
        .expect("question created")
}

/// Sales with two general questions, IT with one general and one concerned
/// question, and an IT employee assigned to both.
pub(super) struct SalesAndIt {
    pub(super) sales: Department,
    pub(super) it: Department,
    pub(super) it_concerned: Question,
    pub(super) employee: Employee,
}

pub(super) fn sales_and_it(service: &ClearanceService<InMemoryClearanceRepository>) -> SalesAndIt {
    let sales = service
        .create_department(&HR, department_draft("Sales"))
        .expect("sales created");
    let it = service
        .create_department(&HR, department_draft("IT"))
        .expect("it created");

    add_question(service, sales.id, "Return sample kit", false);
    add_question(service, sales.id, "Hand over client list", false);
    add_question(service, it.id, "Return laptop", false);
    let it_concerned = add_question(service, it.id, "Revoke production access", true);

    let employee = service
        .create_employee(&HR, employee_draft("E-100", Some("IT"), vec![sales.id, it.id]))
        .expect("employee created");

    SalesAndIt {
        sales,
        it,
        it_concerned,
        employee,
    }
}

/// Check every response of the pair as the owning department.
pub(super) fn check_all(
    service: &ClearanceService<InMemoryClearanceRepository>,
    employee: EmployeeId,
    department: DepartmentId,
) -> ClearanceStatus {
    let identity = Identity::Department(department);
    let responses = service
        .list_responses(&identity, PairFilter::pair(employee, department))
        .expect("responses listed");
    let mut status = ClearanceStatus::Pending;
    for response in responses {
        status = service
            .update_response(&identity, response.id, true)
            .expect("response updated")
            .employee_status;
    }
    status
}

pub(super) fn department(id: u64, name: &str) -> Department {
    Department {
        id: DepartmentId(id),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        secret: None,
        is_assignable: true,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
    }
}

pub(super) fn question(id: u64, department: u64, concerned_only: bool) -> Question {
    Question {
        id: QuestionId(id),
        department_id: DepartmentId(department),
        text: format!("Question {id}"),
        concerned_only,
    }
}

pub(super) fn employee(id: u64, home_department: Option<&str>, assigned: &[u64]) -> Employee {
    Employee {
        id: EmployeeId(id),
        name: format!("Employee {id}"),
        employee_code: format!("E-{id}"),
        home_department: home_department.map(str::to_string),
        designation: "Analyst".to_string(),
        last_working_date: NaiveDate::from_ymd_opt(2025, 11, 28).expect("valid date"),
        separation_type: SeparationType::Resignation,
        assigned_departments: assigned.iter().copied().map(DepartmentId).collect(),
        status: ClearanceStatus::Pending,
        progress: 0,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
    }
}

pub(super) fn response(id: u64, employee: u64, department: u64, checked: bool) -> Response {
    Response {
        id: ResponseId(id),
        employee_id: EmployeeId(employee),
        department_id: DepartmentId(department),
        question_id: QuestionId(id),
        is_checked: checked,
    }
}

pub(super) async fn read_json_body(response: HttpResponse) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl ClearanceRepository for UnavailableRepository {
    fn insert_department(&self, _draft: NewDepartment) -> Result<Department, RepositoryError> {
        offline()
    }

    fn update_department(&self, _department: Department) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_department(&self, _id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        offline()
    }

    fn find_department_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<Department>, RepositoryError> {
        offline()
    }

    fn departments(&self) -> Result<Vec<Department>, RepositoryError> {
        offline()
    }

    fn delete_department(&self, _id: DepartmentId) -> Result<(), RepositoryError> {
        offline()
    }

    fn insert_question(&self, _draft: NewQuestion) -> Result<Question, RepositoryError> {
        offline()
    }

    fn fetch_question(&self, _id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        offline()
    }

    fn questions(
        &self,
        _department: Option<DepartmentId>,
    ) -> Result<Vec<Question>, RepositoryError> {
        offline()
    }

    fn insert_employee(&self, _draft: NewEmployee) -> Result<Employee, RepositoryError> {
        offline()
    }

    fn update_employee(&self, _employee: Employee) -> Result<(), RepositoryError> {
        offline()
    }

    fn set_employee_status(
        &self,
        _id: EmployeeId,
        _status: ClearanceStatus,
    ) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_employee(&self, _id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        offline()
    }

    fn employees(
        &self,
        _department: Option<DepartmentId>,
    ) -> Result<Vec<Employee>, RepositoryError> {
        offline()
    }

    fn delete_employee(&self, _id: EmployeeId) -> Result<(), RepositoryError> {
        offline()
    }

    fn provision(
        &self,
        _employee: EmployeeId,
        _department: DepartmentId,
        _questions: &[QuestionId],
    ) -> Result<ProvisionOutcome, RepositoryError> {
        offline()
    }

    fn fetch_response(&self, _id: ResponseId) -> Result<Option<Response>, RepositoryError> {
        offline()
    }

    fn update_response(&self, _response: Response) -> Result<(), RepositoryError> {
        offline()
    }

    fn responses(&self, _filter: PairFilter) -> Result<Vec<Response>, RepositoryError> {
        offline()
    }

    fn fetch_comment(&self, _id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        offline()
    }

    fn upsert_comment(
        &self,
        _employee: EmployeeId,
        _department: DepartmentId,
        _text: String,
        _department_head_id: Option<String>,
    ) -> Result<Comment, RepositoryError> {
        offline()
    }

    fn update_comment(&self, _comment: Comment) -> Result<(), RepositoryError> {
        offline()
    }

    fn comments(&self, _filter: PairFilter) -> Result<Vec<Comment>, RepositoryError> {
        offline()
    }
}
