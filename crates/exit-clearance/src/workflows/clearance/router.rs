use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    CommentId, DepartmentId, EmployeeId, Identity, NewDepartment, NewEmployee, NewQuestion,
    ResponseId,
};
use super::repository::{ClearanceRepository, PairFilter, RepositoryError};
use super::service::{ClearanceError, ClearanceService, CommentEdit, CommentUpsert};

/// Caller role set by the authentication gateway: `hr` or `department`.
pub const ROLE_HEADER: &str = "x-clearance-role";
/// Numeric department id, required when the role is `department`.
pub const DEPARTMENT_HEADER: &str = "x-clearance-department";

/// Router builder exposing the clearance endpoints.
pub fn clearance_router<R>(service: Arc<ClearanceService<R>>) -> Router
where
    R: ClearanceRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/clearance/departments",
            get(list_departments_handler::<R>).post(create_department_handler::<R>),
        )
        .route(
            "/api/v1/clearance/auth/secret",
            post(set_secret_handler::<R>),
        )
        .route(
            "/api/v1/clearance/auth/login",
            post(login_handler::<R>),
        )
        .route(
            "/api/v1/clearance/departments/:department_id",
            get(get_department_handler::<R>).delete(delete_department_handler::<R>),
        )
        .route(
            "/api/v1/clearance/departments/:department_id/progress",
            get(department_progress_handler::<R>),
        )
        .route(
            "/api/v1/clearance/employees",
            get(list_employees_handler::<R>).post(create_employee_handler::<R>),
        )
        .route(
            "/api/v1/clearance/summary",
            get(summary_handler::<R>),
        )
        .route(
            "/api/v1/clearance/employees/:employee_id",
            get(get_employee_handler::<R>).delete(delete_employee_handler::<R>),
        )
        .route(
            "/api/v1/clearance/employees/:employee_id/departments",
            put(update_assignments_handler::<R>),
        )
        .route(
            "/api/v1/clearance/employees/:employee_id/responses",
            get(employee_breakdown_handler::<R>),
        )
        .route(
            "/api/v1/clearance/questions",
            get(list_questions_handler::<R>).post(create_question_handler::<R>),
        )
        .route(
            "/api/v1/clearance/questions/for-employee",
            get(questions_for_employee_handler::<R>),
        )
        .route(
            "/api/v1/clearance/responses",
            get(list_responses_handler::<R>),
        )
        .route(
            "/api/v1/clearance/responses/:response_id",
            patch(update_response_handler::<R>),
        )
        .route(
            "/api/v1/clearance/comments",
            get(list_comments_handler::<R>).post(upsert_comment_handler::<R>),
        )
        .route(
            "/api/v1/clearance/comments/:comment_id",
            patch(update_comment_handler::<R>),
        )
        .with_state(service)
}

impl ClearanceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClearanceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClearanceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ClearanceError::Conflict(_) => StatusCode::CONFLICT,
            ClearanceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ClearanceError::Repository(RepositoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ClearanceError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            ClearanceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

/// Resolve the caller identity from gateway headers.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, Response> {
    let role = headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase());

    match role.as_deref() {
        Some("hr") => Ok(Identity::Hr),
        Some("department") => headers
            .get(DEPARTMENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|id| Identity::Department(DepartmentId(id)))
            .ok_or_else(|| {
                unauthorized("department callers must send a numeric x-clearance-department header")
            }),
        Some(other) => Err(unauthorized(&format!("unknown caller role '{other}'"))),
        None => Err(unauthorized("missing x-clearance-role header")),
    }
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
}

fn error_response(error: ClearanceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (error.status_code(), Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ClearanceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

macro_rules! caller {
    ($headers:expr) => {
        match identity_from_headers(&$headers) {
            Ok(identity) => identity,
            Err(rejection) => return rejection,
        }
    };
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DepartmentQuery {
    #[serde(default)]
    department: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PairQuery {
    #[serde(default)]
    employee: Option<u64>,
    #[serde(default)]
    department: Option<u64>,
}

impl PairQuery {
    fn filter(&self) -> PairFilter {
        PairFilter {
            employee: self.employee.map(EmployeeId),
            department: self.department.map(DepartmentId),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SecretRequest {
    email: String,
    secret: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    role: &'static str,
    department: String,
    department_id: DepartmentId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentRequest {
    #[serde(default)]
    assigned_departments: Vec<DepartmentId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePatch {
    is_checked: bool,
}

pub(crate) async fn list_departments_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let _identity = caller!(headers);
    respond(StatusCode::OK, service.list_departments())
}

pub(crate) async fn create_department_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Json(draft): Json<NewDepartment>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(
        StatusCode::CREATED,
        service.create_department(&identity, draft),
    )
}

pub(crate) async fn get_department_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(department_id): Path<u64>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let _identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.get_department(DepartmentId(department_id)),
    )
}

pub(crate) async fn delete_department_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(department_id): Path<u64>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    match service.delete_department(&identity, DepartmentId(department_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn set_secret_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Json(request): Json<SecretRequest>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    match service.set_department_secret(&identity, &request.email, &request.secret) {
        Ok(()) => {
            let payload = json!({ "message": "secret set successfully" });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

/// Credential check only; token issuance belongs to the gateway.
pub(crate) async fn login_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    Json(request): Json<SecretRequest>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let result = service
        .authenticate_department(&request.email, &request.secret)
        .map(|(_, department)| LoginResponse {
            role: "department",
            department: department.name,
            department_id: department.id,
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn department_progress_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(department_id): Path<u64>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let _identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.get_department_progress(DepartmentId(department_id)),
    )
}

pub(crate) async fn list_employees_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Query(query): Query<DepartmentQuery>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let _identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.list_employees(query.department.map(DepartmentId)),
    )
}

pub(crate) async fn create_employee_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Json(draft): Json<NewEmployee>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(StatusCode::CREATED, service.create_employee(&identity, draft))
}

pub(crate) async fn summary_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let _identity = caller!(headers);
    respond(StatusCode::OK, service.get_summary())
}

pub(crate) async fn get_employee_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(employee_id): Path<u64>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let _identity = caller!(headers);
    respond(StatusCode::OK, service.get_employee(EmployeeId(employee_id)))
}

pub(crate) async fn delete_employee_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(employee_id): Path<u64>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    match service.delete_employee(&identity, EmployeeId(employee_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_assignments_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(employee_id): Path<u64>,
    Json(request): Json<AssignmentRequest>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.update_assignments(
            &identity,
            EmployeeId(employee_id),
            &request.assigned_departments,
        ),
    )
}

pub(crate) async fn employee_breakdown_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(employee_id): Path<u64>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.get_responses_for_employee(&identity, EmployeeId(employee_id)),
    )
}

pub(crate) async fn list_questions_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Query(query): Query<DepartmentQuery>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let _identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.list_questions(query.department.map(DepartmentId)),
    )
}

pub(crate) async fn create_question_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Json(draft): Json<NewQuestion>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(StatusCode::CREATED, service.create_question(&identity, draft))
}

pub(crate) async fn questions_for_employee_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Query(query): Query<PairQuery>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    let (Some(employee), Some(department)) = (query.employee, query.department) else {
        return error_response(ClearanceError::InvalidInput(
            "department and employee required".to_string(),
        ));
    };
    respond(
        StatusCode::OK,
        service.questions_for_employee(&identity, EmployeeId(employee), DepartmentId(department)),
    )
}

pub(crate) async fn list_responses_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Query(query): Query<PairQuery>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.list_responses(&identity, query.filter()),
    )
}

pub(crate) async fn update_response_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(response_id): Path<u64>,
    Json(patch): Json<ResponsePatch>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.update_response(&identity, ResponseId(response_id), patch.is_checked),
    )
}

pub(crate) async fn list_comments_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Query(query): Query<PairQuery>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.list_comments(&identity, query.filter()),
    )
}

pub(crate) async fn upsert_comment_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Json(request): Json<CommentUpsert>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(StatusCode::OK, service.upsert_comment(&identity, request))
}

pub(crate) async fn update_comment_handler<R>(
    State(service): State<Arc<ClearanceService<R>>>,
    headers: HeaderMap,
    Path(comment_id): Path<u64>,
    Json(edit): Json<CommentEdit>,
) -> Response
where
    R: ClearanceRepository + 'static,
{
    let identity = caller!(headers);
    respond(
        StatusCode::OK,
        service.update_comment(&identity, CommentId(comment_id), edit),
    )
}
