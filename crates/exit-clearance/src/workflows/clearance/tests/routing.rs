use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::clearance::domain::{DepartmentId, Identity};
use crate::workflows::clearance::repository::PairFilter;
use crate::workflows::clearance::router::{identity_from_headers, DEPARTMENT_HEADER, ROLE_HEADER};
use crate::workflows::clearance::{
    clearance_router, ClearancePolicy, ClearanceService, CommentUpsert,
};

enum Caller {
    Anonymous,
    Hr,
    Department(DepartmentId),
}

fn request(method: Method, uri: &str, caller: Caller, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    match caller {
        Caller::Anonymous => {}
        Caller::Hr => builder = builder.header(ROLE_HEADER, "hr"),
        Caller::Department(id) => {
            builder = builder
                .header(ROLE_HEADER, "department")
                .header(DEPARTMENT_HEADER, id.0.to_string());
        }
    }
    match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[test]
fn identity_headers_resolve_typed_callers() {
    let mut headers = HeaderMap::new();
    assert!(identity_from_headers(&headers).is_err());

    headers.insert(ROLE_HEADER, HeaderValue::from_static("HR"));
    assert_eq!(identity_from_headers(&headers).ok(), Some(Identity::Hr));

    headers.insert(ROLE_HEADER, HeaderValue::from_static("department"));
    assert!(identity_from_headers(&headers).is_err());

    headers.insert(DEPARTMENT_HEADER, HeaderValue::from_static("4"));
    assert_eq!(
        identity_from_headers(&headers).ok(),
        Some(Identity::Department(DepartmentId(4)))
    );

    headers.insert(ROLE_HEADER, HeaderValue::from_static("auditor"));
    match identity_from_headers(&headers) {
        Err(rejection) => assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED),
        Ok(identity) => panic!("expected rejection, got {identity:?}"),
    }
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let (service, _) = build_service();
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/clearance/departments",
            Caller::Anonymous,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn hr_creates_departments_and_duplicates_conflict() {
    let (service, _) = build_service();
    let router = clearance_router(Arc::new(service));
    let payload = json!({
        "name": "Finance",
        "email": "finance@example.com",
        "is_assignable": true
    });

    let created = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/clearance/departments",
            Caller::Hr,
            Some(payload.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json_body(created).await;
    assert_eq!(body["name"], "Finance");
    assert!(body.get("secret").is_none());

    let duplicate = router
        .oneshot(request(
            Method::POST,
            "/api/v1/clearance/departments",
            Caller::Hr,
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn departments_cannot_create_departments() {
    let (service, _) = build_service();
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/clearance/departments",
            Caller::Department(DepartmentId(1)),
            Some(json!({ "name": "Finance", "email": "finance@example.com" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn breakdown_route_returns_per_department_entries() {
    let (service, _) = build_service();
    let fixture = sales_and_it(&service);
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/clearance/employees/{}/responses", fixture.employee.id),
            Caller::Hr,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["overall_status"], "pending");
    assert_eq!(body["employee_department"], "IT");
    assert_eq!(body["departments"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn breakdown_route_hides_other_departments_from_department_callers() {
    let (service, _) = build_service();
    let fixture = sales_and_it(&service);
    service
        .upsert_comment(
            &Identity::Department(fixture.sales.id),
            CommentUpsert {
                employee: Some(fixture.employee.id),
                department: Some(fixture.sales.id),
                comment_text: "Sales-only handover notes".to_string(),
                department_head_id: Some("H-1".to_string()),
            },
        )
        .expect("sales comment");
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/clearance/employees/{}/responses", fixture.employee.id),
            Caller::Department(fixture.it.id),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let departments = body["departments"].as_array().expect("departments");
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0]["department"], "IT");
    assert!(!body.to_string().contains("Sales-only handover notes"));
    assert!(!body.to_string().contains("H-1"));
}

#[tokio::test]
async fn response_patch_is_owner_only_and_reports_statuses() {
    let (service, _) = build_service();
    let fixture = sales_and_it(&service);
    let rows = service
        .list_responses(&HR, PairFilter::pair(fixture.employee.id, fixture.sales.id))
        .expect("rows");
    let router = clearance_router(Arc::new(service));
    let uri = format!("/api/v1/clearance/responses/{}", rows[0].id);

    let rejected = router
        .clone()
        .oneshot(request(
            Method::PATCH,
            &uri,
            Caller::Department(fixture.it.id),
            Some(json!({ "is_checked": true })),
        ))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::FORBIDDEN);

    let accepted = router
        .oneshot(request(
            Method::PATCH,
            &uri,
            Caller::Department(fixture.sales.id),
            Some(json!({ "is_checked": true })),
        ))
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    let body = read_json_body(accepted).await;
    assert_eq!(body["response"]["is_checked"], true);
    assert_eq!(body["department_status"], "inprogress");
    assert_eq!(body["employee_status"], "pending");
}

#[tokio::test]
async fn checklist_lookup_requires_both_ids() {
    let (service, _) = build_service();
    let fixture = sales_and_it(&service);
    let router = clearance_router(Arc::new(service));

    let incomplete = router
        .clone()
        .oneshot(request(
            Method::GET,
            &format!(
                "/api/v1/clearance/questions/for-employee?employee={}",
                fixture.employee.id
            ),
            Caller::Hr,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(incomplete.status(), StatusCode::BAD_REQUEST);

    let complete = router
        .oneshot(request(
            Method::GET,
            &format!(
                "/api/v1/clearance/questions/for-employee?employee={}&department={}",
                fixture.employee.id, fixture.it.id
            ),
            Caller::Department(fixture.it.id),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(complete.status(), StatusCode::OK);
    let body = read_json_body(complete).await;
    assert_eq!(body["questions"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["questions"][1]["is_concerned_question"], true);
}

#[tokio::test]
async fn unknown_employee_is_not_found() {
    let (service, _) = build_service();
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/clearance/employees/404",
            Caller::Hr,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_route_tallies_stored_statuses() {
    let (service, _) = build_service();
    sales_and_it(&service);
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/clearance/summary",
            Caller::Hr,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["pending"], 1);
}

#[tokio::test]
async fn comment_upsert_route_rejects_foreign_departments() {
    let (service, _) = build_service();
    let fixture = sales_and_it(&service);
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/clearance/comments",
            Caller::Department(fixture.it.id),
            Some(json!({
                "employee": fixture.employee.id,
                "department": fixture.sales.id,
                "comment_text": "All clear"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_checks_department_secret() {
    let (service, _) = build_service();
    let fixture = sales_and_it(&service);
    service
        .set_department_secret(&HR, "it@example.com", "s3cret")
        .expect("secret set");
    let router = clearance_router(Arc::new(service));

    let accepted = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/clearance/auth/login",
            Caller::Anonymous,
            Some(json!({ "email": "it@example.com", "secret": "s3cret" })),
        ))
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    let body = read_json_body(accepted).await;
    assert_eq!(body["department_id"], fixture.it.id.0);
    assert_eq!(body["role"], "department");

    let rejected = router
        .oneshot(request(
            Method::POST,
            "/api/v1/clearance/auth/login",
            Caller::Anonymous,
            Some(json!({ "email": "it@example.com", "secret": "guess" })),
        ))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_an_employee_returns_no_content() {
    let (service, _) = build_service();
    let fixture = sales_and_it(&service);
    let router = clearance_router(Arc::new(service));

    let response = router
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/clearance/employees/{}", fixture.employee.id),
            Caller::Hr,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn repository_outage_maps_to_service_unavailable() {
    let service = Arc::new(ClearanceService::new(
        Arc::new(UnavailableRepository),
        ClearancePolicy::default(),
    ));
    let mut headers = HeaderMap::new();
    headers.insert(ROLE_HEADER, HeaderValue::from_static("hr"));

    let response = crate::workflows::clearance::router::list_departments_handler::<
        UnavailableRepository,
    >(State(service), headers)
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
