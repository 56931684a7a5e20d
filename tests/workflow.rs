//! Attendance workflow integration tests.

mod common;

use common::TestApp;
use diesel::prelude::*;
use serde_json::json;
use serial_test::serial;
use steward::rbac::Role;
use steward::schema::{attendance_requests, work_items};
use steward::workflow::WorkflowService;
use steward::workitems::BackingKind;
use uuid::Uuid;

async fn submit_request(app: &TestApp, token: &str) -> Uuid {
    let response = app
        .post(
            "/attendance",
            token,
            json!({"request_type": "correction", "requested_date": "2026-08-05"}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    Uuid::parse_str(body["request"]["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
#[serial]
async fn submission_starts_instance_in_pending_manager() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Provider);
    let (manager, _) = app.seed_member(Role::Manager);
    app.grant_role(manager.id, company, Role::Manager);
    app.set_manager(user.id, manager.id);

    let request_id = submit_request(&app, &user.token).await;

    let mut conn = app.conn();
    let instance =
        WorkflowService::get_instance(&mut conn, company, BackingKind::AttendanceRequest, request_id)
            .unwrap()
            .expect("Instance should exist");

    assert_eq!(instance.current_state, "pending_manager");
    assert_eq!(instance.assigned_to, Some(manager.id));

    // The inbox mirror carries the same assignee.
    let item_assignee: Option<Uuid> = work_items::table
        .filter(work_items::company_id.eq(company))
        .filter(work_items::entity_id.eq(request_id))
        .select(work_items::assignee_id)
        .first(&mut conn)
        .unwrap();
    assert_eq!(item_assignee, Some(manager.id));
}

#[tokio::test]
#[serial]
async fn starting_twice_is_a_no_op() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Provider);

    let request_id = submit_request(&app, &user.token).await;

    let mut conn = app.conn();
    let first =
        WorkflowService::get_instance(&mut conn, company, BackingKind::AttendanceRequest, request_id)
            .unwrap()
            .expect("Instance should exist");

    let second =
        WorkflowService::start_attendance_request(&mut conn, company, request_id).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.current_state, "pending_manager");

    let count: i64 = steward::schema::workflow_instances::table
        .filter(steward::schema::workflow_instances::entity_id.eq(request_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[serial]
async fn missing_instance_reads_as_none() {
    let app = require_test_db!();
    let (_user, company) = app.seed_member(Role::Provider);

    let mut conn = app.conn();
    let instance = WorkflowService::get_instance(
        &mut conn,
        company,
        BackingKind::AttendanceRequest,
        Uuid::new_v4(),
    )
    .unwrap();
    assert!(instance.is_none());
}

#[tokio::test]
#[serial]
async fn assignment_falls_back_to_admin_without_manager() {
    let app = require_test_db!();
    let (admin, company) = app.seed_member(Role::Admin);
    let requester = app.seed_user();
    app.grant_role(requester.id, company, Role::Provider);
    app.set_active_company(requester.id, company);

    let request_id = submit_request(&app, &requester.token).await;

    let mut conn = app.conn();
    let instance =
        WorkflowService::get_instance(&mut conn, company, BackingKind::AttendanceRequest, request_id)
            .unwrap()
            .expect("Instance should exist");
    assert_eq!(instance.assigned_to, Some(admin.id));
}

#[tokio::test]
#[serial]
async fn approval_advances_entity_instance_and_mirror() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Provider);
    let manager = app.seed_user();
    app.grant_role(manager.id, company, Role::Manager);
    app.set_active_company(manager.id, company);

    let request_id = submit_request(&app, &user.token).await;

    let response = app
        .post(
            &format!("/attendance/{}/approve", request_id),
            &manager.token,
            json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["request"]["status"], "approved");
    assert_eq!(
        body["request"]["reviewed_by"].as_str().unwrap(),
        manager.id.to_string()
    );

    let mut conn = app.conn();
    let instance =
        WorkflowService::get_instance(&mut conn, company, BackingKind::AttendanceRequest, request_id)
            .unwrap()
            .expect("Instance should exist");
    assert_eq!(instance.current_state, "approved");

    let item_status: String = work_items::table
        .filter(work_items::company_id.eq(company))
        .filter(work_items::entity_id.eq(request_id))
        .select(work_items::status)
        .first(&mut conn)
        .unwrap();
    assert_eq!(item_status, "done");
}

#[tokio::test]
#[serial]
async fn rejection_cancels_the_mirror() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Provider);
    let manager = app.seed_user();
    app.grant_role(manager.id, company, Role::Manager);
    app.set_active_company(manager.id, company);

    let request_id = submit_request(&app, &user.token).await;

    let response = app
        .post(
            &format!("/attendance/{}/reject", request_id),
            &manager.token,
            json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let mut conn = app.conn();
    let entity_status: String = attendance_requests::table
        .find(request_id)
        .select(attendance_requests::status)
        .first(&mut conn)
        .unwrap();
    assert_eq!(entity_status, "rejected");

    let item_status: String = work_items::table
        .filter(work_items::company_id.eq(company))
        .filter(work_items::entity_id.eq(request_id))
        .select(work_items::status)
        .first(&mut conn)
        .unwrap();
    assert_eq!(item_status, "cancelled");
}

#[tokio::test]
#[serial]
async fn reviewing_twice_returns_409() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Provider);
    let manager = app.seed_user();
    app.grant_role(manager.id, company, Role::Manager);
    app.set_active_company(manager.id, company);

    let request_id = submit_request(&app, &user.token).await;

    let response = app
        .post(
            &format!("/attendance/{}/approve", request_id),
            &manager.token,
            json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .post(
            &format!("/attendance/{}/reject", request_id),
            &manager.token,
            json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    // Terminal state untouched by the failed attempt.
    let mut conn = app.conn();
    let instance =
        WorkflowService::get_instance(&mut conn, company, BackingKind::AttendanceRequest, request_id)
            .unwrap()
            .expect("Instance should exist");
    assert_eq!(instance.current_state, "approved");
}

#[tokio::test]
#[serial]
async fn providers_cannot_review_requests() {
    let app = require_test_db!();
    let (user, _company) = app.seed_member(Role::Provider);

    let request_id = submit_request(&app, &user.token).await;

    let response = app
        .post(
            &format!("/attendance/{}/approve", request_id),
            &user.token,
            json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
#[serial]
async fn on_behalf_creation_requires_manager_permission() {
    let app = require_test_db!();
    let (client, company) = app.seed_member(Role::Client);
    let colleague = app.seed_user();
    app.grant_role(colleague.id, company, Role::Client);

    let response = app
        .post(
            "/attendance",
            &client.token,
            json!({
                "request_type": "leave",
                "requested_date": "2026-08-12",
                "profile_id": colleague.id,
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let manager = app.seed_user();
    app.grant_role(manager.id, company, Role::Manager);
    app.set_active_company(manager.id, company);

    let response = app
        .post(
            "/attendance",
            &manager.token,
            json!({
                "request_type": "leave",
                "requested_date": "2026-08-12",
                "profile_id": colleague.id,
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["request"]["profile_id"].as_str().unwrap(),
        colleague.id.to_string()
    );
}
