//! Inbox listing and completion integration tests.

mod common;

use common::TestApp;
use diesel::prelude::*;
use serde_json::json;
use serial_test::serial;
use steward::rbac::Role;
use steward::schema::{tasks, work_items};
use uuid::Uuid;

async fn create_task(
    app: &TestApp,
    token: &str,
    title: &str,
    priority: Option<i32>,
    due_at: Option<&str>,
    assignee_id: Option<Uuid>,
) -> Uuid {
    let response = app
        .post(
            "/tasks",
            token,
            json!({
                "title": title,
                "priority": priority,
                "due_at": due_at,
                "assignee_id": assignee_id,
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    Uuid::parse_str(body["task"]["id"].as_str().unwrap()).unwrap()
}

fn work_item_for(app: &TestApp, company_id: Uuid, entity_id: Uuid) -> (Uuid, String) {
    let mut conn = app.conn();
    work_items::table
        .filter(work_items::company_id.eq(company_id))
        .filter(work_items::entity_id.eq(entity_id))
        .select((work_items::id, work_items::status))
        .first(&mut conn)
        .expect("Work item should exist")
}

#[tokio::test]
#[serial]
async fn task_creation_projects_exactly_one_work_item() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Manager);

    let task_id = create_task(&app, &user.token, "Chase signature", None, None, None).await;

    let (item_id, status) = work_item_for(&app, company, task_id);
    assert_eq!(status, "open");

    // A second projection for the same entity updates in place.
    let mut conn = app.conn();
    let count: i64 = work_items::table
        .filter(work_items::company_id.eq(company))
        .filter(work_items::entity_id.eq(task_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(count, 1);
    let _ = item_id;
}

#[tokio::test]
#[serial]
async fn inbox_orders_by_priority_with_nulls_last() {
    let app = require_test_db!();
    let (user, _company) = app.seed_member(Role::Manager);

    create_task(&app, &user.token, "no priority", None, None, None).await;
    create_task(&app, &user.token, "low urgency", Some(5), None, None).await;
    create_task(&app, &user.token, "most urgent", Some(1), None, None).await;

    let response = app.get("/inbox", &user.token).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["most urgent", "low urgency", "no priority"]);
    assert_eq!(body["total"], 3);
    assert_eq!(body["total_estimate"], 3);
}

#[tokio::test]
#[serial]
async fn inbox_orders_by_sla_within_equal_priority() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Manager);

    let first = create_task(&app, &user.token, "later sla", Some(1), None, None).await;
    let second = create_task(&app, &user.token, "sooner sla", Some(1), None, None).await;

    let mut conn = app.conn();
    for (entity_id, sla) in [(first, "2026-09-01T00:00:00"), (second, "2026-08-20T00:00:00")] {
        diesel::update(
            work_items::table
                .filter(work_items::company_id.eq(company))
                .filter(work_items::entity_id.eq(entity_id)),
        )
        .set(work_items::sla_due_at.eq(sla.parse::<chrono::NaiveDateTime>().unwrap()))
        .execute(&mut conn)
        .unwrap();
    }
    drop(conn);

    let response = app.get("/inbox", &user.token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["sooner sla", "later sla"]);
}

#[tokio::test]
#[serial]
async fn overdue_filter_restricts_to_active_past_due_items() {
    let app = require_test_db!();
    let (user, _company) = app.seed_member(Role::Manager);

    create_task(
        &app,
        &user.token,
        "past due",
        None,
        Some("2020-01-01T00:00:00"),
        None,
    )
    .await;
    create_task(
        &app,
        &user.token,
        "future due",
        None,
        Some("2099-01-01T00:00:00"),
        None,
    )
    .await;
    let done_task = create_task(
        &app,
        &user.token,
        "past due but done",
        None,
        Some("2020-01-01T00:00:00"),
        None,
    )
    .await;

    // Complete the third so only active overdue items remain.
    let (done_item, _) = {
        let mut conn = app.conn();
        steward::schema::work_items::table
            .filter(work_items::entity_id.eq(done_task))
            .select((work_items::id, work_items::status))
            .first::<(Uuid, String)>(&mut conn)
            .unwrap()
    };
    let response = app
        .patch(&format!("/inbox/{}/complete", done_item), &user.token)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.get("/inbox?overdue=true", &user.token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let titles: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["past due"]);
}

#[tokio::test]
#[serial]
async fn assignee_filter_is_applied_after_the_base_query() {
    let app = require_test_db!();
    let (user, _company) = app.seed_member(Role::Manager);

    create_task(&app, &user.token, "mine", None, None, Some(user.id)).await;
    create_task(&app, &user.token, "nobody's", None, None, None).await;

    let response = app.get("/inbox?assignee=me", &user.token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "mine");
    assert_eq!(body["total"], 1);
    assert_eq!(body["total_estimate"], 2);

    let response = app.get("/inbox?assignee=unassigned", &user.token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "nobody's");
}

#[tokio::test]
#[serial]
async fn work_type_filter_separates_tasks_from_approvals() {
    let app = require_test_db!();
    let (user, _company) = app.seed_member(Role::Manager);

    create_task(&app, &user.token, "plain task", None, None, None).await;
    let response = app
        .post(
            "/attendance",
            &user.token,
            json!({"request_type": "leave", "requested_date": "2026-08-20"}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let response = app.get("/inbox?work_type=approval", &user.token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["work_type"], "approval");
    assert_eq!(items[0]["source"], "attendance");
}

#[tokio::test]
#[serial]
async fn invalid_filters_return_400() {
    let app = require_test_db!();
    let (user, _company) = app.seed_member(Role::Manager);

    let response = app.get("/inbox?status=archived", &user.token).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_STATUS");

    let response = app.get("/inbox?assignee=everyone", &user.token).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_ASSIGNEE_FILTER");
}

#[tokio::test]
#[serial]
async fn completing_a_task_updates_entity_then_mirror() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Manager);

    let task_id = create_task(&app, &user.token, "close me", None, None, None).await;
    let (item_id, _) = work_item_for(&app, company, task_id);

    let response = app
        .patch(&format!("/inbox/{}/complete", item_id), &user.token)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let mut conn = app.conn();
    let task_status: String = tasks::table
        .find(task_id)
        .select(tasks::status)
        .first(&mut conn)
        .unwrap();
    assert_eq!(task_status, "done");

    let (_, item_status) = work_item_for(&app, company, task_id);
    assert_eq!(item_status, "done");
}

#[tokio::test]
#[serial]
async fn completing_twice_returns_409() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Manager);

    let task_id = create_task(&app, &user.token, "only once", None, None, None).await;
    let (item_id, _) = work_item_for(&app, company, task_id);

    let response = app
        .patch(&format!("/inbox/{}/complete", item_id), &user.token)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .patch(&format!("/inbox/{}/complete", item_id), &user.token)
        .await;
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_COMPLETED");
}

#[tokio::test]
#[serial]
async fn completing_an_approval_returns_409_and_mutates_nothing() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Manager);

    let response = app
        .post(
            "/attendance",
            &user.token,
            json!({"request_type": "correction", "requested_date": "2026-08-10"}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let request_id = Uuid::parse_str(body["request"]["id"].as_str().unwrap()).unwrap();

    let (item_id, before_status) = work_item_for(&app, company, request_id);

    let response = app
        .patch(&format!("/inbox/{}/complete", item_id), &user.token)
        .await;
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "APPROVAL_NOT_COMPLETABLE");

    let (_, after_status) = work_item_for(&app, company, request_id);
    assert_eq!(before_status, after_status);
}

#[tokio::test]
#[serial]
async fn completing_with_missing_backing_entity_returns_409() {
    let app = require_test_db!();
    let (user, company) = app.seed_member(Role::Manager);

    let task_id = create_task(&app, &user.token, "doomed", None, None, None).await;
    let (item_id, _) = work_item_for(&app, company, task_id);

    {
        let mut conn = app.conn();
        diesel::delete(tasks::table.find(task_id))
            .execute(&mut conn)
            .unwrap();
    }

    let response = app
        .patch(&format!("/inbox/{}/complete", item_id), &user.token)
        .await;
    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BACKING_ENTITY_MISSING");

    let (_, status) = work_item_for(&app, company, task_id);
    assert_eq!(status, "open");
}

#[tokio::test]
#[serial]
async fn completing_unknown_work_item_returns_404() {
    let app = require_test_db!();
    let (user, _company) = app.seed_member(Role::Manager);

    let response = app
        .patch(&format!("/inbox/{}/complete", Uuid::new_v4()), &user.token)
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[serial]
async fn work_items_are_company_scoped() {
    let app = require_test_db!();
    let (user_a, company_a) = app.seed_member(Role::Manager);
    let (user_b, _company_b) = app.seed_member(Role::Manager);

    let task_id = create_task(&app, &user_a.token, "company A only", None, None, None).await;
    let (item_id, _) = work_item_for(&app, company_a, task_id);

    let response = app.get("/inbox", &user_b.token).await;
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    let response = app
        .patch(&format!("/inbox/{}/complete", item_id), &user_b.token)
        .await;
    assert_eq!(response.status().as_u16(), 404);
}
