use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::profiles)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub active_company_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::profiles)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::companies)]
pub struct Company {
    pub id: Uuid,
    #[schema(example = "Falcon Logistics")]
    pub name: String,
    #[schema(example = "falcon-logistics")]
    pub slug: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::companies)]
pub struct NewCompany {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = crate::schema::user_roles)]
pub struct UserRole {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub company_id: Uuid,
    pub role: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::user_roles)]
pub struct NewUserRole {
    pub profile_id: Uuid,
    pub company_id: Uuid,
    pub role: String,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::work_items)]
pub struct WorkItem {
    pub id: Uuid,
    pub company_id: Uuid,
    #[schema(example = "attendance_request")]
    pub entity_type: String,
    pub entity_id: Uuid,
    #[schema(example = "approval")]
    pub work_type: String,
    #[schema(example = "attendance")]
    pub source: String,
    #[schema(example = "open")]
    pub status: String,
    pub title: String,
    pub due_at: Option<NaiveDateTime>,
    pub sla_due_at: Option<NaiveDateTime>,
    pub priority: Option<i32>,
    pub assignee_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::workflow_instances)]
pub struct WorkflowInstance {
    pub id: Uuid,
    pub company_id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    #[schema(example = "pending_manager")]
    pub current_state: String,
    pub assigned_to: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::tasks)]
pub struct Task {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "open")]
    pub status: String,
    pub due_at: Option<NaiveDateTime>,
    pub priority: Option<i32>,
    pub assignee_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::tasks)]
pub struct NewTask {
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<NaiveDateTime>,
    pub priority: Option<i32>,
    pub assignee_id: Option<Uuid>,
    pub created_by: Uuid,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::attendance_requests)]
pub struct AttendanceRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub profile_id: Uuid,
    #[schema(example = "correction")]
    pub request_type: String,
    pub requested_date: NaiveDate,
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::attendance_requests)]
pub struct NewAttendanceRequest {
    pub company_id: Uuid,
    pub profile_id: Uuid,
    pub request_type: String,
    pub requested_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::contract_actions)]
pub struct ContractAction {
    pub id: Uuid,
    pub company_id: Uuid,
    #[schema(example = "CT-2025-0042")]
    pub contract_ref: String,
    #[schema(example = "renewal")]
    pub action_type: String,
    #[schema(example = "open")]
    pub status: String,
    pub due_at: Option<NaiveDateTime>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::contract_actions)]
pub struct NewContractAction {
    pub company_id: Uuid,
    pub contract_ref: String,
    pub action_type: String,
    pub due_at: Option<NaiveDateTime>,
    pub created_by: Uuid,
}

#[derive(Debug, Queryable, Selectable, Serialize, Clone)]
#[diesel(table_name = crate::schema::audit_log)]
pub struct AuditEntry {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub details: serde_json::Value,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::audit_log)]
pub struct NewAuditEntry {
    pub company_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub details: serde_json::Value,
}
