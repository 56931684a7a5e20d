//! OpenAPI documentation configuration.

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::pagination::PaginationMeta;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Steward API",
        version = "1.0.0",
        description = "Company-scoped RBAC, work-item inbox and approval workflows.\n\n\
        ## Tenancy\n\
        Every request resolves against one company: the `x-company-id` header when\n\
        present, otherwise the profile's active company. Roles are scoped to that\n\
        company and gate each route.\n\n\
        ## Authentication\n\
        All non-health endpoints require a JWT bearer token minted by the upstream\n\
        identity provider: `Authorization: Bearer <token>`.\n\n\
        ## Inbox\n\
        Work items mirror tasks, contract actions and attendance requests. Approval\n\
        items only close through their approve/reject endpoints; everything else can\n\
        be completed generically.",
        contact(
            name = "Steward API Support"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Profile", description = "Profile and active-company management"),
        (name = "Companies", description = "Company (tenant) management"),
        (name = "Members", description = "Company membership and role grants"),
        (name = "Tasks", description = "Task management"),
        (name = "Attendance", description = "Attendance requests and approvals"),
        (name = "Contracts", description = "Contract actions"),
        (name = "Inbox", description = "Cross-entity work-item inbox")
    ),
    paths(
        crate::handlers::health::health_check_simple,
        crate::handlers::health::health_check,
        crate::handlers::health::ready_check,
        crate::handlers::health::live_check,

        crate::handlers::profile::ensure_profile,
        crate::handlers::profile::get_profile,
        crate::handlers::profile::set_active_company,

        crate::handlers::companies::create_company,
        crate::handlers::companies::list_my_companies,

        crate::handlers::members::grant_role,
        crate::handlers::members::list_members,
        crate::handlers::members::revoke_membership,

        crate::handlers::tasks::create_task,
        crate::handlers::tasks::list_tasks,

        crate::handlers::attendance::create_attendance_request,
        crate::handlers::attendance::approve_attendance_request,
        crate::handlers::attendance::reject_attendance_request,

        crate::handlers::contract_actions::create_contract_action,

        crate::handlers::inbox::list_inbox,
        crate::handlers::inbox::complete_work_item,
    ),
    components(
        schemas(
            ApiError,
            PaginationMeta,

            crate::models::Profile,
            crate::handlers::profile::EnsureProfileRequest,
            crate::handlers::profile::SetActiveCompanyRequest,
            crate::handlers::profile::ProfileResponse,

            crate::models::Company,
            crate::handlers::companies::CreateCompanyRequest,
            crate::handlers::companies::CompanyResponse,
            crate::handlers::companies::CompanyWithRole,
            crate::handlers::companies::CompaniesListResponse,

            crate::handlers::members::GrantRoleRequest,
            crate::handlers::members::MemberResponse,
            crate::handlers::members::MembersListResponse,

            crate::models::Task,
            crate::handlers::tasks::CreateTaskRequest,
            crate::handlers::tasks::TaskResponse,
            crate::handlers::tasks::TasksListResponse,

            crate::models::AttendanceRequest,
            crate::handlers::attendance::CreateAttendanceRequest,
            crate::handlers::attendance::AttendanceResponse,

            crate::models::ContractAction,
            crate::handlers::contract_actions::CreateContractActionRequest,
            crate::handlers::contract_actions::ContractActionResponse,

            crate::models::WorkItem,
            crate::models::WorkflowInstance,
            crate::handlers::inbox::InboxListResponse,
            crate::handlers::inbox::CompleteResponse,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "JWT access token minted by the identity provider.\n\
                            Include in requests as: `Authorization: Bearer <token>`",
                        ))
                        .build(),
                ),
            );
        }

        openapi.security = Some(vec![]);
    }
}

pub fn swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
