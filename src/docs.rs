// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Users ---
        handlers::me::get_me,

        // --- Organizations ---
        handlers::orgs::create_org,
        handlers::orgs::list_my_orgs,
        handlers::orgs::request_org,
        handlers::orgs::list_members,
        handlers::orgs::change_role,
        handlers::orgs::disable_member,
        handlers::orgs::create_invite,
        handlers::orgs::list_invites,
        handlers::orgs::revoke_invite,
        handlers::orgs::accept_invite,

        // --- Admin ---
        handlers::admin::list_orgs,
        handlers::admin::toggle_org_status,
        handlers::admin::set_billing_override,
        handlers::admin::list_users,
        handlers::admin::list_requests,
        handlers::admin::review_request,

        // --- Vessels ---
        handlers::vessels::list_vessels,
        handlers::vessels::create_vessel,
        handlers::vessels::get_vessel,
        handlers::vessels::update_vessel,
        handlers::vessels::delete_vessel,
        handlers::vessels::list_comments,
        handlers::vessels::add_comment,

        // --- Inventory ---
        handlers::inventory::list_groups,
        handlers::inventory::create_group,
        handlers::inventory::reorder_groups,
        handlers::inventory::update_group,
        handlers::inventory::delete_group,
        handlers::inventory::list_requirements,
        handlers::inventory::create_requirement,
        handlers::inventory::reorder_requirements,
        handlers::inventory::update_requirement,
        handlers::inventory::delete_requirement,
        handlers::inventory::requirement_history,
        handlers::inventory::list_adjustments,
        handlers::inventory::adjust_stock,

        // --- Inventory checks ---
        handlers::checks::start_check,
        handlers::checks::list_checks,
        handlers::checks::get_check,
        handlers::checks::upsert_lines,
        handlers::checks::update_line,
        handlers::checks::submit_check,

        // --- Maintenance ---
        handlers::maintenance::list_tasks,
        handlers::maintenance::create_task,
        handlers::maintenance::reorder_tasks,
        handlers::maintenance::get_task,
        handlers::maintenance::update_task,
        handlers::maintenance::delete_task,
        handlers::maintenance::create_log,
        handlers::maintenance::list_logs,

        // --- Trips ---
        handlers::trips::list_trips,
        handlers::trips::log_trip,
        handlers::trips::update_trip,
        handlers::trips::delete_trip,
        handlers::trips::total_hours,

        // --- Billing ---
        handlers::billing::create_checkout_session,
        handlers::billing::update_vessel_packs,
        handlers::billing::create_portal_session,
        handlers::billing::billing_status,
        handlers::billing::stripe_webhook,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::MyMembership,
            models::auth::MeResponse,

            // --- Organizations ---
            models::organization::OrgRole,
            models::organization::MembershipStatus,
            models::organization::OrgRequestStatus,
            models::organization::Organization,
            models::organization::OrgMembership,
            models::organization::MemberView,
            models::organization::OrgInvite,
            models::organization::OrganizationRequest,
            models::organization::OrganizationRequestView,
            models::organization::AdminOrgSummary,

            // --- Vessels ---
            models::vessel::Vessel,
            models::vessel::VesselComment,
            models::vessel::CommentView,

            // --- Inventory ---
            models::inventory::InventoryGroup,
            models::inventory::InventoryRequirement,
            models::inventory::InventoryCheckStatus,
            models::inventory::CheckLineCondition,
            models::inventory::InventoryCheck,
            models::inventory::InventoryCheckLine,
            models::inventory::InventoryCheckDetail,
            models::inventory::RequirementHistoryEntry,
            models::inventory::InventoryAdjustment,

            // --- Maintenance ---
            models::maintenance::CadenceType,
            models::maintenance::MaintenanceTask,
            models::maintenance::MaintenanceTaskView,
            models::maintenance::MaintenanceLog,
            models::maintenance::MaintenanceLogView,
            models::maintenance::MaintenanceTaskDetail,

            // --- Trips ---
            models::trips::VesselTrip,
            models::trips::TripLogged,
            models::trips::TotalHours,

            // --- Billing ---
            models::billing::RedirectUrl,
            models::billing::PackUpdateResult,
            models::billing::BillingStatus,
            models::billing::WebhookAck,

            // --- Payloads ---
            handlers::orgs::CreateOrgPayload,
            handlers::orgs::OrgRequestPayload,
            handlers::orgs::ChangeRolePayload,
            handlers::orgs::CreateInvitePayload,
            handlers::orgs::AcceptInvitePayload,
            handlers::admin::BillingOverridePayload,
            handlers::admin::ReviewRequestPayload,
            handlers::vessels::CreateVesselPayload,
            handlers::vessels::UpdateVesselPayload,
            handlers::vessels::CreateCommentPayload,
            handlers::inventory::CreateGroupPayload,
            handlers::inventory::UpdateGroupPayload,
            handlers::inventory::ReorderGroupsPayload,
            handlers::inventory::CreateRequirementPayload,
            handlers::inventory::UpdateRequirementPayload,
            handlers::inventory::ReorderRequirementsPayload,
            handlers::inventory::AdjustStockPayload,
            handlers::checks::StartCheckPayload,
            handlers::checks::CheckLinePayload,
            handlers::checks::UpsertLinesPayload,
            handlers::checks::UpdateLinePayload,
            handlers::maintenance::CreateTaskPayload,
            handlers::maintenance::UpdateTaskPayload,
            handlers::maintenance::ReorderTasksPayload,
            handlers::maintenance::CreateLogPayload,
            handlers::trips::LogTripPayload,
            handlers::trips::UpdateTripPayload,
            handlers::billing::PackQuantityPayload,
        )
    ),
    tags(
        (name = "Users", description = "Usuário autenticado"),
        (name = "Organizations", description = "Organizações, membros e convites"),
        (name = "Admin", description = "Administração da plataforma (super admin)"),
        (name = "Vessels", description = "Embarcações e comentários"),
        (name = "Inventory", description = "Itens exigidos, grupos e ajustes de estoque"),
        (name = "Inventory checks", description = "Conferências de estoque"),
        (name = "Maintenance", description = "Tarefas e registros de manutenção"),
        (name = "Trips", description = "Viagens e horas de uso"),
        (name = "Billing", description = "Assinatura, pacotes de embarcações e webhook")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/vessels/{vessel_id}/trips"));
        assert!(doc.paths.paths.contains_key("/api/webhooks/stripe"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
