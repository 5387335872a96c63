// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::OrgContext},
    models::organization::OrgRole,
    rules::permissions,
};

/// 1. O Trait que define uma Permissão (predicado sobre o cargo)
pub trait PermissionDef: Send + Sync + 'static {
    fn allows(role: OrgRole) -> bool;
}

/// 2. O Extractor (Guardião). Depende do `OrgContext` deixado pelo tenant_guard.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        let result = match parts.extensions.get::<OrgContext>() {
            None => Err(AppError::OrgHeaderMissing),
            Some(context) if !T::allows(context.role) => Err(AppError::InsufficientRole),
            Some(_) => Ok(RequirePermission(PhantomData)),
        };
        result.map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
    }
}

/// Ações de plataforma: só a flag de super admin conta, o cargo na organização não.
pub struct RequireSuperAdmin;

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        let result = match parts.extensions.get::<AuthenticatedUser>() {
            None => Err(AppError::InvalidToken),
            Some(user) if !user.0.is_super_admin => Err(AppError::SuperAdminRequired),
            Some(_) => Ok(RequireSuperAdmin),
        };
        result.map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermManageVessels;
impl PermissionDef for PermManageVessels {
    fn allows(role: OrgRole) -> bool { permissions::can_manage_vessels(role) }
}

pub struct PermEditInventory;
impl PermissionDef for PermEditInventory {
    fn allows(role: OrgRole) -> bool { permissions::can_edit_inventory(role) }
}

pub struct PermEditMaintenance;
impl PermissionDef for PermEditMaintenance {
    fn allows(role: OrgRole) -> bool { permissions::can_edit_maintenance_tasks(role) }
}

pub struct PermLogTrips;
impl PermissionDef for PermLogTrips {
    fn allows(role: OrgRole) -> bool { permissions::can_log_trips(role) }
}

pub struct PermAdministerOrg;
impl PermissionDef for PermAdministerOrg {
    fn allows(role: OrgRole) -> bool { permissions::can_administer_org(role) }
}

// Conferências, logs de manutenção, comentários
pub struct PermParticipate;
impl PermissionDef for PermParticipate {
    fn allows(role: OrgRole) -> bool { permissions::can_participate(role) }
}
