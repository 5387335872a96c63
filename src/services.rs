pub mod admin_service;
pub mod auth;
pub mod billing_service;
pub mod inventory_service;
pub mod maintenance_service;
pub mod org_service;
pub mod trip_service;
pub mod vessel_service;

#[cfg(test)]
pub(crate) mod test_support;
