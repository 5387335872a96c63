pub mod auth;
pub mod billing;
pub mod inventory;
pub mod maintenance;
pub mod organization;
pub mod trips;
pub mod vessel;
