pub mod admin;
pub mod billing;
pub mod checks;
pub mod inventory;
pub mod maintenance;
pub mod me;
pub mod orgs;
pub mod trips;
pub mod vessels;
