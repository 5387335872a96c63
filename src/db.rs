pub mod inventory_repo;
pub mod maintenance_repo;
pub mod org_repo;
pub mod trip_repo;
pub mod user_repo;
pub mod vessel_repo;

pub use inventory_repo::InventoryRepository;
pub use maintenance_repo::MaintenanceRepository;
pub use org_repo::OrgRepository;
pub use trip_repo::TripRepository;
pub use user_repo::UserRepository;
pub use vessel_repo::VesselRepository;
