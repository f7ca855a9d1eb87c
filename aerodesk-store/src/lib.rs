pub mod airport_repo;
pub mod app_config;
pub mod database;
pub mod errors;
pub mod fleet_repo;
pub mod flight_repo;
pub mod memory;
pub mod order_repo;

pub use airport_repo::PgAirportRepository;
pub use database::DbClient;
pub use fleet_repo::PgFleetRepository;
pub use flight_repo::PgFlightRepository;
pub use memory::InMemoryStore;
pub use order_repo::PgOrderRepository;
