pub mod allocator;
pub mod error;
pub mod models;
pub mod repository;
pub mod request;
pub mod seating;

pub use allocator::allocate;
pub use error::{BookingError, BookingResult, CoreError, CoreResult};
pub use models::DbId;
pub use request::{BookingTarget, SeatRequest, SeatSpec};
pub use seating::{OccupancySet, SeatGrid, SeatPair};
