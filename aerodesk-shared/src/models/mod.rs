pub mod events;

pub use events::{BookedSeat, TicketsBookedEvent};
