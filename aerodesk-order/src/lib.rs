pub mod metrics;
pub mod resolver;
pub mod service;

pub use metrics::{BookingMetrics, MetricsError};
pub use resolver::FlightResolver;
pub use service::BookingService;
