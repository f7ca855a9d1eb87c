//! Prometheus counters for booking outcomes.

use prometheus::{opts, IntCounter, IntCounterVec, Registry, TextEncoder};

pub type MetricsError = prometheus::Error;

pub struct BookingMetrics {
    registry: Registry,

    /// Labels: `outcome` (booked, rejected, conflict_retry)
    bookings: IntCounterVec,

    /// Labels: `kind` (INPUT_SHAPE, OUT_OF_BOUNDS, SEAT_CONFLICT, ...)
    rejections: IntCounterVec,

    tickets_booked: IntCounter,
}

impl BookingMetrics {
    /// # Errors
    ///
    /// Returns error if metric registration fails (e.g., duplicate names)
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let bookings = IntCounterVec::new(
            opts!("aerodesk_bookings_total", "Booking requests by outcome"),
            &["outcome"],
        )?;
        let rejections = IntCounterVec::new(
            opts!("aerodesk_booking_rejections_total", "Rejected bookings by error kind"),
            &["kind"],
        )?;
        let tickets_booked = IntCounter::new("aerodesk_tickets_booked_total", "Tickets committed")?;

        registry.register(Box::new(bookings.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(tickets_booked.clone()))?;

        Ok(Self { registry, bookings, rejections, tickets_booked })
    }

    pub fn record_booked(&self, tickets: usize) {
        self.bookings.with_label_values(&["booked"]).inc();
        self.tickets_booked.inc_by(tickets as u64);
    }

    pub fn record_rejected(&self, kind: &str) {
        self.bookings.with_label_values(&["rejected"]).inc();
        self.rejections.with_label_values(&[kind]).inc();
    }

    pub fn record_conflict_retry(&self) {
        self.bookings.with_label_values(&["conflict_retry"]).inc();
    }

    pub fn booked_count(&self) -> u64 {
        self.bookings.with_label_values(&["booked"]).get()
    }

    pub fn conflict_retry_count(&self) -> u64 {
        self.bookings.with_label_values(&["conflict_retry"]).get()
    }

    /// Text exposition format for scraping.
    pub fn export_prometheus(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
