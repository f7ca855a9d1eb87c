use chrono::{DateTime, Utc};

/// One seat in a committed booking.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BookedSeat {
    pub ticket_id: i64,
    pub row: u32,
    pub seat: u32,
}

/// Published after an order and its tickets are committed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TicketsBookedEvent {
    pub order_id: i64,
    pub flight_id: i64,
    pub seats: Vec<BookedSeat>,
    pub remaining_seats: u32,
    pub booked_at: DateTime<Utc>,
}

impl TicketsBookedEvent {
    pub fn event_name(&self) -> &'static str {
        "tickets_booked"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let event = TicketsBookedEvent {
            order_id: 7,
            flight_id: 3,
            seats: vec![BookedSeat { ticket_id: 11, row: 1, seat: 2 }],
            remaining_seats: 59,
            booked_at: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(event.event_name(), "tickets_booked");
        assert_eq!(value["flight_id"], 3);
        assert_eq!(value["seats"][0]["row"], 1);
        assert_eq!(value["seats"][0]["seat"], 2);
        assert_eq!(value["remaining_seats"], 59);
    }
}
