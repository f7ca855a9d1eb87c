//! Decoding of the loosely shaped seat fields of booking payloads into one canonical [`SeatRequest`].

use serde::Deserialize;

use crate::error::{BookingError, BookingResult};
use crate::models::DbId;
use crate::seating::SeatPair;

/// What the allocator consumes. Exactly one mode per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatRequest {
    /// Seat number `N` in whichever row has it free.
    SeatNumber(u32),
    /// One ticket per seat number, rows chosen by the allocator.
    SeatNumbers(Vec<u32>),
    /// Exact positions.
    Explicit(Vec<SeatPair>),
}

impl SeatRequest {
    pub fn ticket_count(&self) -> usize {
        match self {
            SeatRequest::SeatNumber(_) => 1,
            SeatRequest::SeatNumbers(seats) => seats.len(),
            SeatRequest::Explicit(pairs) => pairs.len(),
        }
    }
}

/// Which flight a booking goes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTarget {
    Flight(DbId),
    Route { source: DbId, destination: DbId },
}

/// `[3, 4]`, `"3,4"` or a bare `3`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NumberList {
    Single(u32),
    Values(Vec<u32>),
    Csv(String),
}

impl NumberList {
    fn parse(&self, field: &str) -> BookingResult<Vec<u32>> {
        let values = match self {
            NumberList::Single(value) => vec![*value],
            NumberList::Values(values) => values.clone(),
            NumberList::Csv(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<u32>().map_err(|_| {
                        BookingError::InputShape(format!("`{field}` contains an invalid number: {part:?}"))
                    })
                })
                .collect::<BookingResult<Vec<u32>>>()?,
        };
        if values.is_empty() {
            return Err(BookingError::InputShape(format!("`{field}` must list at least one number")));
        }
        Ok(values)
    }
}

/// `seats` is either plain seat numbers or `{row, seat}` objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeatList {
    Numbers(Vec<u32>),
    Pairs(Vec<SeatPair>),
}

/// Seat fields as they arrive over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeatSpec {
    #[serde(default)]
    pub row: Option<u32>,
    #[serde(default)]
    pub seat: Option<u32>,
    #[serde(default)]
    pub seats: Option<SeatList>,
    #[serde(default)]
    pub rows: Option<NumberList>,
    #[serde(default)]
    pub seat_numbers: Option<NumberList>,
}

impl SeatSpec {
    pub fn into_request(self) -> BookingResult<SeatRequest> {
        let mut given = Vec::new();
        if self.seat.is_some() || self.row.is_some() {
            given.push("seat");
        }
        if self.seats.is_some() {
            given.push("seats");
        }
        if self.rows.is_some() || self.seat_numbers.is_some() {
            given.push("rows/seat_numbers");
        }

        match given.len() {
            0 => {
                return Err(BookingError::InputShape(
                    "Specify one of `seat`, `seats`, or `rows` together with `seat_numbers`".to_string(),
                ))
            }
            1 => {}
            _ => {
                return Err(BookingError::InputShape(format!(
                    "Specify only one of `seat`, `seats`, or `rows` with `seat_numbers` (got {})",
                    given.join(", ")
                )))
            }
        }

        if let Some(seats) = self.seats {
            return match seats {
                SeatList::Numbers(numbers) if numbers.is_empty() => {
                    Err(BookingError::InputShape("`seats` must list at least one seat".to_string()))
                }
                SeatList::Numbers(numbers) => Ok(SeatRequest::SeatNumbers(numbers)),
                SeatList::Pairs(pairs) => Ok(SeatRequest::Explicit(pairs)),
            };
        }

        if self.rows.is_some() || self.seat_numbers.is_some() {
            let (Some(rows), Some(seat_numbers)) = (self.rows, self.seat_numbers) else {
                return Err(BookingError::InputShape(
                    "`rows` and `seat_numbers` must be given together".to_string(),
                ));
            };
            let rows = rows.parse("rows")?;
            let seat_numbers = seat_numbers.parse("seat_numbers")?;
            if rows.len() != seat_numbers.len() {
                return Err(BookingError::InputShape(format!(
                    "`rows` has {} entries but `seat_numbers` has {}",
                    rows.len(),
                    seat_numbers.len()
                )));
            }
            let pairs = rows
                .into_iter()
                .zip(seat_numbers)
                .map(|(row, seat)| SeatPair { row, seat })
                .collect();
            return Ok(SeatRequest::Explicit(pairs));
        }

        match (self.row, self.seat) {
            (Some(row), Some(seat)) => Ok(SeatRequest::Explicit(vec![SeatPair { row, seat }])),
            (None, Some(seat)) => Ok(SeatRequest::SeatNumber(seat)),
            _ => Err(BookingError::InputShape("`row` requires `seat`".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn decode(json: &str) -> BookingResult<SeatRequest> {
        serde_json::from_str::<SeatSpec>(json).expect("valid json").into_request()
    }

    #[test]
    fn test_single_seat_number() {
        assert_eq!(decode(r#"{"seat": 3}"#).unwrap(), SeatRequest::SeatNumber(3));
    }

    #[test]
    fn test_list_of_seat_numbers() {
        assert_eq!(decode(r#"{"seats": [2, 3, 4]}"#).unwrap(), SeatRequest::SeatNumbers(vec![2, 3, 4]));
    }

    #[test]
    fn test_seat_pairs_list() {
        assert_eq!(
            decode(r#"{"seats": [{"row": 1, "seat": 2}, {"row": 5, "seat": 6}]}"#).unwrap(),
            SeatRequest::Explicit(vec![SeatPair::new(1, 2), SeatPair::new(5, 6)])
        );
    }

    #[test]
    fn test_comma_separated_rows_and_seats() {
        assert_eq!(
            decode(r#"{"rows": "1, 2", "seat_numbers": "3,4"}"#).unwrap(),
            SeatRequest::Explicit(vec![SeatPair::new(1, 3), SeatPair::new(2, 4)])
        );
        assert_eq!(
            decode(r#"{"rows": [7], "seat_numbers": 1}"#).unwrap(),
            SeatRequest::Explicit(vec![SeatPair::new(7, 1)])
        );
    }

    #[test]
    fn test_row_with_seat_is_explicit() {
        assert_eq!(
            decode(r#"{"row": 2, "seat": 3}"#).unwrap(),
            SeatRequest::Explicit(vec![SeatPair::new(2, 3)])
        );
    }

    #[test]
    fn test_seat_and_seats_together_rejected() {
        assert_matches!(decode(r#"{"seat": 1, "seats": [2]}"#), Err(BookingError::InputShape(_)));
        assert_matches!(
            decode(r#"{"seats": [2], "rows": "1", "seat_numbers": "2"}"#),
            Err(BookingError::InputShape(_))
        );
    }

    #[test]
    fn test_nothing_given_rejected() {
        assert_matches!(decode("{}"), Err(BookingError::InputShape(_)));
    }

    #[test]
    fn test_malformed_lists_rejected() {
        assert_matches!(decode(r#"{"seats": []}"#), Err(BookingError::InputShape(_)));
        assert_matches!(decode(r#"{"rows": "1,2", "seat_numbers": "3"}"#), Err(BookingError::InputShape(_)));
        assert_matches!(decode(r#"{"rows": "1,x", "seat_numbers": "3,4"}"#), Err(BookingError::InputShape(_)));
        assert_matches!(decode(r#"{"rows": "1"}"#), Err(BookingError::InputShape(_)));
        assert_matches!(decode(r#"{"rows": "", "seat_numbers": ""}"#), Err(BookingError::InputShape(_)));
        assert_matches!(decode(r#"{"row": 1}"#), Err(BookingError::InputShape(_)));
    }

    #[test]
    fn test_ticket_count() {
        assert_eq!(SeatRequest::SeatNumber(1).ticket_count(), 1);
        assert_eq!(SeatRequest::SeatNumbers(vec![1, 2, 3]).ticket_count(), 3);
    }
}
