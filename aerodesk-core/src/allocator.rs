//! Booking allocator: turns a [`SeatRequest`] into concrete seat pairs against an occupancy snapshot.
//!
//! Pure and deterministic. Persistence and locking belong to the caller.

use std::collections::BTreeSet;

use crate::error::{BookingError, BookingResult};
use crate::request::SeatRequest;
use crate::seating::{OccupancySet, SeatGrid, SeatPair};

/// Assignments come back in request order. On error nothing has been assigned.
pub fn allocate(grid: &SeatGrid, occupied: &OccupancySet, request: &SeatRequest) -> BookingResult<Vec<SeatPair>> {
    match request {
        SeatRequest::SeatNumber(seat) => allocate_by_number(grid, occupied, std::slice::from_ref(seat)),
        SeatRequest::SeatNumbers(seats) => allocate_by_number(grid, occupied, seats),
        SeatRequest::Explicit(pairs) => allocate_explicit(grid, occupied, pairs),
    }
}

/// Row-unspecified booking.
///
/// Each seat number takes the lowest row where it is free. When no row has it free, the
/// smallest free pair of the whole grid is used instead, whatever its seat number.
fn allocate_by_number(grid: &SeatGrid, occupied: &OccupancySet, seats: &[u32]) -> BookingResult<Vec<SeatPair>> {
    if let Some(&seat) = seats.iter().find(|&&seat| seat == 0 || seat > grid.seats_in_row()) {
        return Err(BookingError::SeatOutOfBounds { seat, seats_in_row: grid.seats_in_row() });
    }

    let mut booked = occupied.clone();
    let mut all_free: BTreeSet<SeatPair> = grid.free_pairs(occupied).collect();

    if all_free.len() < seats.len() {
        return Err(BookingError::Capacity { requested: seats.len(), available: all_free.len() });
    }

    let mut assigned = Vec::with_capacity(seats.len());
    for &seat in seats {
        let pair = match (1..=grid.rows()).map(|row| SeatPair { row, seat }).find(|pair| !booked.contains(pair)) {
            Some(pair) => {
                all_free.remove(&pair);
                pair
            }
            None => {
                let substitute = all_free.pop_first().ok_or(BookingError::Capacity {
                    requested: seats.len(),
                    available: assigned.len(),
                })?;
                tracing::debug!(
                    requested_seat = seat,
                    row = substitute.row,
                    seat = substitute.seat,
                    "seat number unavailable in every row, substituting first free seat"
                );
                substitute
            }
        };
        booked.insert(pair);
        assigned.push(pair);
    }

    Ok(assigned)
}

fn allocate_explicit(grid: &SeatGrid, occupied: &OccupancySet, pairs: &[SeatPair]) -> BookingResult<Vec<SeatPair>> {
    let mut booked = occupied.clone();
    let mut assigned = Vec::with_capacity(pairs.len());

    for &pair in pairs {
        if !(1..=grid.rows()).contains(&pair.row) {
            return Err(BookingError::RowOutOfBounds { row: pair.row, rows: grid.rows() });
        }
        if !(1..=grid.seats_in_row()).contains(&pair.seat) {
            return Err(BookingError::SeatOutOfBounds { seat: pair.seat, seats_in_row: grid.seats_in_row() });
        }
        if !booked.insert(pair) {
            return Err(BookingError::AlreadyBooked { row: pair.row, seat: pair.seat });
        }
        assigned.push(pair);
    }

    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn grid() -> SeatGrid {
        SeatGrid::new(10, 6).unwrap()
    }

    fn occupied(pairs: &[(u32, u32)]) -> OccupancySet {
        pairs.iter().map(|&(row, seat)| SeatPair::new(row, seat)).collect()
    }

    fn pairs(raw: &[(u32, u32)]) -> Vec<SeatPair> {
        raw.iter().map(|&(row, seat)| SeatPair::new(row, seat)).collect()
    }

    #[test]
    fn test_seat_numbers_take_lowest_free_row() {
        let result = allocate(&grid(), &occupied(&[(1, 1)]), &SeatRequest::SeatNumbers(vec![2, 3, 4])).unwrap();
        assert_eq!(result, pairs(&[(1, 2), (1, 3), (1, 4)]));
    }

    #[test]
    fn test_same_seat_number_twice_moves_down_rows() {
        let result = allocate(&grid(), &occupied(&[(1, 5)]), &SeatRequest::SeatNumbers(vec![5, 5])).unwrap();
        assert_eq!(result, pairs(&[(2, 5), (3, 5)]));
    }

    #[test]
    fn test_unsatisfiable_seat_number_falls_back_to_first_free_pair() {
        let all_threes: Vec<(u32, u32)> = (1..=10).map(|row| (row, 3)).collect();
        let result = allocate(&grid(), &occupied(&all_threes), &SeatRequest::SeatNumber(3)).unwrap();

        assert_eq!(result, pairs(&[(1, 1)]));
        assert_ne!(result[0].seat, 3);
    }

    #[test]
    fn test_fallback_skips_pairs_taken_earlier_in_request() {
        let small = SeatGrid::new(2, 2).unwrap();
        let booked = occupied(&[(1, 2), (2, 2)]);
        // Seat 1 goes to (1,1); seat 2 is full everywhere, so the next free pair (2,1) is used.
        let result = allocate(&small, &booked, &SeatRequest::SeatNumbers(vec![1, 2])).unwrap();
        assert_eq!(result, pairs(&[(1, 1), (2, 1)]));
    }

    #[test]
    fn test_capacity_checked_before_assignment() {
        let small = SeatGrid::new(1, 2).unwrap();
        let err = allocate(&small, &occupied(&[(1, 1)]), &SeatRequest::SeatNumbers(vec![1, 2])).unwrap_err();
        assert_eq!(err, BookingError::Capacity { requested: 2, available: 1 });
    }

    #[test]
    fn test_seat_number_outside_row_width_rejected() {
        assert_matches!(
            allocate(&grid(), &OccupancySet::new(), &SeatRequest::SeatNumber(7)),
            Err(BookingError::SeatOutOfBounds { seat: 7, seats_in_row: 6 })
        );
        assert_matches!(
            allocate(&grid(), &OccupancySet::new(), &SeatRequest::SeatNumbers(vec![1, 0])),
            Err(BookingError::SeatOutOfBounds { seat: 0, .. })
        );
    }

    #[test]
    fn test_explicit_pairs_assigned_in_request_order() {
        let request = SeatRequest::Explicit(pairs(&[(5, 2), (1, 6)]));
        assert_eq!(allocate(&grid(), &OccupancySet::new(), &request).unwrap(), pairs(&[(5, 2), (1, 6)]));
    }

    #[test]
    fn test_explicit_bounds_checked_row_first() {
        assert_matches!(
            allocate(&grid(), &OccupancySet::new(), &SeatRequest::Explicit(pairs(&[(11, 9)]))),
            Err(BookingError::RowOutOfBounds { row: 11, rows: 10 })
        );
        assert_matches!(
            allocate(&grid(), &OccupancySet::new(), &SeatRequest::Explicit(pairs(&[(0, 1)]))),
            Err(BookingError::RowOutOfBounds { row: 0, .. })
        );
        assert_matches!(
            allocate(&grid(), &OccupancySet::new(), &SeatRequest::Explicit(pairs(&[(2, 7)]))),
            Err(BookingError::SeatOutOfBounds { seat: 7, seats_in_row: 6 })
        );
    }

    #[test]
    fn test_explicit_conflict_with_existing_ticket() {
        let request = SeatRequest::Explicit(pairs(&[(2, 2), (1, 1)]));
        assert_eq!(
            allocate(&grid(), &occupied(&[(1, 1)]), &request),
            Err(BookingError::AlreadyBooked { row: 1, seat: 1 })
        );
    }

    #[test]
    fn test_explicit_duplicate_within_request() {
        let request = SeatRequest::Explicit(pairs(&[(3, 3), (3, 3)]));
        assert_eq!(
            allocate(&grid(), &OccupancySet::new(), &request),
            Err(BookingError::AlreadyBooked { row: 3, seat: 3 })
        );
    }

    #[test]
    fn test_allocation_never_touches_snapshot() {
        let booked = occupied(&[(1, 1)]);
        let _ = allocate(&grid(), &booked, &SeatRequest::SeatNumbers(vec![1, 2])).unwrap();
        assert_eq!(booked, occupied(&[(1, 1)]));
    }

    #[test]
    fn test_assignments_are_distinct_and_free() {
        let booked = occupied(&[(1, 1), (1, 2), (2, 2), (4, 4)]);
        let result = allocate(&grid(), &booked, &SeatRequest::SeatNumbers(vec![2, 2, 2, 1, 4])).unwrap();

        let unique: std::collections::HashSet<_> = result.iter().copied().collect();
        assert_eq!(unique.len(), result.len());
        assert!(result.iter().all(|pair| !booked.contains(pair) && grid().contains(*pair)));
    }
}
