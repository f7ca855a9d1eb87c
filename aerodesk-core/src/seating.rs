//! Seat grid of one airplane and availability queries over an occupancy snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};

/// A bookable position. Ordering is row-major, so the smallest pair is row 1, seat 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatPair {
    pub row: u32,
    pub seat: u32,
}

impl SeatPair {
    pub fn new(row: u32, seat: u32) -> Self {
        Self { row, seat }
    }
}

/// Pairs already ticketed for a flight at one point in time.
pub type OccupancySet = HashSet<SeatPair>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatGrid {
    rows: u32,
    seats_in_row: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowAvailability {
    pub row: u32,
    pub available_seats: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAvailability {
    pub available_seats: u32,
    pub available_rows: Vec<RowAvailability>,
}

impl SeatGrid {
    pub fn new(rows: u32, seats_in_row: u32) -> CoreResult<Self> {
        if rows == 0 {
            return Err(CoreError::Validation("rows must be at least 1".to_string()));
        }
        if seats_in_row == 0 {
            return Err(CoreError::Validation("seats_in_row must be at least 1".to_string()));
        }
        Ok(Self { rows, seats_in_row })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn seats_in_row(&self) -> u32 {
        self.seats_in_row
    }

    pub fn total_seats(&self) -> u32 {
        self.rows.saturating_mul(self.seats_in_row)
    }

    pub fn contains(&self, pair: SeatPair) -> bool {
        (1..=self.rows).contains(&pair.row) && (1..=self.seats_in_row).contains(&pair.seat)
    }

    /// Every pair of the grid, rows ascending then seats ascending.
    pub fn pairs(&self) -> impl Iterator<Item = SeatPair> + '_ {
        (1..=self.rows).flat_map(move |row| (1..=self.seats_in_row).map(move |seat| SeatPair { row, seat }))
    }

    pub fn free_pairs<'a>(&'a self, occupied: &'a OccupancySet) -> impl Iterator<Item = SeatPair> + 'a {
        self.pairs().filter(move |pair| !occupied.contains(pair))
    }

    pub fn available_count(&self, occupied: &OccupancySet) -> u32 {
        let booked = u32::try_from(occupied.len()).unwrap_or(u32::MAX);
        self.total_seats().saturating_sub(booked)
    }

    /// Free seat numbers per row, rows ascending; fully booked rows are left out.
    pub fn rows_with_availability(&self, occupied: &OccupancySet) -> Vec<RowAvailability> {
        (1..=self.rows)
            .filter_map(|row| {
                let available_seats: Vec<u32> = (1..=self.seats_in_row)
                    .filter(|&seat| !occupied.contains(&SeatPair { row, seat }))
                    .collect();
                (!available_seats.is_empty()).then_some(RowAvailability { row, available_seats })
            })
            .collect()
    }

    pub fn availability(&self, occupied: &OccupancySet) -> SeatAvailability {
        SeatAvailability {
            available_seats: self.available_count(occupied),
            available_rows: self.rows_with_availability(occupied),
        }
    }
}
