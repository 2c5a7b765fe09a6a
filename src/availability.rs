//! Conflict detection for court reservations.
//!
//! Everything here is a pure function over a snapshot of reservations for a
//! single court. The snapshot may be stale by the time a booking is
//! submitted, so a positive answer is only a pre-filter: the reservation
//! store re-runs the same check under its lock and has the final word.

use crate::{
    error::{DayError, GridError},
    types::{Reservation, TimeInterval},
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

/// Which end of a candidate interval an instant is being checked as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryMode {
    AsRangeStart,
    AsRangeEnd,
}

/// True iff the half-open intervals share at least one instant.
pub fn overlaps(a: &TimeInterval, b: &TimeInterval) -> bool {
    a.start() < b.end() && b.start() < a.end()
}

/// True iff no active reservation in `existing` overlaps `proposed`.
///
/// `existing` must already be scoped to the court in question. Canceled
/// entries are skipped here even if the caller forgot to filter them.
pub fn is_range_available<'a, I>(proposed: &TimeInterval, existing: I) -> bool
where
    I: IntoIterator<Item = &'a Reservation>,
{
    !active(existing).any(|reservation| overlaps(proposed, &reservation.interval))
}

/// Same as [`is_range_available`] but ignores the reservation `exclude`,
/// used when moving an existing reservation to a new time.
pub fn is_range_available_excluding<'a, I>(
    proposed: &TimeInterval,
    existing: I,
    exclude: Uuid,
) -> bool
where
    I: IntoIterator<Item = &'a Reservation>,
{
    is_range_available(
        proposed,
        existing
            .into_iter()
            .filter(|reservation| reservation.id != exclude),
    )
}

/// Classifies a single instant as occupied or free.
///
/// As a start, an instant equal to some reservation's end is free. As an end,
/// an instant equal to some reservation's start is free, but one equal to its
/// end is occupied.
pub fn is_instant_occupied<'a, I>(existing: I, instant: NaiveDateTime, mode: BoundaryMode) -> bool
where
    I: IntoIterator<Item = &'a Reservation>,
{
    active(existing).any(|reservation| {
        let (start, end) = (reservation.interval.start(), reservation.interval.end());
        match mode {
            BoundaryMode::AsRangeStart => instant >= start && instant < end,
            BoundaryMode::AsRangeEnd => instant > start && instant <= end,
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupiedSlot {
    pub reservation_id: Uuid,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Midnight of `day` and of the following day. Fails for the last
/// representable date.
fn day_bounds(day: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime), DayError> {
    let next_day = day.succ_opt().ok_or(DayError::OutOfRange(day))?;
    Ok((day.and_time(NaiveTime::MIN), next_day.and_time(NaiveTime::MIN)))
}

/// Lists the parts of `day` covered by active reservations, one entry per
/// reservation, clipped to the day. Entries are never merged.
pub fn occupied_slots<'a>(
    day: NaiveDate,
    existing: &'a [Reservation],
) -> Result<impl Iterator<Item = OccupiedSlot> + Clone + 'a, DayError> {
    let (day_start, day_end) = day_bounds(day)?;

    Ok(existing
        .iter()
        .filter(|reservation| reservation.status.is_active())
        .filter_map(move |reservation| {
            let interval = &reservation.interval;
            if interval.start() >= day_end || interval.end() <= day_start {
                return None;
            }
            Some(OccupiedSlot {
                reservation_id: reservation.id,
                start: interval.start().max(day_start),
                end: interval.end().min(day_end),
            })
        }))
}

fn active<'a, I>(existing: I) -> impl Iterator<Item = &'a Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    existing
        .into_iter()
        .filter(|reservation| reservation.status.is_active())
}

/// Fixed-granularity grid of bookable times between opening and closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    step: Duration,
    open: Duration,
    close: Duration,
}

impl SlotGrid {
    pub fn new(step_minutes: u32, open_hour: u32, close_hour: u32) -> Result<Self, GridError> {
        if step_minutes == 0 {
            return Err(GridError::ZeroStep);
        }
        if close_hour > 24 {
            return Err(GridError::CloseAfterMidnight(close_hour));
        }
        if open_hour >= close_hour {
            return Err(GridError::EmptyOpeningHours {
                open: open_hour,
                close: close_hour,
            });
        }
        Ok(Self {
            step: Duration::minutes(step_minutes.into()),
            open: Duration::hours(open_hour.into()),
            close: Duration::hours(close_hour.into()),
        })
    }

    /// Start-of-slot times from opening up to, but excluding, closing.
    pub fn candidate_slots(
        &self,
        day: NaiveDate,
    ) -> Result<impl Iterator<Item = NaiveTime> + Clone, DayError> {
        let (midnight, _) = day_bounds(day)?;
        Ok(GridPoints {
            next: Some(midnight + self.open),
            last: midnight + self.close - Duration::minutes(1),
            step: self.step,
        }
        .map(|point| point.time()))
    }

    /// Grid points strictly after `start`, up to and including closing time.
    /// Closing at 24 yields midnight of the following day as the last point.
    pub fn end_candidates(
        &self,
        day: NaiveDate,
        start: NaiveTime,
    ) -> Result<impl Iterator<Item = NaiveDateTime> + Clone, DayError> {
        let (midnight, _) = day_bounds(day)?;
        let start = day.and_time(start);
        Ok(GridPoints {
            next: Some(midnight + self.open),
            last: midnight + self.close,
            step: self.step,
        }
        .filter(move |point| *point > start))
    }
}

#[derive(Debug, Clone)]
struct GridPoints {
    next: Option<NaiveDateTime>,
    last: NaiveDateTime,
    step: Duration,
}

impl Iterator for GridPoints {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.next.filter(|point| *point <= self.last)?;
        self.next = point.checked_add_signed(self.step);
        Some(point)
    }
}
