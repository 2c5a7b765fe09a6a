use crate::error::IntervalError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Half-open wall-clock interval `[start, end)`.
///
/// Can only be built through [`TimeInterval::new`] (or deserialized, which
/// runs the same check), so `end > start` holds for every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "RawInterval")]
pub struct TimeInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawInterval {
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
}

impl TimeInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, IntervalError> {
        if end <= start {
            return Err(IntervalError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = IntervalError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        TimeInterval::new(raw.start_at, raw.end_at)
    }
}

impl From<TimeInterval> for RawInterval {
    fn from(interval: TimeInterval) -> Self {
        RawInterval {
            start_at: interval.start,
            end_at: interval.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl ReservationStatus {
    /// Pending and confirmed reservations hold their time, canceled ones are inert.
    pub fn is_active(self) -> bool {
        !matches!(self, ReservationStatus::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub court_id: Uuid,
    pub user_id: Uuid,
    pub players_count: u8,
    pub additional_info: String,
    pub status: ReservationStatus,
    #[serde(flatten)]
    pub interval: TimeInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ProposedBooking {
    pub court_id: Uuid,
    pub interval: TimeInterval,
    #[validate(range(min = 1, max = 4))]
    pub players_count: u8,
    #[validate(length(max = 1000))]
    pub additional_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub is_active: bool,
}

/// Who is acting on the booking workflow. Passed explicitly to every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
}
