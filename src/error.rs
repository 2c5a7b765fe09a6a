use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Invalid interval: end {end} must be after start {start}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Slot step must be at least one minute")]
    ZeroStep,

    #[error("Opening hour {open} must be before closing hour {close}")]
    EmptyOpeningHours { open: u32, close: u32 },

    #[error("Closing hour {0} is past midnight")]
    CloseAfterMidnight(u32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DayError {
    #[error("Date {0} is out of the supported range")]
    OutOfRange(NaiveDate),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Court {0} does not exist")]
    CourtNotFound(Uuid),

    #[error("Reservation {0} does not exist")]
    ReservationNotFound(Uuid),

    #[error("Court is not active")]
    CourtInactive,

    #[error("Too many players. Max players for this court: {max}")]
    TooManyPlayers { max: u8 },

    #[error("Reservation can't start in the past")]
    InPast,

    #[error("Court is not available for the selected time")]
    SlotTaken,

    #[error("Reservation is canceled")]
    ReservationCanceled,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid booking: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Interval(#[from] IntervalError),

    #[error(transparent)]
    Day(#[from] DayError),

    #[error("Selected time range is already occupied")]
    Unavailable,

    #[error("This slot was just taken, please pick another one")]
    SlotTaken,

    #[error("Reservation belongs to another user")]
    NotOwner,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotTaken => BookingError::SlotTaken,
            err => BookingError::Store(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing or malformed x-user-id header")]
    MissingUser,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl From<IntervalError> for AppError {
    fn from(err: IntervalError) -> Self {
        AppError::Booking(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingUser | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            AppError::Booking(err) => match err {
                BookingError::Invalid(_) | BookingError::Interval(_) | BookingError::Day(_) => {
                    StatusCode::BAD_REQUEST
                }
                BookingError::Unavailable | BookingError::SlotTaken => StatusCode::CONFLICT,
                BookingError::NotOwner => StatusCode::FORBIDDEN,
                BookingError::Store(err) => match err {
                    StoreError::CourtNotFound(_) | StoreError::ReservationNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    StoreError::SlotTaken => StatusCode::CONFLICT,
                    StoreError::CourtInactive
                    | StoreError::TooManyPlayers { .. }
                    | StoreError::InPast
                    | StoreError::ReservationCanceled => StatusCode::UNPROCESSABLE_ENTITY,
                },
            },
        };

        (status, self.to_string()).into_response()
    }
}
