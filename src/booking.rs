use crate::{
    availability::{
        is_instant_occupied, is_range_available, is_range_available_excluding, occupied_slots,
        BoundaryMode, OccupiedSlot, SlotGrid,
    },
    backend::ReservationStore,
    error::{BookingError, StoreError},
    types::{Court, ProposedBooking, Reservation, Session, TimeInterval},
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOption {
    pub at: NaiveDateTime,
    pub available: bool,
}

/// Everything a slot picker needs to render one day of one court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub court_id: Uuid,
    pub date: NaiveDate,
    pub starts: Vec<SlotOption>,
    pub ends: Vec<SlotOption>,
    pub occupied: Vec<OccupiedSlot>,
}

/// Booking submission flow: snapshot, local checks, then the store decides.
///
/// The local checks only filter out bookings that are certainly impossible.
/// A booking that passes them can still be refused by the store when someone
/// else was faster, which is reported as [`BookingError::SlotTaken`].
#[derive(Debug, Clone)]
pub struct BookingWorkflow<S> {
    store: S,
    grid: SlotGrid,
}

impl<S: ReservationStore> BookingWorkflow<S> {
    pub fn new(store: S, grid: SlotGrid) -> Self {
        Self { store, grid }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn courts(&self) -> Vec<Court> {
        self.store.courts()
    }

    pub fn reservations(&self, court_id: Uuid) -> Result<Vec<Reservation>, BookingError> {
        Ok(self.store.court_reservations(court_id)?)
    }

    /// Reservations of the session's user across all courts, canceled included.
    pub fn own_reservations(&self, session: &Session) -> Vec<Reservation> {
        self.store.user_reservations(session.user_id)
    }

    pub fn day_availability(
        &self,
        court_id: Uuid,
        date: NaiveDate,
        start: Option<NaiveTime>,
    ) -> Result<DayAvailability, BookingError> {
        let candidates = self.grid.candidate_slots(date)?;
        let snapshot = self.store.court_reservations(court_id)?;

        let starts = candidates
            .map(|time| {
                let at = date.and_time(time);
                SlotOption {
                    at,
                    available: !is_instant_occupied(&snapshot, at, BoundaryMode::AsRangeStart),
                }
            })
            .collect();

        let ends = match start {
            Some(start) => {
                let start_at = date.and_time(start);
                self.grid
                    .end_candidates(date, start)?
                    .map(|at| SlotOption {
                        at,
                        available: !is_instant_occupied(&snapshot, at, BoundaryMode::AsRangeEnd)
                            && TimeInterval::new(start_at, at)
                                .map(|interval| is_range_available(&interval, &snapshot))
                                .unwrap_or(false),
                    })
                    .collect()
            }
            None => vec![],
        };

        let occupied = occupied_slots(date, &snapshot)?.collect();

        Ok(DayAvailability {
            court_id,
            date,
            starts,
            ends,
            occupied,
        })
    }

    pub fn submit(
        &self,
        session: &Session,
        booking: ProposedBooking,
    ) -> Result<Reservation, BookingError> {
        booking.validate()?;

        let snapshot = self.store.court_reservations(booking.court_id)?;
        if !is_range_available(&booking.interval, &snapshot) {
            info!(court_id = %booking.court_id, interval = ?booking.interval, "Selected range is occupied");
            return Err(BookingError::Unavailable);
        }

        self.store
            .create_reservation(session.user_id, booking)
            .map_err(|err| {
                warn!(?err, user_id = %session.user_id, "Store refused reservation");
                err.into()
            })
    }

    pub fn reschedule(
        &self,
        session: &Session,
        reservation_id: Uuid,
        interval: TimeInterval,
    ) -> Result<Reservation, BookingError> {
        let reservation = self.store.reservation(reservation_id)?;
        if reservation.user_id != session.user_id {
            warn!(%reservation_id, user_id = %session.user_id, "Reschedule by non-owner");
            return Err(BookingError::NotOwner);
        }
        if !reservation.status.is_active() {
            return Err(StoreError::ReservationCanceled.into());
        }

        let snapshot = self.store.court_reservations(reservation.court_id)?;
        if !is_range_available_excluding(&interval, &snapshot, reservation_id) {
            return Err(BookingError::Unavailable);
        }

        self.store
            .update_reservation_interval(reservation_id, interval)
            .map_err(|err| {
                warn!(?err, %reservation_id, "Store refused reschedule");
                err.into()
            })
    }

    pub fn confirm(&self, reservation_id: Uuid) -> Result<Reservation, BookingError> {
        Ok(self.store.confirm_reservation(reservation_id)?)
    }

    pub fn cancel(&self, reservation_id: Uuid) -> Result<Reservation, BookingError> {
        Ok(self.store.cancel_reservation(reservation_id)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{backend::MockReservationStore, error::DayError, types::ReservationStatus};
    use mockall::predicate::eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 5, 10).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        date().and_hms_opt(hour, minute, 0).unwrap()
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn interval(start: (u32, u32), end: (u32, u32)) -> TimeInterval {
        TimeInterval::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
    }

    fn reservation(
        court_id: Uuid,
        user_id: Uuid,
        start: (u32, u32),
        end: (u32, u32),
        status: ReservationStatus,
    ) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            court_id,
            user_id,
            players_count: 2,
            additional_info: String::new(),
            status,
            interval: interval(start, end),
        }
    }

    fn booking(court_id: Uuid, start: (u32, u32), end: (u32, u32)) -> ProposedBooking {
        ProposedBooking {
            court_id,
            interval: interval(start, end),
            players_count: 2,
            additional_info: String::new(),
        }
    }

    /// Court with 09:00-10:00 confirmed and 14:00-15:00 pending.
    fn store_with_snapshot(court_id: Uuid) -> MockReservationStore {
        let snapshot = vec![
            reservation(court_id, Uuid::new_v4(), (9, 0), (10, 0), ReservationStatus::Confirmed),
            reservation(court_id, Uuid::new_v4(), (14, 0), (15, 0), ReservationStatus::Pending),
        ];
        let mut store = MockReservationStore::new();
        store
            .expect_court_reservations()
            .with(eq(court_id))
            .returning(move |_| Ok(snapshot.clone()));
        store
    }

    fn workflow(store: MockReservationStore) -> BookingWorkflow<MockReservationStore> {
        BookingWorkflow::new(store, SlotGrid::new(30, 6, 23).unwrap())
    }

    #[test]
    fn test_submit_passes_free_range_to_store() {
        let court_id = Uuid::new_v4();
        let session = Session {
            user_id: Uuid::new_v4(),
        };
        let mut store = store_with_snapshot(court_id);
        store
            .expect_create_reservation()
            .times(1)
            .returning(move |user_id, booking| {
                Ok(Reservation {
                    id: Uuid::new_v4(),
                    court_id: booking.court_id,
                    user_id,
                    players_count: booking.players_count,
                    additional_info: booking.additional_info,
                    status: ReservationStatus::Pending,
                    interval: booking.interval,
                })
            });

        let created = workflow(store)
            .submit(&session, booking(court_id, (13, 0), (14, 0)))
            .unwrap();
        assert_eq!(created.user_id, session.user_id);
        assert_eq!(created.interval, interval((13, 0), (14, 0)));
    }

    #[test]
    fn test_submit_rejects_occupied_range_before_store() {
        let court_id = Uuid::new_v4();
        let mut store = store_with_snapshot(court_id);
        store.expect_create_reservation().never();

        let session = Session {
            user_id: Uuid::new_v4(),
        };
        let workflow = workflow(store);
        for (start, end) in [((13, 30), (14, 30)), ((9, 30), (9, 45))] {
            let err = workflow
                .submit(&session, booking(court_id, start, end))
                .unwrap_err();
            assert!(matches!(err, BookingError::Unavailable));
        }
    }

    #[test]
    fn test_submit_reports_slot_taken_by_store() {
        let court_id = Uuid::new_v4();
        let mut store = store_with_snapshot(court_id);
        store
            .expect_create_reservation()
            .returning(|_, _| Err(StoreError::SlotTaken));

        let err = workflow(store)
            .submit(
                &Session {
                    user_id: Uuid::new_v4(),
                },
                booking(court_id, (8, 0), (9, 0)),
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotTaken));
    }

    #[test]
    fn test_submit_validates_players() {
        let mut store = MockReservationStore::new();
        store.expect_court_reservations().never();
        store.expect_create_reservation().never();

        let mut invalid = booking(Uuid::new_v4(), (8, 0), (9, 0));
        invalid.players_count = 0;
        let err = workflow(store)
            .submit(
                &Session {
                    user_id: Uuid::new_v4(),
                },
                invalid,
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::Invalid(_)));
    }

    #[test]
    fn test_day_availability() {
        let court_id = Uuid::new_v4();
        let availability = workflow(store_with_snapshot(court_id))
            .day_availability(court_id, date(), Some(time(12, 0)))
            .unwrap();

        assert_eq!(availability.starts.len(), 34);
        let start_at = |hour, minute| {
            availability
                .starts
                .iter()
                .find(|option| option.at == at(hour, minute))
                .unwrap()
                .available
        };
        assert!(start_at(8, 30));
        assert!(!start_at(9, 0));
        assert!(!start_at(9, 30));
        assert!(start_at(10, 0));
        assert!(!start_at(14, 0));
        assert!(start_at(15, 0));

        let end_at = |hour, minute| {
            availability
                .ends
                .iter()
                .find(|option| option.at == at(hour, minute))
                .unwrap()
                .available
        };
        assert_eq!(availability.ends.first().unwrap().at, at(12, 30));
        assert_eq!(availability.ends.last().unwrap().at, at(23, 0));
        assert!(end_at(13, 30));
        assert!(end_at(14, 0));
        assert!(!end_at(14, 30));
        assert!(!end_at(16, 0));

        assert_eq!(availability.occupied.len(), 2);
        assert_eq!(availability.occupied[0].start, at(9, 0));
    }

    #[test]
    fn test_day_availability_without_start_has_no_ends() {
        let court_id = Uuid::new_v4();
        let availability = workflow(store_with_snapshot(court_id))
            .day_availability(court_id, date(), None)
            .unwrap();
        assert!(availability.ends.is_empty());
    }

    #[test]
    fn test_day_availability_on_last_representable_day() {
        let mut store = MockReservationStore::new();
        store.expect_court_reservations().never();

        let err = workflow(store)
            .day_availability(Uuid::new_v4(), NaiveDate::MAX, Some(time(8, 0)))
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::Day(DayError::OutOfRange(day)) if day == NaiveDate::MAX
        ));
    }

    #[test]
    fn test_own_reservations_use_session_user() {
        let user_id = Uuid::new_v4();
        let own = reservation(
            Uuid::new_v4(),
            user_id,
            (10, 0),
            (11, 0),
            ReservationStatus::Pending,
        );
        let expected = vec![own.clone()];

        let mut store = MockReservationStore::new();
        store
            .expect_user_reservations()
            .with(eq(user_id))
            .times(1)
            .returning(move |_| vec![own.clone()]);

        assert_eq!(workflow(store).own_reservations(&Session { user_id }), expected);
    }

    #[test]
    fn test_reschedule_by_owner() {
        let court_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let own = reservation(court_id, user_id, (10, 0), (11, 0), ReservationStatus::Confirmed);
        let own_id = own.id;
        let snapshot = vec![own.clone()];

        let mut store = MockReservationStore::new();
        store
            .expect_reservation()
            .with(eq(own_id))
            .returning(move |_| Ok(own.clone()));
        store
            .expect_court_reservations()
            .returning(move |_| Ok(snapshot.clone()));
        store
            .expect_update_reservation_interval()
            .with(eq(own_id), eq(interval((10, 30), (11, 30))))
            .times(1)
            .returning(|id, interval| {
                Ok(Reservation {
                    id,
                    court_id: Uuid::nil(),
                    user_id: Uuid::nil(),
                    players_count: 2,
                    additional_info: String::new(),
                    status: ReservationStatus::Confirmed,
                    interval,
                })
            });

        let moved = workflow(store)
            .reschedule(&Session { user_id }, own_id, interval((10, 30), (11, 30)))
            .unwrap();
        assert_eq!(moved.interval, interval((10, 30), (11, 30)));
    }

    #[test]
    fn test_reschedule_by_other_user() {
        let court_id = Uuid::new_v4();
        let own = reservation(
            court_id,
            Uuid::new_v4(),
            (10, 0),
            (11, 0),
            ReservationStatus::Pending,
        );
        let own_id = own.id;

        let mut store = MockReservationStore::new();
        store
            .expect_reservation()
            .returning(move |_| Ok(own.clone()));
        store.expect_update_reservation_interval().never();

        let err = workflow(store)
            .reschedule(
                &Session {
                    user_id: Uuid::new_v4(),
                },
                own_id,
                interval((12, 0), (13, 0)),
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::NotOwner));
    }

    #[test]
    fn test_reschedule_canceled_reservation() {
        let court_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let canceled = reservation(court_id, user_id, (10, 0), (11, 0), ReservationStatus::Canceled);
        let canceled_id = canceled.id;
        // The target range is taken, a canceled reservation is still reported as canceled.
        let blocking = reservation(
            court_id,
            Uuid::new_v4(),
            (12, 0),
            (13, 0),
            ReservationStatus::Confirmed,
        );
        let snapshot = vec![canceled.clone(), blocking];

        let mut store = MockReservationStore::new();
        store
            .expect_reservation()
            .returning(move |_| Ok(canceled.clone()));
        store
            .expect_court_reservations()
            .returning(move |_| Ok(snapshot.clone()));
        store.expect_update_reservation_interval().never();

        let err = workflow(store)
            .reschedule(&Session { user_id }, canceled_id, interval((12, 0), (13, 0)))
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::Store(StoreError::ReservationCanceled)
        ));
    }

    #[test]
    fn test_status_changes_are_delegated() {
        let id = Uuid::new_v4();
        let mut store = MockReservationStore::new();
        store
            .expect_cancel_reservation()
            .with(eq(id))
            .times(1)
            .returning(|id| Err(StoreError::ReservationNotFound(id)));

        let err = workflow(store).cancel(id).unwrap_err();
        assert!(matches!(
            err,
            BookingError::Store(StoreError::ReservationNotFound(_))
        ));
    }
}
