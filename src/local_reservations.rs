use crate::{
    availability::{is_range_available, is_range_available_excluding},
    backend::ReservationStore,
    error::StoreError,
    types::{Court, ProposedBooking, Reservation, ReservationStatus, TimeInterval},
};
use chrono::Local;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::watch::{self, Sender};
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LocalReservations {
    courts: Arc<Mutex<HashMap<Uuid, Court>>>,
    reservations: Arc<Mutex<HashMap<Uuid, Reservation>>>,
    sender: Sender<Vec<Reservation>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for LocalReservations {
    fn default() -> Self {
        let (sender, _) = watch::channel(vec![]);
        Self {
            courts: Arc::default(),
            reservations: Arc::default(),
            sender,
        }
    }
}

impl LocalReservations {
    pub fn add_court(&self, court: Court) {
        lock(&self.courts).insert(court.id, court);
    }

    pub fn insert_example_courts(&self) {
        const EXAMPLE_COURTS: [(&str, u8); 3] =
            [("Center Court", 4), ("Court 2", 4), ("Practice Court", 2)];
        for (name, max_players) in EXAMPLE_COURTS {
            let court = Court {
                id: Uuid::new_v4(),
                name: name.into(),
                max_players,
                is_active: true,
            };
            info!(court_id = %court.id, name, "Added example court");
            self.add_court(court);
        }
    }

    fn all_reservations(&self) -> Vec<Reservation> {
        let mut reservations: Vec<Reservation> =
            lock(&self.reservations).values().cloned().collect();
        reservations.sort_unstable_by_key(|reservation| reservation.interval.start());
        reservations
    }

    fn send_reservations(&self) {
        self.sender.send_replace(self.all_reservations());
    }

    fn ensure_not_in_past(interval: &TimeInterval) -> Result<(), StoreError> {
        if interval.start() < Local::now().naive_local() {
            warn!(start = %interval.start(), "Rejected reservation in the past");
            return Err(StoreError::InPast);
        }
        Ok(())
    }

    fn set_status(&self, id: Uuid, status: ReservationStatus) -> Result<Reservation, StoreError> {
        let updated = {
            let mut reservations = lock(&self.reservations);
            let reservation = reservations
                .get_mut(&id)
                .ok_or(StoreError::ReservationNotFound(id))?;
            if status == ReservationStatus::Confirmed
                && reservation.status == ReservationStatus::Canceled
            {
                error!(%id, "Canceled reservation can't be confirmed");
                return Err(StoreError::ReservationCanceled);
            }
            reservation.status = status;
            reservation.clone()
        };
        info!(%id, ?status, "Reservation status changed");
        self.send_reservations();
        Ok(updated)
    }
}

impl ReservationStore for LocalReservations {
    fn courts(&self) -> Vec<Court> {
        let mut courts: Vec<Court> = lock(&self.courts).values().cloned().collect();
        courts.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        courts
    }

    fn court(&self, court_id: Uuid) -> Result<Court, StoreError> {
        lock(&self.courts)
            .get(&court_id)
            .cloned()
            .ok_or(StoreError::CourtNotFound(court_id))
    }

    fn court_reservations(&self, court_id: Uuid) -> Result<Vec<Reservation>, StoreError> {
        self.court(court_id)?;
        Ok(self
            .all_reservations()
            .into_iter()
            .filter(|reservation| reservation.court_id == court_id)
            .collect())
    }

    fn reservation(&self, id: Uuid) -> Result<Reservation, StoreError> {
        lock(&self.reservations)
            .get(&id)
            .cloned()
            .ok_or(StoreError::ReservationNotFound(id))
    }

    fn user_reservations(&self, user_id: Uuid) -> Vec<Reservation> {
        self.all_reservations()
            .into_iter()
            .filter(|reservation| reservation.user_id == user_id)
            .collect()
    }

    fn reservation_stream(&self) -> WatchStream<Vec<Reservation>> {
        let stream = WatchStream::new(self.sender.subscribe());
        self.send_reservations();
        stream
    }

    fn create_reservation(
        &self,
        user_id: Uuid,
        booking: ProposedBooking,
    ) -> Result<Reservation, StoreError> {
        let court = self.court(booking.court_id)?;
        if !court.is_active {
            return Err(StoreError::CourtInactive);
        }
        if booking.players_count > court.max_players {
            return Err(StoreError::TooManyPlayers {
                max: court.max_players,
            });
        }
        Self::ensure_not_in_past(&booking.interval)?;

        let reservation = {
            let mut reservations = lock(&self.reservations);
            let same_court = reservations
                .values()
                .filter(|reservation| reservation.court_id == court.id);
            if !is_range_available(&booking.interval, same_court) {
                warn!(
                    court_id = %court.id,
                    interval = ?booking.interval,
                    "Court is not available for the selected time"
                );
                return Err(StoreError::SlotTaken);
            }

            let reservation = Reservation {
                id: Uuid::new_v4(),
                court_id: court.id,
                user_id,
                players_count: booking.players_count,
                additional_info: booking.additional_info,
                status: ReservationStatus::Pending,
                interval: booking.interval,
            };
            reservations.insert(reservation.id, reservation.clone());
            reservation
        };
        info!(id = %reservation.id, court_id = %court.id, "Reservation created");
        self.send_reservations();
        Ok(reservation)
    }

    fn update_reservation_interval(
        &self,
        id: Uuid,
        interval: TimeInterval,
    ) -> Result<Reservation, StoreError> {
        Self::ensure_not_in_past(&interval)?;

        let updated = {
            let mut reservations = lock(&self.reservations);
            let (court_id, status) = reservations
                .get(&id)
                .map(|reservation| (reservation.court_id, reservation.status))
                .ok_or(StoreError::ReservationNotFound(id))?;
            if !status.is_active() {
                return Err(StoreError::ReservationCanceled);
            }

            let same_court = reservations
                .values()
                .filter(|reservation| reservation.court_id == court_id);
            if !is_range_available_excluding(&interval, same_court, id) {
                warn!(%id, ?interval, "Court is not available for the selected time");
                return Err(StoreError::SlotTaken);
            }

            let reservation = reservations
                .get_mut(&id)
                .ok_or(StoreError::ReservationNotFound(id))?;
            reservation.interval = interval;
            reservation.clone()
        };
        info!(%id, "Reservation moved");
        self.send_reservations();
        Ok(updated)
    }

    fn confirm_reservation(&self, id: Uuid) -> Result<Reservation, StoreError> {
        self.set_status(id, ReservationStatus::Confirmed)
    }

    fn cancel_reservation(&self, id: Uuid) -> Result<Reservation, StoreError> {
        self.set_status(id, ReservationStatus::Canceled)
    }
}
