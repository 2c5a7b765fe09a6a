use crate::{
    error::StoreError,
    types::{Court, ProposedBooking, Reservation, TimeInterval},
};
#[cfg(test)]
use mockall::automock;
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

/// Authoritative reservation storage.
///
/// Implementations must re-check availability atomically when creating or
/// moving a reservation and answer with [`StoreError::SlotTaken`] on conflict.
#[cfg_attr(test, automock)]
pub trait ReservationStore: Send + Sync + 'static {
    fn courts(&self) -> Vec<Court>;
    fn court(&self, court_id: Uuid) -> Result<Court, StoreError>;
    fn court_reservations(&self, court_id: Uuid) -> Result<Vec<Reservation>, StoreError>;
    fn reservation(&self, id: Uuid) -> Result<Reservation, StoreError>;
    fn user_reservations(&self, user_id: Uuid) -> Vec<Reservation>;
    fn reservation_stream(&self) -> WatchStream<Vec<Reservation>>;
    fn create_reservation(
        &self,
        user_id: Uuid,
        booking: ProposedBooking,
    ) -> Result<Reservation, StoreError>;
    fn update_reservation_interval(
        &self,
        id: Uuid,
        interval: TimeInterval,
    ) -> Result<Reservation, StoreError>;
    fn confirm_reservation(&self, id: Uuid) -> Result<Reservation, StoreError>;
    fn cancel_reservation(&self, id: Uuid) -> Result<Reservation, StoreError>;
}
