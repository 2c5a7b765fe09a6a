use crate::backend::ReservationStore;
use crate::booking::{BookingWorkflow, DayAvailability};
use crate::configuration::Configuration;
use crate::error::AppError;
use crate::types::{Court, ProposedBooking, Reservation, Session, TimeInterval};
use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

const USER_ID_HEADER: &str = "x-user-id";
const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

#[derive(Clone)]
pub struct AppState<T, C> {
    workflow: BookingWorkflow<T>,
    configuration: C,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookingRequest {
    court_id: Uuid,
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
    players_count: u8,
    #[serde(default)]
    additional_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RescheduleRequest {
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
struct AvailabilityQuery {
    date: NaiveDate,
    start: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or(AppError::MissingUser)?;
        Ok(Session { user_id })
    }
}

pub fn create_app<T, C>(store: T, configuration: C) -> Router
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    let workflow = BookingWorkflow::new(store, configuration.slot_grid());
    let state = AppState {
        workflow,
        configuration,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/courts", get(get_courts::<T, C>))
        .route(
            "/courts/:court_id/reservations",
            get(get_reservations::<T, C>),
        )
        .route(
            "/courts/:court_id/availability",
            get(get_availability::<T, C>),
        )
        .route("/courts/:court_id/events", get(court_events::<T, C>))
        .route(
            "/reservations",
            get(get_own_reservations::<T, C>).post(create_reservation::<T, C>),
        )
        .route("/reservations/:id", put(reschedule_reservation::<T, C>));

    let admin = Router::new()
        .route(
            "/reservations/:id/confirm",
            post(confirm_reservation::<T, C>),
        )
        .route("/reservations/:id/cancel", post(cancel_reservation::<T, C>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<T, C>,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(cors)
}

async fn admin_auth<T, C>(
    State(state): State<AppState<T, C>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    let password = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match password {
        Some(password) if password == state.configuration.password() => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!("Admin request with wrong password");
            Err(AppError::Unauthorized)
        }
        None => Err(AppError::Unauthorized),
    }
}

async fn get_courts<T, C>(State(state): State<AppState<T, C>>) -> Json<Vec<Court>>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    Json(state.workflow.courts())
}

async fn get_own_reservations<T, C>(
    State(state): State<AppState<T, C>>,
    session: Session,
) -> Json<Vec<Reservation>>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    Json(state.workflow.own_reservations(&session))
}

async fn get_reservations<T, C>(
    State(state): State<AppState<T, C>>,
    Path(court_id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    Ok(Json(state.workflow.reservations(court_id)?))
}

async fn get_availability<T, C>(
    State(state): State<AppState<T, C>>,
    Path(court_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<DayAvailability>, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    let start = query
        .start
        .as_deref()
        .map(|start| NaiveTime::parse_from_str(start, "%H:%M"))
        .transpose()
        .map_err(|err| AppError::MalformedQuery(format!("start: {err}")))?;

    Ok(Json(
        state
            .workflow
            .day_availability(court_id, query.date, start)?,
    ))
}

async fn court_events<T, C>(
    State(state): State<AppState<T, C>>,
    Path(court_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    state.workflow.reservations(court_id)?;

    let stream = state
        .workflow
        .store()
        .reservation_stream()
        .map(move |reservations| {
            let court_reservations: Vec<Reservation> = reservations
                .into_iter()
                .filter(|reservation| reservation.court_id == court_id)
                .collect();
            Event::default().json_data(court_reservations)
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn create_reservation<T, C>(
    State(state): State<AppState<T, C>>,
    session: Session,
    Json(request): Json<BookingRequest>,
) -> Result<impl IntoResponse, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    let booking = ProposedBooking {
        court_id: request.court_id,
        interval: TimeInterval::new(request.start_at, request.end_at)?,
        players_count: request.players_count,
        additional_info: request.additional_info,
    };

    let reservation = state.workflow.submit(&session, booking)?;
    info!(id = %reservation.id, user_id = %session.user_id, "Reservation booked");
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn reschedule_reservation<T, C>(
    State(state): State<AppState<T, C>>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Reservation>, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    let interval = TimeInterval::new(request.start_at, request.end_at)?;
    Ok(Json(state.workflow.reschedule(&session, id, interval)?))
}

async fn confirm_reservation<T, C>(
    State(state): State<AppState<T, C>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    Ok(Json(state.workflow.confirm(id)?))
}

async fn cancel_reservation<T, C>(
    State(state): State<AppState<T, C>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError>
where
    T: ReservationStore + Clone,
    C: Configuration,
{
    Ok(Json(state.workflow.cancel(id)?))
}
