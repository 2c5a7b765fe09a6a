use crate::{
    backend::ReservationStore, configuration::Configuration,
    configuration_handler::ConfigurationHandler, http::create_app,
    local_reservations::LocalReservations,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod availability;
mod backend;
mod booking;
mod configuration;
mod configuration_handler;
mod error;
mod http;
mod local_reservations;
mod types;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        // A missing .env file is fine, everything can come from arguments.
        if !err.not_found() {
            eprintln!("Failed to load .env file: {err}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("#################");
    println!("# Court Booking #");
    println!("#################");

    let configuration = match ConfigurationHandler::parse_arguments() {
        Ok(configuration) => configuration,
        Err(err) => {
            error!(?err, "Invalid slot grid configuration");
            std::process::exit(1);
        }
    };

    let backend = LocalReservations::default();
    if configuration.seed_example_courts() {
        backend.insert_example_courts();
        for court in backend.courts() {
            info!(court_id = %court.id, name = %court.name, "Court available");
        }
    }

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, "Failed to bind {address}");
            std::process::exit(1);
        }
    };
    info!("Accessible at {address}");

    let app = create_app(backend, configuration);
    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server stopped");
    }
}
