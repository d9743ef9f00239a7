#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the fleet map application.
//!
//! Serves the heatmap REST API for the map frontend: demand-gap,
//! low-battery, net-inflow, and pickups layers, each computed per
//! request over a snapshot-backed [`fleet_map_store::FleetStore`].
//! Aggregations are request-scoped and share no mutable state, so
//! concurrent requests never interact.
//!
//! The binary reads the fleet snapshot named by `FLEET_SNAPSHOT`
//! (default `data/fleet.json`; a small example ships at the workspace
//! root) and refuses to start without one.

mod handlers;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use fleet_map_store::{FleetStore, InMemoryFleetStore};

/// Shared application state.
pub struct AppState {
    /// Fleet data access for heatmap aggregations.
    pub store: Arc<dyn FleetStore>,
}

/// Starts the fleet map API server.
///
/// Loads the fleet snapshot named by `FLEET_SNAPSHOT` (default
/// `data/fleet.json`) and starts the Actix-Web HTTP server. This is a
/// regular async function — the caller is responsible for providing
/// the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind
/// or encounters a runtime error.
///
/// # Panics
///
/// Panics if the fleet snapshot cannot be loaded.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let snapshot_path =
        std::env::var("FLEET_SNAPSHOT").unwrap_or_else(|_| "data/fleet.json".to_string());
    log::info!("Loading fleet snapshot from {snapshot_path}...");
    let store = InMemoryFleetStore::from_json_file(Path::new(&snapshot_path))
        .expect("Failed to load fleet snapshot");

    let state = web::Data::new(AppState {
        store: Arc::new(store),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/heatmap/demand-gap", web::get().to(handlers::demand_gap))
                    .route("/heatmap/low-battery", web::get().to(handlers::low_battery))
                    .route("/heatmap/net-inflow", web::get().to(handlers::net_inflow))
                    .route("/heatmap/pickups", web::get().to(handlers::pickups)),
            )
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
