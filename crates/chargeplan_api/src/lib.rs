//! HTTP service driving smart charging cycles of the sites held in memory.

mod app_state;
mod config;
mod site;
mod transaction;

pub use crate::app_state::AppState;
pub use crate::config::{ServerSettings, Settings, SiteSnapshot, StationConfigurationEntry};
pub use crate::site::{ErrorResponse, ProfilesResponse};

use axum::{
    Router,
    routing::{get, post},
};
use chargeplan_engine::OptimizerTransport;
use tower_http::trace::TraceLayer;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the application router with all endpoints
pub fn create_app<T: OptimizerTransport + 'static>(state: AppState<T>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/sites/{site_id}/smart-charging",
            post(site::run_smart_charging::<T>),
        )
        .route(
            "/sites/{site_id}/charging-profiles",
            get(site::get_charging_profiles::<T>),
        )
        .route(
            "/transactions/{transaction_id}/meter-values",
            post(transaction::update_meter_values::<T>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
