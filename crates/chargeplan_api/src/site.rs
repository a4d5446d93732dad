use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chargeplan_core::ConnectorChargingProfile;
use chargeplan_engine::{EngineError, EngineErrorKind, OptimizerTransport, SiteRepository};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesResponse {
    pub site_id: String,
    pub profiles: Vec<ConnectorChargingProfile>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

pub(crate) fn engine_error_to_response(error: EngineError) -> Response {
    let status = match error.kind() {
        EngineErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        EngineErrorKind::NotFound => StatusCode::NOT_FOUND,
        EngineErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        EngineErrorKind::Configuration | EngineErrorKind::Storage => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        tracing::error!("Smart charging failed: {}", error);
    } else {
        tracing::warn!("Smart charging rejected: {}", error);
    }
    error_response(status, error.to_string())
}

/// Runs a smart charging cycle for the site and stores the resulting profiles
pub async fn run_smart_charging<T: OptimizerTransport + 'static>(
    State(state): State<AppState<T>>,
    Path(site_id): Path<String>,
) -> Response {
    let site = match state.store().site(&site_id) {
        Ok(Some(site)) => site,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("Site {} not found", site_id));
        }
        Err(error) => return engine_error_to_response(error),
    };
    let profiles = match state.cycle().compute_profiles(site).await {
        Ok(profiles) => profiles,
        Err(error) => return engine_error_to_response(error),
    };
    if let Err(error) = state.store().save_charging_profiles(&site_id, &profiles).await {
        return engine_error_to_response(error);
    }
    (StatusCode::OK, Json(ProfilesResponse { site_id, profiles })).into_response()
}

/// Profiles issued by the last cycle of the site
pub async fn get_charging_profiles<T: OptimizerTransport + 'static>(
    State(state): State<AppState<T>>,
    Path(site_id): Path<String>,
) -> Response {
    match state.store().site(&site_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("Site {} not found", site_id));
        }
        Err(error) => return engine_error_to_response(error),
    }
    match state.store().charging_profiles(&site_id).await {
        Ok(profiles) => (StatusCode::OK, Json(ProfilesResponse { site_id, profiles })).into_response(),
        Err(error) => engine_error_to_response(error),
    }
}
