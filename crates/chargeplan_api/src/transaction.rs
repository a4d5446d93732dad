use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chargeplan_engine::{MeterValues, OptimizerTransport};

use crate::app_state::AppState;
use crate::site::{engine_error_to_response, error_response};

/// Records the latest meter values of a running session
pub async fn update_meter_values<T: OptimizerTransport + 'static>(
    State(state): State<AppState<T>>,
    Path(transaction_id): Path<i64>,
    Json(values): Json<MeterValues>,
) -> Response {
    match state.store().update_meter_values(transaction_id, &values) {
        Ok(Some(transaction)) => (StatusCode::OK, Json(transaction)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Transaction {} not found", transaction_id),
        ),
        Err(error) => engine_error_to_response(error),
    }
}
