use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use comms::{
    TensorSet,
    specs::rendezvous::{RoundStatus, SyncRequest, SyncResponse},
};
use log::{debug, error};

use crate::{RendezvousErr, RoundBarrier};

/// Creates the HTTP surface of the rendezvous service over `barrier`.
///
/// Gradient bodies grow with the model, so the default body limit is lifted.
pub fn router(barrier: Arc<RoundBarrier>) -> Router {
    Router::new()
        .route("/sync", post(sync))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::disable())
        .with_state(barrier)
}

async fn sync(
    State(barrier): State<Arc<RoundBarrier>>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, RendezvousErr> {
    debug!(bytes = req.grads.len(); "sync request");
    let grads = TensorSet::from_hex(&req.grads)?;

    let mean = tokio::task::spawn_blocking(move || barrier.sync(grads))
        .await
        .map_err(|e| RendezvousErr::Join(e.to_string()))??;

    Ok(Json(SyncResponse {
        new_grads: mean.to_hex(),
    }))
}

async fn status(State(barrier): State<Arc<RoundBarrier>>) -> Json<RoundStatus> {
    Json(barrier.status())
}

impl IntoResponse for RendezvousErr {
    fn into_response(self) -> Response {
        let status = match &self {
            RendezvousErr::Codec(_) => StatusCode::BAD_REQUEST,
            RendezvousErr::LayoutMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RendezvousErr::RoundTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            RendezvousErr::RoundAborted { .. } => StatusCode::CONFLICT,
            RendezvousErr::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!(status = status.as_u16(); "sync failed: {self}");
        (status, self.to_string()).into_response()
    }
}
