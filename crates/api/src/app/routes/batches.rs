use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::task::spawn_blocking;

use certmill_core::BatchId;

use crate::app::services::AppContext;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:id", get(get_batch_status))
}

pub async fn get_batch_status(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let batch_id: BatchId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid batch id")
        }
    };

    let result = spawn_blocking(move || ctx.service.batch(batch_id)).await;
    match result {
        Ok(Ok(Some(batch))) => Json(dto::BatchStatusResponse::from_batch(&batch)).into_response(),
        Ok(Ok(None)) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "batch not found"),
        Ok(Err(err)) => errors::store_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}
