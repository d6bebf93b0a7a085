use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use certmill_infra::service::SubmitError;
use certmill_infra::storage::StorageError;
use certmill_infra::store::StoreError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::TemplateNotFound => {
            json_error(StatusCode::NOT_FOUND, "template_not_found", "template not found")
        }
        SubmitError::EmptyBatch => json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "recipients must not be empty",
        ),
        SubmitError::Store(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        SubmitError::Queue(e) => json_error(StatusCode::BAD_GATEWAY, "queue_error", e.to_string()),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn storage_error_to_response(err: StorageError) -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage_error",
        err.to_string(),
    )
}

/// A blocking task panicked or was cancelled.
pub fn join_error() -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "request task failed",
    )
}
