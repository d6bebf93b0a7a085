use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::task::spawn_blocking;

use certmill_core::{CertificateId, EmailTemplateId, TemplateId};
use certmill_domain::CertificateStatus;
use certmill_infra::service::{BulkGenerateRequest, GenerateRequest};

use crate::app::services::AppContext;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/bulk", post(bulk_generate))
        .route("/:id", get(get_certificate))
        .route("/:id/download", get(download_certificate))
}

fn parse_email_template_id(
    raw: Option<String>,
) -> Result<Option<EmailTemplateId>, axum::response::Response> {
    match raw {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid email_template_id")
        }),
    }
}

pub async fn generate(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(body): Json<dto::GenerateCertificateRequest>,
) -> axum::response::Response {
    let template_id: TemplateId = match body.template_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid template_id")
        }
    };
    let email_template_id = match parse_email_template_id(body.email_template_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let request = GenerateRequest {
        template_id,
        recipient: body.recipient.into_input(),
        send_email: body.send_email,
        email_template_id,
    };

    let result = spawn_blocking(move || ctx.service.generate(request)).await;
    match result {
        Ok(Ok(certificate)) => (
            StatusCode::ACCEPTED,
            Json(dto::CertificateResponse::accepted(&certificate)),
        )
            .into_response(),
        Ok(Err(err)) => errors::submit_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}

pub async fn bulk_generate(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(body): Json<dto::BulkGenerateRequest>,
) -> axum::response::Response {
    let template_id: TemplateId = match body.template_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid template_id")
        }
    };
    let email_template_id = match parse_email_template_id(body.email_template_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let request = BulkGenerateRequest {
        template_id,
        recipients: body.recipients.into_iter().map(|r| r.into_input()).collect(),
        send_email: body.send_email,
        email_template_id,
    };

    let result = spawn_blocking(move || ctx.service.bulk_generate(request)).await;
    match result {
        Ok(Ok(batch)) => (
            StatusCode::ACCEPTED,
            Json(dto::BatchStatusResponse::from_batch(&batch)),
        )
            .into_response(),
        Ok(Err(err)) => errors::submit_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}

pub async fn get_certificate(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let certificate_id: CertificateId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid certificate id")
        }
    };

    let result = spawn_blocking(move || ctx.service.certificate(certificate_id)).await;
    match result {
        Ok(Ok(Some(certificate))) => Json(dto::CertificateResponse::with_download_url(&certificate))
            .into_response(),
        Ok(Ok(None)) => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", "certificate not found")
        }
        Ok(Err(err)) => errors::store_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}

pub async fn download_certificate(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let certificate_id: CertificateId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid certificate id")
        }
    };

    let lookup_ctx = ctx.clone();
    let certificate = match spawn_blocking(move || lookup_ctx.service.certificate(certificate_id)).await
    {
        Ok(Ok(Some(certificate))) => certificate,
        Ok(Ok(None)) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "certificate not found")
        }
        Ok(Err(err)) => return errors::store_error_to_response(err),
        Err(_) => return errors::join_error(),
    };

    if certificate.status != CertificateStatus::Completed {
        return errors::json_error(StatusCode::BAD_REQUEST, "not_ready", "certificate not ready");
    }

    let path = certificate.file_path.clone();
    let data = match spawn_blocking(move || ctx.artifacts.load(&path)).await {
        Ok(Ok(data)) => data,
        Ok(Err(err)) => return errors::storage_error_to_response(err),
        Err(_) => return errors::join_error(),
    };

    ([(header::CONTENT_TYPE, "application/pdf")], data).into_response()
}
