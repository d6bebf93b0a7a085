use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::task::spawn_blocking;

use certmill_core::TemplateId;
use certmill_domain::{EmailTemplate, Template};

use crate::app::services::AppContext;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_template).get(list_templates))
        .route("/:id", get(get_template))
}

pub fn email_router() -> Router {
    Router::new().route("/", post(create_email_template).get(list_email_templates))
}

pub async fn create_template(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(body): Json<dto::CreateTemplateRequest>,
) -> axum::response::Response {
    if body.name.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "name is required");
    }

    let template = Template::new(body.name, body.description, body.config);
    let stored = template.clone();
    let result = spawn_blocking(move || ctx.store.insert_template(&stored)).await;
    match result {
        Ok(Ok(())) => (
            StatusCode::CREATED,
            Json(dto::TemplateResponse::from_template(&template)),
        )
            .into_response(),
        Ok(Err(err)) => errors::store_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}

pub async fn list_templates(
    Extension(ctx): Extension<Arc<AppContext>>,
) -> axum::response::Response {
    let result = spawn_blocking(move || ctx.store.list_templates()).await;
    match result {
        Ok(Ok(templates)) => Json(
            templates
                .iter()
                .map(dto::TemplateResponse::from_template)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Ok(Err(err)) => errors::store_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}

pub async fn get_template(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let template_id: TemplateId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid template id")
        }
    };

    let result = spawn_blocking(move || ctx.store.template(template_id)).await;
    match result {
        Ok(Ok(Some(template))) => {
            Json(dto::TemplateResponse::from_template(&template)).into_response()
        }
        Ok(Ok(None)) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "template not found"),
        Ok(Err(err)) => errors::store_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}

pub async fn create_email_template(
    Extension(ctx): Extension<Arc<AppContext>>,
    Json(body): Json<dto::CreateEmailTemplateRequest>,
) -> axum::response::Response {
    if body.name.is_empty() || body.subject.is_empty() || body.body_html.is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "name, subject and body_html are required",
        );
    }

    let mut template = EmailTemplate::new(body.name, body.subject, body.body_html);
    template.body_text = body.body_text;

    let stored = template.clone();
    let result = spawn_blocking(move || ctx.store.insert_email_template(&stored)).await;
    match result {
        Ok(Ok(())) => (
            StatusCode::CREATED,
            Json(dto::EmailTemplateResponse::from_template(&template)),
        )
            .into_response(),
        Ok(Err(err)) => errors::store_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}

pub async fn list_email_templates(
    Extension(ctx): Extension<Arc<AppContext>>,
) -> axum::response::Response {
    let result = spawn_blocking(move || ctx.store.list_email_templates()).await;
    match result {
        Ok(Ok(templates)) => Json(
            templates
                .iter()
                .map(dto::EmailTemplateResponse::from_template)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Ok(Err(err)) => errors::store_error_to_response(err),
        Err(_) => errors::join_error(),
    }
}
