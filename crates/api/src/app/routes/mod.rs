use axum::Router;

pub mod batches;
pub mod certificates;
pub mod system;
pub mod templates;

pub fn router() -> Router {
    Router::new()
        .nest("/api/v1/certificates", certificates::router())
        .nest("/api/v1/batches", batches::router())
        .nest("/api/v1/templates", templates::router())
        .nest("/api/v1/email-templates", templates::email_router())
}
