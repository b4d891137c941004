//! Request handlers and routing.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use std::sync::Arc;
use tracing::debug;

use crate::contact::{ContactForm, ContactService, OutcomeKind, SubmissionOutcome};
use crate::ratelimit::Clock;

/// Build the application router.
pub fn router<C: Clock + 'static>(service: Arc<ContactService<C>>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/contact", post(submit_contact::<C>))
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

async fn submit_contact<C: Clock + 'static>(
    State(service): State<Arc<ContactService<C>>>,
    headers: HeaderMap,
    Form(form): Form<ContactForm>,
) -> Response {
    let outcome = service.submit(&headers, form).await;
    debug!(kind = ?outcome.kind, "Contact request handled");
    outcome_response(outcome)
}

fn outcome_response(outcome: SubmissionOutcome) -> Response {
    let status = match outcome.kind {
        OutcomeKind::Sent => StatusCode::OK,
        OutcomeKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        OutcomeKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        OutcomeKind::DeliveryFailed => StatusCode::BAD_GATEWAY,
    };

    if outcome.kind == OutcomeKind::RateLimited {
        let retry_after = outcome.wait_time_ms.div_ceil(1000).to_string();
        return (status, [(header::RETRY_AFTER, retry_after)], Json(outcome)).into_response();
    }

    (status, Json(outcome)).into_response()
}
