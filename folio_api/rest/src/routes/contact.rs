use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use folio_core_contact_contracts::{ContactFeatureService, ContactSendMessageError};
use folio_models::contact::ContactSubmissionRequest;
use serde_json::Value;

use crate::{
    errors::{error, internal_server_error, not_found, ApiResponse},
    models::contact::contact_submission_from_json,
};

pub fn router(service: Arc<impl ContactFeatureService>) -> Router<()> {
    Router::new()
        .route(
            "/api/send",
            routing::post(send_message).fallback(not_found),
        )
        .with_state(service)
}

async fn send_message(
    service: State<Arc<impl ContactFeatureService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(value)) => match contact_submission_from_json(value) {
            Ok(request) => request,
            Err(err) => return internal_server_error(err),
        },
        // without a json content type there are no fields to read
        Err(JsonRejection::MissingJsonContentType(_)) => ContactSubmissionRequest::default(),
        Err(err) => return internal_server_error(err),
    };

    match service.send_message(request).await {
        Ok(()) => Json(ApiResponse::ok("Email sent")).into_response(),
        Err(ContactSendMessageError::Invalid(violations)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse {
                success: false,
                message: "Invalid input",
                errors: Some(violations.into_inner()),
            }),
        )
            .into_response(),
        Err(err @ (ContactSendMessageError::NotConfigured(_) | ContactSendMessageError::Send(_))) => {
            tracing::error!("failed to send contact message: {err}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Error sending email")
        }
        Err(ContactSendMessageError::Other(err)) => internal_server_error(err),
    }
}
