use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, Next},
    response::Response,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, warn};

use crate::errors::error;

/// Adds CORS headers for `allowed_origins` and rejects requests from any other
/// origin with `403`.
///
/// Requests without an `Origin` header are not affected. An empty allow-list
/// rejects all cross origin requests.
pub fn add<S: Clone + Send + Sync + 'static>(
    allowed_origins: &[String],
) -> impl FnOnce(Router<S>) -> Router<S> {
    let allowed_origins = allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!(%origin, "ignoring invalid allowed origin"))
                .ok()
        })
        .collect::<Arc<[_]>>();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    move |router| {
        router
            .layer(cors)
            .layer(from_fn(move |request: Request, next: Next| {
                let allowed_origins = Arc::clone(&allowed_origins);
                async move { guard(&allowed_origins, request, next).await }
            }))
    }
}

async fn guard(allowed_origins: &[HeaderValue], request: Request, next: Next) -> Response {
    match request.headers().get(header::ORIGIN) {
        Some(origin) if !allowed_origins.contains(origin) => {
            debug!(?origin, "rejecting request from disallowed origin");
            error(StatusCode::FORBIDDEN, "Origin not allowed")
        }
        _ => next.run(request).await,
    }
}
