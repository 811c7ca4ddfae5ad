use std::{net::SocketAddr, num::NonZeroU32, time::Duration};

use axum::{
    body::Body,
    extract::{connect_info::MockConnectInfo, ConnectInfo},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use folio_api_rest::{RateLimitConfig, RestServer, RestServerConfig};
use folio_core_contact_contracts::{ContactSendMessageError, MockContactFeatureService};
use folio_models::contact::{ContactSubmission, ContactSubmissionRequest};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

const ORIGIN: &str = "https://portfolio.example.com";

#[tokio::test]
async fn health() {
    // Arrange
    let router = make_router(MockContactFeatureService::new(), config());

    // Act
    let response = router.oneshot(get("/api/health")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
    assert_eq!(
        response.headers()["strict-transport-security"],
        "max-age=15552000; includeSubDomains"
    );
    assert_eq!(body(response).await, json!({"ok": true}));
}

#[tokio::test]
async fn send_ok() {
    // Arrange
    let contact = MockContactFeatureService::new()
        .with_send_message(contact_request("Al", "a@b.com", "Hi"), Ok(()));
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["ratelimit-limit"], "5");
    assert_eq!(response.headers()["ratelimit-remaining"], "4");
    assert_eq!(
        body(response).await,
        json!({"success": true, "message": "Email sent"})
    );
}

#[tokio::test]
async fn send_invalid() {
    // Arrange
    let request = contact_request("A", "a@b.com", "Hi");
    let violations = ContactSubmission::validate(&request).unwrap_err();
    let contact = MockContactFeatureService::new().with_send_message(
        request,
        Err(ContactSendMessageError::Invalid(violations)),
    );
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "A", "email": "a@b.com", "message": "Hi"}),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body(response).await,
        json!({
            "success": false,
            "message": "Invalid input",
            "errors": [{
                "field": "name",
                "message": "Name must be between 2 and 100 characters",
            }],
        })
    );
}

#[tokio::test]
async fn send_not_configured() {
    // Arrange
    let contact = MockContactFeatureService::new().with_send_message(
        contact_request("Al", "a@b.com", "Hi"),
        Err(ContactSendMessageError::NotConfigured("email.api_key")),
    );
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body(response).await,
        json!({"success": false, "message": "Error sending email"})
    );
}

#[tokio::test]
async fn send_failed() {
    // Arrange
    let contact = MockContactFeatureService::new().with_send_message(
        contact_request("Al", "a@b.com", "Hi"),
        Err(ContactSendMessageError::Send(anyhow::anyhow!(
            "status 401: invalid api key"
        ))),
    );
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body(response).await;
    assert_eq!(
        body,
        json!({"success": false, "message": "Error sending email"})
    );
    assert!(!body.to_string().contains("invalid api key"));
}

#[tokio::test]
async fn send_unexpected_error() {
    // Arrange
    let contact = MockContactFeatureService::new().with_send_message(
        contact_request("Al", "a@b.com", "Hi"),
        Err(ContactSendMessageError::Other(anyhow::anyhow!("unexpected"))),
    );
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body(response).await,
        json!({"success": false, "message": "Internal server error"})
    );
}

#[tokio::test]
async fn send_lenient_fields() {
    // Arrange
    let contact = MockContactFeatureService::new()
        .with_send_message(contact_request("12", "", ""), Ok(()));
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": 12, "email": null, "message": {"text": "Hi"}}),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn send_malformed_json() {
    for payload in ["{\"name\": ", "\"text\"", "42"] {
        // Arrange
        let mut contact = MockContactFeatureService::new();
        contact.expect_send_message().never();
        let router = make_router(contact, config());

        // Act
        let response = router
            .oneshot(
                Request::post("/api/send")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await,
            json!({"success": false, "message": "Internal server error"})
        );
    }
}

#[tokio::test]
async fn send_without_content_type() {
    // Arrange
    let request = ContactSubmissionRequest::default();
    let violations = ContactSubmission::validate(&request).unwrap_err();
    let contact = MockContactFeatureService::new().with_send_message(
        request,
        Err(ContactSendMessageError::Invalid(violations)),
    );
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(
            Request::post("/api/send")
                .body(Body::from("name=Al"))
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let fields = body(response).await["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|error| error["field"].as_str().unwrap().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(fields, ["name", "email", "message"]);
}

#[tokio::test]
async fn send_array_body() {
    // Arrange
    let request = ContactSubmissionRequest::default();
    let violations = ContactSubmission::validate(&request).unwrap_err();
    let contact = MockContactFeatureService::new().with_send_message(
        request,
        Err(ContactSendMessageError::Invalid(violations)),
    );
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(json!(["Al", "a@b.com", "Hi"]), None))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body(response).await;
    assert_eq!(body["message"], "Invalid input");
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn handler_panic() {
    // Arrange
    let mut contact = MockContactFeatureService::new();
    contact.expect_send_message().once().returning(|_| {
        Box::pin(async {
            let fail = || -> Result<(), ContactSendMessageError> { panic!("boom") };
            fail()
        })
    });
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        body(response).await,
        json!({"success": false, "message": "Internal server error"})
    );
}

#[tokio::test]
async fn not_found() {
    for request in [
        get("/api/unknown"),
        get("/"),
        get("/api/send"),
        Request::delete("/api/health").body(Body::empty()).unwrap(),
    ] {
        // Arrange
        let router = make_router(MockContactFeatureService::new(), config());

        // Act
        let response = router.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(
            body(response).await,
            json!({"success": false, "message": "Not found"})
        );
    }
}

#[tokio::test]
async fn allowed_origin() {
    // Arrange
    let contact = MockContactFeatureService::new()
        .with_send_message(contact_request("Al", "a@b.com", "Hi"), Ok(()));
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            Some(ORIGIN),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);
}

#[tokio::test]
async fn disallowed_origin() {
    // Arrange
    let mut contact = MockContactFeatureService::new();
    contact.expect_send_message().never();
    let router = make_router(contact, config());

    // Act
    let response = router
        .oneshot(post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            Some("https://evil.example.com"),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!response
        .headers()
        .contains_key("access-control-allow-origin"));
    assert_eq!(
        body(response).await,
        json!({"success": false, "message": "Origin not allowed"})
    );
}

#[tokio::test]
async fn empty_allow_list_rejects_all_origins() {
    // Arrange
    let router = make_router(
        MockContactFeatureService::new(),
        RestServerConfig {
            allowed_origins: Vec::new(),
            ..config()
        },
    );

    // Act
    let response = router
        .oneshot(
            Request::get("/api/health")
                .header(header::ORIGIN, ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn preflight() {
    // Arrange
    let router = make_router(MockContactFeatureService::new(), config());

    // Act
    let response = router
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/send")
                .header(header::ORIGIN, ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);
}

#[tokio::test]
async fn rate_limit() {
    // Arrange
    let mut contact = MockContactFeatureService::new();
    contact
        .expect_send_message()
        .times(3)
        .returning(|_| Box::pin(std::future::ready(Ok(()))));
    let router = make_router(
        contact,
        RestServerConfig {
            rate_limit: RateLimitConfig {
                max_requests: NonZeroU32::new(2).unwrap(),
                window: Duration::from_secs(60),
            },
            ..config()
        },
    );
    let send = |ip: [u8; 4]| {
        let mut request = post_json(
            json!({"name": "Al", "email": "a@b.com", "message": "Hi"}),
            None,
        );
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 4321))));
        router.clone().oneshot(request)
    };

    // Act
    let first = send([10, 0, 0, 1]).await.unwrap();
    let second = send([10, 0, 0, 1]).await.unwrap();
    let third = send([10, 0, 0, 1]).await.unwrap();
    let other_client = send([10, 0, 0, 2]).await.unwrap();
    let health = router.clone().oneshot(get("/api/health")).await.unwrap();

    // Assert
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["ratelimit-remaining"], "0");

    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = third.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse::<u64>()
        .unwrap();
    assert!((1..=60).contains(&retry_after), "{retry_after}");
    assert_eq!(
        third.headers()["ratelimit-reset"],
        third.headers()["retry-after"]
    );
    assert_eq!(third.headers()["ratelimit-remaining"], "0");
    assert!(third.headers().contains_key("x-request-id"));
    assert_eq!(
        body(third).await,
        json!({"success": false, "message": "Too many requests, please try again later."})
    );

    assert_eq!(other_client.status(), StatusCode::OK);
    assert_eq!(health.status(), StatusCode::OK);
}

fn config() -> RestServerConfig {
    RestServerConfig {
        allowed_origins: vec![ORIGIN.into()],
        request_logging: true,
        rate_limit: RateLimitConfig {
            max_requests: NonZeroU32::new(5).unwrap(),
            window: Duration::from_secs(60),
        },
        real_ip: None,
    }
}

fn make_router(contact: MockContactFeatureService, config: RestServerConfig) -> Router<()> {
    RestServer::new(contact, config)
        .router()
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 1234))))
}

fn contact_request(name: &str, email: &str, message: &str) -> ContactSubmissionRequest {
    ContactSubmissionRequest {
        name: name.into(),
        email: email.into(),
        message: message.into(),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(body: Value, origin: Option<&str>) -> Request<Body> {
    let mut request = Request::post("/api/send").header(header::CONTENT_TYPE, "application/json");
    if let Some(origin) = origin {
        request = request.header(header::ORIGIN, origin);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

async fn body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
