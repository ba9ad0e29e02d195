//! Router-level tests for the storefront API.
//!
//! These run the full middleware stack without a database: session-only
//! cart operations, authentication gates, input validation that happens
//! before any query, and the cross-cutting headers.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use hearth_integration_tests::{
    ALLOWED_ORIGIN, body_json, json_request, request, send, test_app,
};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let response = send(request("GET", "/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = send(request("GET", "/api/nope").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Cart (session only)
// =============================================================================

#[tokio::test]
async fn test_new_session_has_empty_cart() {
    let response = send(request("GET", "/api/cart").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["item_count"], json!(0));
}

#[tokio::test]
async fn test_setting_quantity_of_absent_line_is_noop() {
    let response = send(json_request(
        "PUT",
        "/api/cart/items/42",
        &json!({ "quantity": 3 }),
    ))
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_clearing_cart_returns_empty_cart() {
    let response = send(request("DELETE", "/api/cart").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["item_count"], json!(0));
}

// =============================================================================
// Authentication gates
// =============================================================================

#[tokio::test]
async fn test_anonymous_session_is_null() {
    let response = send(
        request("GET", "/api/auth/session")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::Value::Null);
}

#[tokio::test]
async fn test_protected_routes_require_sign_in() {
    let cases = [
        ("GET", "/api/dashboard/stats"),
        ("GET", "/api/dashboard/orders"),
        ("GET", "/api/dashboard/favorites"),
        ("POST", "/api/checkout/payment-intent"),
        ("GET", "/api/checkout/payment-intent/pi_123"),
        ("GET", "/api/admin/stats"),
        ("GET", "/api/admin/users"),
        ("GET", "/api/admin/orders"),
        ("DELETE", "/api/admin/products/1"),
    ];

    for (method, uri) in cases {
        let response = send(request(method, uri).body(Body::empty()).unwrap()).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri}"
        );
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Authentication required" }),
            "{method} {uri}"
        );
    }
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let response = send(
        request("POST", "/api/auth/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// =============================================================================
// Validation before any query
// =============================================================================

#[tokio::test]
async fn test_login_rejects_malformed_email() {
    let response = send(json_request(
        "POST",
        "/api/auth/login",
        &json!({ "email": "not-an-email", "password": "whatever-it-is" }),
    ))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid email address" })
    );
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let response = send(json_request(
        "POST",
        "/api/auth/register",
        &json!({ "email": "maker@hearth.test", "password": "short" }),
    ))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("at least 8"));
}

#[tokio::test]
async fn test_product_listing_rejects_oversized_page() {
    let response = send(
        request("GET", "/api/products?per_page=1000")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_path_parameter_is_json_error() {
    let response = send(json_request(
        "PUT",
        "/api/cart/items/abc",
        &json!({ "quantity": 1 }),
    ))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid path parameter" })
    );
}

#[tokio::test]
async fn test_malformed_json_body_is_json_error() {
    let response = send(
        request("POST", "/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{email: nope"))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Malformed JSON body" })
    );
}

#[tokio::test]
async fn test_body_with_wrong_shape_is_json_error() {
    let response = send(json_request(
        "PUT",
        "/api/cart/items/42",
        &json!({ "quantity": "lots" }),
    ))
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid request body" })
    );
}

#[tokio::test]
async fn test_body_without_json_content_type_is_json_error() {
    let response = send(
        request("POST", "/api/cart/items")
            .body(Body::from(json!({ "product_id": 1 }).to_string()))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Expected a JSON request body" })
    );
}

#[tokio::test]
async fn test_unknown_query_value_is_json_error() {
    let response = send(
        request("GET", "/api/products?sort=bogus")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid query parameters" })
    );
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn test_auth_routes_are_rate_limited_per_client() {
    let app = test_app();
    let login = || {
        json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": "nope", "password": "whatever-it-is" }),
        )
    };

    for _ in 0..5 {
        let response = app.clone().oneshot(login()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app.clone().oneshot(login()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different client has its own bucket.
    let other = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("x-forwarded-for", "198.51.100.20")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "nope", "password": "whatever-it-is" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(other).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Cross-cutting headers
// =============================================================================

#[tokio::test]
async fn test_security_headers_present() {
    let response = send(request("GET", "/api/cart").body(Body::empty()).unwrap()).await;
    let headers = response.headers();

    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    assert!(headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let response = send(
        request("GET", "/health")
            .header("x-request-id", "edge-abc123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.headers().get("x-request-id").unwrap(), "edge-abc123");

    let response = send(request("GET", "/health").body(Body::empty()).unwrap()).await;
    let generated = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin_only() {
    let preflight = |origin: &str| {
        request("OPTIONS", "/api/cart")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, Method::PUT.as_str())
            .body(Body::empty())
            .unwrap()
    };

    let response = send(preflight(ALLOWED_ORIGIN)).await;
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        ALLOWED_ORIGIN
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );

    let response = send(preflight("https://evil.example")).await;
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}
