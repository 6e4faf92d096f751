mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{
    PASSWORD, app, app_with, app_with_session, get, json_request, with_cookies, with_header,
};
use cryptodash::{LockoutConfig, SessionConfig};
use cryptodash_axum::CsrfConfig;
use serde_json::json;

fn login(username: &str, password: &str, ip: &str) -> axum::http::Request<axum::body::Body> {
    with_header(
        json_request(
            "POST",
            "/auth/login/",
            json!({ "username": username, "password": password }),
        ),
        "x-forwarded-for",
        ip,
    )
}

#[tokio::test]
async fn test_register_and_login() {
    let app = app().await;
    app.register("alice").await;

    let response = app.send(login("alice", PASSWORD, "10.0.0.1")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["message"], "Login successful.");
    assert_eq!(response.body["user"]["username"], "alice");
    assert_eq!(response.body["user"]["email"], "alice@example.com");

    let set_cookie = response.set_cookie_header("sessionid").unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=1800"));
}

#[tokio::test]
async fn test_register_validation() {
    let app = app().await;

    let response = app
        .send(json_request(
            "POST",
            "/auth/register/",
            json!({ "username": "bob", "password": "short12" }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "validation_error");

    app.register("bob").await;
    let response = app
        .send(json_request(
            "POST",
            "/auth/register/",
            json!({ "username": "bob", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "conflict");
}

#[tokio::test]
async fn test_lockout_bodies() {
    let app = app().await;
    app.register("carol").await;

    for expected in [4, 3, 2, 1] {
        let response = app.send(login("carol", "wrong-password", "10.0.0.2")).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["remaining_attempts"], expected);
    }

    let response = app.send(login("carol", "wrong-password", "10.0.0.2")).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["locked"], true);
    assert_eq!(response.body["remaining_time_seconds"], 900);

    // Locked even with the right password, but only from that address.
    let response = app.send(login("carol", PASSWORD, "10.0.0.2")).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body["remaining_time"].as_u64().unwrap() <= 900);

    let response = app.send(login("carol", PASSWORD, "10.0.0.3")).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_credentials() {
    let app = app().await;
    let response = app
        .send(json_request("POST", "/auth/login/", json!({ "username": "dave" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Username and password are required.");
}

#[tokio::test]
async fn test_session_probe_and_logout() {
    let app = app().await;

    let response = app.send(get("/auth/session/")).await;
    assert_eq!(response.body, json!({ "authenticated": false }));

    let session = app.register("erin").await;
    let response = app
        .send(with_cookies(get("/auth/session/"), &[("sessionid", session.as_str())]))
        .await;
    assert_eq!(response.body["authenticated"], true);
    assert_eq!(response.body["user"]["username"], "erin");

    let csrf = app.send(get("/auth/csrf/")).await;
    let token = csrf.body["csrfToken"].as_str().unwrap().to_string();

    let request = with_header(
        with_cookies(
            json_request("POST", "/auth/logout/", json!({})),
            &[("sessionid", session.as_str()), ("csrftoken", token.as_str())],
        ),
        "x-csrftoken",
        &token,
    );
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Logout successful.");

    let response = app
        .send(with_cookies(get("/auth/session/"), &[("sessionid", session.as_str())]))
        .await;
    assert_eq!(response.body["authenticated"], false);

    // No session left to end.
    let response = app
        .send(json_request("POST", "/auth/logout/", json!({})))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "no_active_session");
}

#[tokio::test]
async fn test_csrf_cookie() {
    let app = app().await;

    let response = app.send(get("/auth/csrf/")).await;
    assert_eq!(response.status, StatusCode::OK);
    let token = response.body["csrfToken"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    let set_cookie = response.set_cookie_header("csrftoken").unwrap();
    assert!(set_cookie.contains("Max-Age=31449600"));
    assert!(!set_cookie.contains("HttpOnly"));

    // An existing token is handed back unchanged.
    let response = app
        .send(with_cookies(get("/auth/csrf/"), &[("csrftoken", token.as_str())]))
        .await;
    assert_eq!(response.body["csrfToken"], token.as_str());
}

#[tokio::test]
async fn test_csrf_required_for_session_writes() {
    let app = app().await;
    let session = app.register("frank").await;
    let alert = json!({
        "crypto": "Bitcoin",
        "symbol": "BTC",
        "condition": "above",
        "price": 70000,
    });

    let request = with_cookies(
        json_request("POST", "/alerts/", alert.clone()),
        &[("sessionid", session.as_str())],
    );
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body["error"],
        "CSRF Failed: CSRF token missing or incorrect."
    );

    let request = with_header(
        with_cookies(
            json_request("POST", "/alerts/", alert.clone()),
            &[("sessionid", session.as_str()), ("csrftoken", "cookie-token")],
        ),
        "x-csrftoken",
        "other-token",
    );
    assert_eq!(app.send(request).await.status, StatusCode::FORBIDDEN);

    let request = with_header(
        with_cookies(
            json_request("POST", "/alerts/", alert),
            &[("sessionid", session.as_str()), ("csrftoken", "cookie-token")],
        ),
        "x-csrftoken",
        "cookie-token",
    );
    assert_eq!(app.send(request).await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_protected_routes_need_a_session() {
    let app = app().await;

    let response = app.send(get("/profile/me/")).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.body["error"],
        "Authentication credentials were not provided."
    );

    let response = app
        .send(with_cookies(get("/alerts/"), &[("sessionid", "stale-token")]))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.send(get("/errors/")).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_activity_refreshes_session_cookie() {
    let app = app().await;
    let session = app.register("gina").await;

    let response = app
        .send(with_cookies(get("/auth/session/"), &[("sessionid", session.as_str())]))
        .await;
    assert_eq!(response.body["authenticated"], true);
    let set_cookie = response.set_cookie_header("sessionid").unwrap();
    assert!(set_cookie.starts_with(&format!("sessionid={session};")));
    assert!(set_cookie.contains("Max-Age=1800"));
    assert!(set_cookie.contains("HttpOnly"));

    let response = app.send(get("/auth/session/")).await;
    assert_eq!(response.set_cookie_count("sessionid"), 0);

    let response = app
        .send(with_cookies(get("/auth/session/"), &[("sessionid", "stale-token")]))
        .await;
    assert_eq!(response.set_cookie_count("sessionid"), 0);
}

#[tokio::test]
async fn test_logout_only_clears_the_cookie() {
    let app = app_with(LockoutConfig::default(), CsrfConfig::disabled()).await;
    let session = app.register("hank").await;

    let response = app
        .send(with_cookies(
            json_request("POST", "/auth/logout/", json!({})),
            &[("sessionid", session.as_str())],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.set_cookie_count("sessionid"), 1);
    assert!(response.cookie("sessionid").unwrap().is_empty());
}

#[tokio::test]
async fn test_idle_session_reads_as_anonymous() {
    let app = app_with_session(SessionConfig {
        lifetime: chrono::Duration::seconds(1),
    })
    .await;
    let session = app.register("iris").await;
    let probe = || with_cookies(get("/auth/session/"), &[("sessionid", session.as_str())]);

    assert_eq!(app.send(probe()).await.body["authenticated"], true);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let response = app.send(probe()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "authenticated": false }));
    assert_eq!(response.set_cookie_count("sessionid"), 0);
}

#[tokio::test]
async fn test_login_rotates_existing_session() {
    let app = app_with(LockoutConfig::default(), CsrfConfig::disabled()).await;
    let first = app.register("jack").await;

    let response = app
        .send(with_cookies(
            login("jack", PASSWORD, "10.0.0.4"),
            &[("sessionid", first.as_str())],
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.set_cookie_count("sessionid"), 1);
    let second = response.cookie("sessionid").unwrap();
    assert_ne!(first, second);

    let response = app
        .send(with_cookies(get("/auth/session/"), &[("sessionid", first.as_str())]))
        .await;
    assert_eq!(response.body["authenticated"], false);

    let response = app
        .send(with_cookies(get("/auth/session/"), &[("sessionid", second.as_str())]))
        .await;
    assert_eq!(response.body["authenticated"], true);
}
