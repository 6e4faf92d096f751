mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TestApp, app_with, get, json_request, with_cookies};
use cryptodash::LockoutConfig;
use cryptodash_axum::CsrfConfig;
use serde_json::json;

async fn app() -> TestApp {
    app_with(LockoutConfig::default(), CsrfConfig::disabled()).await
}

fn authed(request: Request<Body>, session: &str) -> Request<Body> {
    with_cookies(request, &[("sessionid", session)])
}

async fn seed_prices(app: &TestApp, rows: &[(&str, &str, f64)]) {
    for (symbol, ts, close) in rows {
        sqlx::query(
            "INSERT INTO prices (symbol, ts_readable, open, high, low, close, volume) VALUES (?1, ?2, ?3, ?3, ?3, ?3, 10.0)",
        )
        .bind(symbol)
        .bind(ts)
        .bind(close)
        .execute(app.dash.repositories().pool())
        .await
        .expect("Failed to seed prices");
    }
}

#[tokio::test]
async fn test_index_and_health() {
    let app = app().await;

    let response = app.send(get("/")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(
        response.body["endpoints"]["candles"],
        "http://testserver/candles/<symbol>/"
    );

    let response = app.send(get("/health/")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["table_exists"], true);
}

#[tokio::test]
async fn test_alert_crud() {
    let app = app().await;
    let session = app.register("alice").await;
    let other = app.register("bob").await;

    let response = app
        .send(authed(
            json_request(
                "POST",
                "/alerts/",
                json!({
                    "crypto": "Bitcoin",
                    "symbol": "BTC",
                    "condition": "above",
                    "price": "65000.456",
                }),
            ),
            &session,
        ))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["price"], 65000.46);
    assert_eq!(response.body["active"], true);
    let id = response.body["id"].as_i64().unwrap();
    let path = format!("/alerts/{id}/");

    let response = app
        .send(authed(
            json_request("PUT", &path, json!({ "condition": "below" })),
            &session,
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["condition"], "below");
    assert_eq!(response.body["symbol"], "BTC");

    let response = app.send(authed(get("/alerts/"), &session)).await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);

    let response = app.send(authed(get(&path), &other)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], format!("Alert with ID {id} not found"));

    let response = app
        .send(authed(json_request("DELETE", &path, json!({})), &session))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.send(authed(get(&path), &session)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_alert() {
    let app = app().await;
    let session = app.register("carol").await;

    let response = app
        .send(authed(
            json_request(
                "POST",
                "/alerts/",
                json!({ "crypto": "Bitcoin", "condition": "above", "price": 1 }),
            ),
            &session,
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(
        response.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid alert data: ")
    );
}

#[tokio::test]
async fn test_watchlist() {
    let app = app().await;
    let session = app.register("dave").await;

    for symbol in [" btc ", "eth", "BTC"] {
        let response = app
            .send(authed(
                json_request("POST", "/watchlist/add/", json!({ "symbol": symbol })),
                &session,
            ))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["ok"], true);
    }

    let response = app.send(authed(get("/watchlist/"), &session)).await;
    assert_eq!(response.body["symbols"], json!(["ETH", "BTC"]));

    let response = app
        .send(authed(
            json_request("POST", "/watchlist/remove/", json!({ "symbol": "btc" })),
            &session,
        ))
        .await;
    assert_eq!(response.body, json!({ "ok": true, "symbol": "BTC", "deleted": 1 }));

    let response = app
        .send(authed(
            json_request("POST", "/watchlist/add/", json!({ "symbol": "  " })),
            &session,
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_market_endpoints() {
    let app = app().await;
    seed_prices(
        &app,
        &[
            ("BTC", "2024-01-01 00:00:00", 42000.0),
            ("BTC", "2024-01-02 00:00:00", 43000.0),
            ("ETH", "2024-01-02 00:00:00", 2300.0),
        ],
    )
    .await;

    let response = app.send(get("/exchanges/")).await;
    assert_eq!(response.body["results"].as_array().unwrap().len(), 2);

    let response = app.send(get("/tickers/?base=btc")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 1);
    assert_eq!(response.body["results"][0]["last"], 43000.0);

    let response = app.send(get("/tickers/?base=doge")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Symbol DOGE not found");

    let response = app.send(get("/candles/btc/?limit=abc")).await;
    assert_eq!(response.body["count"], 2);

    let response = app.send(get("/summary/")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["exchanges"], 2);
}

#[tokio::test]
async fn test_error_reports() {
    let app = app().await;
    let session = app.register("erin").await;

    let report = json!({ "type": "network", "endpoint": "/tickers/", "message": "timeout" });
    for _ in 0..2 {
        let response = app
            .send(json_request("POST", "/errors/", report.clone()))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app
        .send(json_request("POST", "/errors/", json!({ "type": "network" })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .send(authed(get("/errors/?type=network"), &session))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let groups = response.body.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["count"], 2);
}

#[tokio::test]
async fn test_profile_and_avatar() {
    let app = app().await;
    let session = app.register("frank").await;

    let response = app
        .send(authed(
            json_request("PUT", "/profile/me/", json!({ "first_name": "Frank" })),
            &session,
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["first_name"], "Frank");

    let boundary = "cryptodash-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\nContent-Type: image/png\r\n\r\nnot-really-a-png\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/profile/upload-avatar/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.send(authed(request, &session)).await;
    assert_eq!(response.status, StatusCode::OK);
    let url = response.body["avatar_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("http://testserver/media/avatars/"));
    assert!(url.ends_with(".png"));

    let relative = url.trim_start_matches("http://testserver/media/");
    assert!(app.media.path().join(relative).exists());

    let response = app.send(get(&format!("/media/{relative}"))).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.send(authed(get("/profile/me/"), &session)).await;
    assert_eq!(response.body["avatar_url"], url.as_str());
}

#[tokio::test]
async fn test_avatar_upload_without_file() {
    let app = app().await;
    let session = app.register("grace").await;

    let boundary = "cryptodash-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/profile/upload-avatar/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.send(authed(request, &session)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analysis_parameters() {
    let app = app().await;

    let response = app.send(get("/predict/lstm/btc/?lookback=ten")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .send(get("/technical-analysis/btc/?timeframe=1h"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["error"],
        "Invalid timeframe. Must be 1d, 1w, or 1m"
    );

    let response = app
        .send(json_request("POST", "/analysis/btc/", json!({})))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_send_alert_email_validation() {
    let app = app().await;

    let response = app
        .send(json_request(
            "POST",
            "/send-alert-email/",
            json!({ "email": "a@example.com", "crypto": "Bitcoin" }),
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Missing required fields");
}
