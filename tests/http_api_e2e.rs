mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{date, test_app, API_KEY};
use landbook::application::handlers::router;

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_needs_no_key_but_api_does() {
    let test = test_app(date(2024, 1, 1)).await;
    let app = router(test.state.clone());

    let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send_json(&app, health).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let anonymous = Request::builder().uri("/properties").body(Body::empty()).unwrap();
    let (status, _) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/properties")
        .header(header::AUTHORIZATION, "Bearer not-a-real-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sell_and_pay_over_http() {
    let test = test_app(date(2024, 4, 1)).await;
    let app = router(test.state.clone());

    let (status, property) = send_json(
        &app,
        request(Method::POST, "/properties", Some(json!({ "title": "Green Acres" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let property_id = property["id"].as_str().unwrap().to_string();

    let (status, lot) = send_json(
        &app,
        request(
            Method::POST,
            &format!("/properties/{}/subdivisions", property_id),
            Some(json!({ "title": "Lot A", "acres": 0.5, "lot_number": "A-12" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let lot_id = lot["id"].as_str().unwrap().to_string();

    let (status, buyer) = send_json(
        &app,
        request(Method::POST, "/buyers", Some(json!({ "name": "Efua Boateng" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let buyer_id = buyer["id"].as_str().unwrap().to_string();

    let (status, sale) = send_json(
        &app,
        request(
            Method::POST,
            &format!("/subdivisions/{}/sale", lot_id),
            Some(json!({ "buyer_id": buyer_id, "sale_price": 3000.0, "plan": "mortgage" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["subdivision"]["status"], "mortgage");

    let (status, paid) = send_json(
        &app,
        request(
            Method::POST,
            &format!("/subdivisions/{}/payments", lot_id),
            Some(json!({ "amount": 1000.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(paid["remaining_balance"], 2000.0);
    let payment_id = paid["payment"]["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        &app,
        request(
            Method::POST,
            &format!("/subdivisions/{}/payments", lot_id),
            Some(json!({ "amount": -5.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, receipt) = send_json(
        &app,
        request(Method::POST, &format!("/payments/{}/receipt", payment_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["balance_after"], 2000.0);
    let receipt_id = receipt["receipt"]["id"].as_str().unwrap().to_string();

    let (status, text) = send(
        &app,
        request(Method::GET, &format!("/receipts/{}/print", receipt_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(text).unwrap().contains("Efua Boateng"));

    let (status, found) = send_json(
        &app,
        request(Method::GET, "/search/subdivisions?lot_number=a-1", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["property_title"], "Green Acres");

    let (status, stats) = send_json(&app, request(Method::GET, "/dashboard/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["property_count"], 1);
    assert_eq!(stats["buyer_count"], 1);

    let (status, _) = send_json(
        &app,
        request(Method::GET, "/subdivisions/does-not-exist", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_and_signed_download() {
    let test = test_app(date(2024, 4, 1)).await;
    let app = router(test.state.clone());

    let (_, property) = send_json(
        &app,
        request(Method::POST, "/properties", Some(json!({ "title": "Hilltop" }))),
    )
    .await;
    let property_id = property["id"].as_str().unwrap();

    let upload = Request::builder()
        .method(Method::POST)
        .uri(format!("/documents?name=deed.txt&property_id={}", property_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", API_KEY))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("title deed"))
        .unwrap();
    let (status, document) = send_json(&app, upload).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(document["file_type"], "text/plain");
    let document_id = document["id"].as_str().unwrap();

    let (status, count) = send_json(
        &app,
        request(Method::GET, &format!("/documents/count?property_id={}", property_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["count"], 1);

    let (status, link) = send_json(
        &app,
        request(Method::GET, &format!("/documents/{}/url", document_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = link["url"].as_str().unwrap();
    let path_and_query = &url[url.find("/files/").unwrap()..];

    // Signed links work without an API key.
    let download = Request::builder().uri(path_and_query).body(Body::empty()).unwrap();
    let (status, bytes) = send(&app, download).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"title deed");

    let tampered = path_and_query.replace("signature=", "signature=00");
    let download = Request::builder().uri(tampered).body(Body::empty()).unwrap();
    let (status, _) = send(&app, download).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
