// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP-level tests for authentication, authorization and error shapes.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::Weekday;
use serde_json::json;
use studio_booking::config::Config;
use tower::ServiceExt;

mod common;
use common::{
    beat_doc, create_test_app, id_token, id_token_for_project, json_body, next_weekday,
    unverified_id_token,
};

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn user_token(uid: &str) -> String {
    id_token(
        &Config::test_default(),
        uid,
        Some(&format!("{uid}@example.com")),
        false,
    )
}

fn booking_body(start: &str) -> Body {
    Body::from(
        json!({
            "date": next_weekday(Weekday::Wed).format("%Y-%m-%d").to_string(),
            "startTime": start,
            "type": "recording",
        })
        .to_string(),
    )
}

fn post_json(uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, bearer(token));
    }
    builder.body(body).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC SURFACE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_availability_is_public() {
    let app = create_test_app();
    let date = next_weekday(Weekday::Wed).format("%Y-%m-%d").to_string();

    let response = app
        .router
        .oneshot(
            Request::get(format!("/api/availability?date={date}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["bookable"], true);
    assert_eq!(body["slots"][0]["time"], "10:00");
    assert_eq!(body["slots"][0]["available"], true);
}

#[tokio::test]
async fn test_malformed_date_is_invalid_slot() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(
            Request::get("/api/availability?date=03/06/2030")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "INVALID_SLOT");
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/bookings")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// AUTHENTICATION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_anonymous_booking_is_auth_required() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(post_json("/api/bookings", None, booking_body("10:00")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(post_json(
            "/api/bookings",
            Some("not.a.token"),
            booking_body("10:00"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_token_for_other_project_is_rejected() {
    let app = create_test_app();
    let token = id_token_for_project("someone-else", "lea", Some("lea@example.com"), false);

    let response = app
        .router
        .oneshot(
            Request::get("/api/me")
                .header(header::AUTHORIZATION, bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = create_test_app();
    let token = user_token("lea");

    let response = app
        .router
        .oneshot(
            Request::get("/api/me")
                .header(header::COOKIE, format!("__session={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let body = json_body(response).await;
    assert_eq!(body["id"], "lea");
    assert_eq!(body["displayName"], "lea");
}

// ═══════════════════════════════════════════════════════════════════════════
// BOOKINGS OVER HTTP
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_create_booking_then_conflict() {
    let app = create_test_app();
    let lea = user_token("lea");
    let max = user_token("max");

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/bookings", Some(&lea), booking_body("11:00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["userId"], "lea");

    let response = app
        .router
        .oneshot(post_json("/api/bookings", Some(&max), booking_body("11:00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"], "SLOT_ALREADY_BOOKED");
}

#[tokio::test]
async fn test_unknown_session_type_is_invalid_slot() {
    let app = create_test_app();
    let body = Body::from(
        json!({
            "date": next_weekday(Weekday::Wed).format("%Y-%m-%d").to_string(),
            "startTime": "10:00",
            "type": "karaoke",
        })
        .to_string(),
    );

    let response = app
        .router
        .oneshot(post_json("/api/bookings", Some(&user_token("lea")), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "INVALID_SLOT");
}

#[tokio::test]
async fn test_other_users_booking_is_forbidden() {
    let app = create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/bookings",
            Some(&user_token("lea")),
            booking_body("12:00"),
        ))
        .await
        .unwrap();
    let id = json_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .router
        .oneshot(post_json(
            &format!("/api/bookings/{id}/cancel"),
            Some(&user_token("max")),
            Body::empty(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "PERMISSION_DENIED");
}

// ═══════════════════════════════════════════════════════════════════════════
// CATALOG ADMINISTRATION
// ═══════════════════════════════════════════════════════════════════════════

fn new_beat_body() -> Body {
    Body::from(
        json!({
            "title": "Paris Nights",
            "producer": "43 Art",
            "price": 29.99,
            "style": "Drill",
            "duration": 170,
            "audioPath": "beats/paris-nights.mp3",
        })
        .to_string(),
    )
}

#[tokio::test]
async fn test_non_admin_cannot_add_beat() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(post_json(
            "/api/beats",
            Some(&user_token("lea")),
            new_beat_body(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.db.beat_count(), 0);
}

#[tokio::test]
async fn test_admin_by_claim_or_allow_list() {
    let app = create_test_app();
    let config = Config::test_default();

    let by_claim = id_token(&config, "boss", Some("boss@elsewhere.com"), true);
    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/beats", Some(&by_claim), new_beat_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let by_domain = id_token(&config, "eng", Some("eng@studio.test"), false);
    let response = app
        .router
        .oneshot(
            Request::get("/api/admin/migration-check")
                .header(header::AUTHORIZATION, bearer(&by_domain))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["catalogRecords"], 1);
}

#[tokio::test]
async fn test_unverified_allow_listed_email_is_not_admin() {
    let app = create_test_app();
    let token = unverified_id_token(&Config::test_default(), "intruder", "intruder@studio.test");

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/admin/migrate-beats", Some(&token), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "PERMISSION_DENIED");

    let response = app
        .router
        .oneshot(post_json("/api/beats", Some(&token), new_beat_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.db.beat_count(), 0);
}

#[tokio::test]
async fn test_plays_are_public_and_likes_need_sign_in() {
    let app = create_test_app();
    app.db
        .seed_beat(beat_doc("b1", "Night Drive", 4, "2030-01-01T00:00:00Z"));

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/beats/b1/play", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["plays"], 5);

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/beats/b1/like", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .oneshot(post_json(
            "/api/beats/b1/like",
            Some(&user_token("lea")),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["liked"], true);
    assert_eq!(body["likes"], 1);
}

#[tokio::test]
async fn test_missing_beat_is_not_found() {
    let app = create_test_app();
    let response = app
        .router
        .oneshot(Request::get("/api/beats/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "NOT_FOUND");
}
