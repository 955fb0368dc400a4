use axum::http::{header, Method, StatusCode};
use pretty_assertions::assert_eq;
use chrono::NaiveDate;
use swimsmart::services::export_service::{project, read_csv, CSV_HEADERS};
use swimsmart::store::{DateRange, SwimStore};
use uuid::Uuid;

use crate::common::TestApp;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

#[tokio::test]
async fn test_single_session_export() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    let session_id = app.reference_session(&token, "2025-01-06").await;

    let response = app
        .send(
            Method::GET,
            &format!("/api/v1/export/sessions/{}", session_id),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
        format!("attachment; filename=\"session_{}.csv\"", session_id)
    );

    let mut lines = response.text.lines();
    assert_eq!(lines.next().unwrap(), CSV_HEADERS.join(","));
    // One row per rep: 4 free + 6 fly
    assert_eq!(lines.count(), 10);
}

#[tokio::test]
async fn test_session_export_access() {
    let app = TestApp::new();
    let (_, owner) = app.swimmer("lane1").await;
    let (_, stranger) = app.swimmer("lane2").await;
    let (_, coach) = app.coach("deck").await;
    let (_, other_coach) = app.coach("poolside").await;
    app.link(&owner, "deck").await;
    let session_id = app.reference_session(&owner, "2025-01-06").await;
    let uri = format!("/api/v1/export/sessions/{}", session_id);

    for (token, expected) in [
        (coach, StatusCode::OK),
        (stranger, StatusCode::FORBIDDEN),
        (other_coach, StatusCode::FORBIDDEN),
    ] {
        let response = app.send(Method::GET, &uri, Some(&token), None).await;
        assert_eq!(response.status, expected);
    }

    let missing = app
        .send(
            Method::GET,
            &format!("/api/v1/export/sessions/{}", Uuid::new_v4()),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_range_export_round_trips_logged_reps() {
    let app = TestApp::new();
    let (swimmer_id, token) = app.swimmer("lane1").await;
    app.reference_session(&token, "2025-01-06").await;
    app.reference_session(&token, "2025-01-03").await;
    app.create_session(&token, "2025-01-04").await;
    app.reference_session(&token, "2025-02-10").await;

    let response = app
        .send(
            Method::GET,
            "/api/v1/export/range?start=2025-01-01&end=2025-01-31",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
        "attachment; filename=\"sessions_2025-01-01_2025-01-31.csv\""
    );

    let sessions = app
        .store
        .list_sessions(swimmer_id, Some(DateRange::new(day(1), day(31))), None)
        .await
        .unwrap();
    let details = app.store.load_details(sessions).await.unwrap();

    let parsed = read_csv(&response.text).unwrap();
    assert_eq!(parsed, project(&details));
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[0].date, day(3));
    assert!(parsed[1].sets.is_empty());

    // Same request, same bytes
    let again = app
        .send(
            Method::GET,
            "/api/v1/export/range?start=2025-01-01&end=2025-01-31",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(again.text, response.text);
}

#[tokio::test]
async fn test_coach_range_export_scope() {
    let app = TestApp::new();
    let (lane1_id, lane1) = app.swimmer("lane1").await;
    let (lane2_id, lane2) = app.swimmer("lane2").await;
    let (_, coach) = app.coach("deck").await;
    app.link(&lane1, "deck").await;
    app.reference_session(&lane1, "2025-01-06").await;
    app.reference_session(&lane2, "2025-01-06").await;

    let all = app
        .send(
            Method::GET,
            "/api/v1/export/range?start=2025-01-01&end=2025-01-31",
            Some(&coach),
            None,
        )
        .await;
    assert_eq!(all.status, StatusCode::OK);
    let parsed = read_csv(&all.text).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].swimmer_id, lane1_id);

    let one = app
        .send(
            Method::GET,
            &format!("/api/v1/export/range?start=2025-01-01&end=2025-01-31&swimmer_id={}", lane1_id),
            Some(&coach),
            None,
        )
        .await;
    assert_eq!(one.status, StatusCode::OK);

    let unsupervised = app
        .send(
            Method::GET,
            &format!("/api/v1/export/range?start=2025-01-01&end=2025-01-31&swimmer_id={}", lane2_id),
            Some(&coach),
            None,
        )
        .await;
    assert_eq!(unsupervised.status, StatusCode::FORBIDDEN);

    let backwards = app
        .send(
            Method::GET,
            "/api/v1/export/range?start=2025-01-31&end=2025-01-01",
            Some(&coach),
            None,
        )
        .await;
    assert_eq!(backwards.status, StatusCode::BAD_REQUEST);
}
