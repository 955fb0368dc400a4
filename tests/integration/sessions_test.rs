use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use swimsmart::store::SwimStore;
use uuid::Uuid;

use crate::common::{free_set, TestApp};

#[tokio::test]
async fn test_session_detail_carries_sets_reps_and_totals() {
    let app = TestApp::new();
    let (swimmer_id, token) = app.swimmer("lane1").await;
    let session_id = app.reference_session(&token, "2025-01-06").await;

    let (status, body) = app
        .get(&format!("/api/v1/me/sessions/{}", session_id), &token)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["swimmer_id"], swimmer_id.to_string());
    assert_eq!(body["date"], "2025-01-06");
    assert_eq!(body["sets"].as_array().unwrap().len(), 2);
    assert_eq!(body["sets"][0]["position"], 1);
    assert_eq!(body["sets"][1]["stroke"], "fly");
    assert_eq!(body["sets"][1]["reps"][5]["rep_index"], 6);
    assert_eq!(body["totals"]["total_sets"], 2);
    assert_eq!(body["totals"]["total_reps"], 10);
    assert_eq!(body["totals"]["total_distance_m"], json!(700.0));
    assert_eq!(body["totals"]["avg_rpe"], json!(6.5));
}

#[tokio::test]
async fn test_session_analytics_reference_figures() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    let session_id = app.reference_session(&token, "2025-01-06").await;

    let (status, body) = app
        .get(&format!("/api/v1/me/sessions/{}/analytics", session_id), &token)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_distance_m"], json!(700.0));
    assert_eq!(body["summary"]["avg_pace_sec_per"], json!(78.14));
    assert_eq!(body["summary"]["avg_pace_formatted"], "1:18.14");
    assert_eq!(body["summary"]["pace_basis_m"], 100);
    assert_eq!(body["by_stroke"]["free"]["avg_pace_formatted"], "1:15.75");
    assert_eq!(body["by_stroke"]["fly"]["avg_pace_sec_per"], json!(81.33));
    assert_eq!(body["best_set"]["stroke"], "free");
    assert_eq!(body["detail"]["id"], session_id.to_string());

    let (status, body) = app
        .get(
            &format!("/api/v1/me/sessions/{}/analytics?pace_per_m=50", session_id),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["avg_pace_sec_per"], json!(39.07));

    let (status, _) = app
        .get(
            &format!("/api/v1/me/sessions/{}/analytics?pace_per_m=0", session_id),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rpe_out_of_range_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    let session_id = app.create_session(&token, "2025-01-06").await;

    let (status, body) = app
        .post(
            &format!("/api/v1/me/sessions/{}/sets", session_id),
            &token,
            json!({
                "repeat_count": 2,
                "distance_m": 100,
                "stroke": "free",
                "reps": [{ "time_sec": 75.0, "rpe": 5 }, { "time_sec": 76.0, "rpe": 11 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "reps[1].rpe");

    let (status, set) = app
        .post(
            &format!("/api/v1/me/sessions/{}/sets", session_id),
            &token,
            json!({ "repeat_count": 2, "distance_m": 100, "stroke": "FREE" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(set["stroke"], "free");

    let rep_uri = format!("/api/v1/me/sets/{}/reps", set["id"].as_str().unwrap());
    let (status, _) = app.post(&rep_uri, &token, json!({ "time_sec": 75.0, "rpe": 0 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, rep) = app.post(&rep_uri, &token, json!({ "time_sec": 75.0, "rpe": 10 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rep["rep_index"], 1);
}

#[tokio::test]
async fn test_rep_requires_existing_set() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;

    let missing_set = Uuid::new_v4();
    let (status, body) = app
        .post(
            &format!("/api/v1/me/sets/{}/reps", missing_set),
            &token,
            json!({ "time_sec": 75.0, "rpe": 6 }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Set not found");
}

#[tokio::test]
async fn test_set_holds_at_most_repeat_count_reps() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    let session_id = app.create_session(&token, "2025-01-06").await;

    let (_, set) = app
        .post(
            &format!("/api/v1/me/sessions/{}/sets", session_id),
            &token,
            json!({ "repeat_count": 1, "distance_m": 200, "stroke": "back" }),
        )
        .await;
    let rep_uri = format!("/api/v1/me/sets/{}/reps", set["id"].as_str().unwrap());

    let (status, _) = app.post(&rep_uri, &token, json!({ "time_sec": 150.0 })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post(&rep_uri, &token, json!({ "time_sec": 151.0 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let set_uri = format!("/api/v1/me/sets/{}", set["id"].as_str().unwrap());
    let (status, body) = app.put(&set_uri, &token, json!({ "repeat_count": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repeat_count"], 2);

    let (status, _) = app.post(&rep_uri, &token, json!({ "time_sec": 151.0 })).await;
    assert_eq!(status, StatusCode::CREATED);

    // Shrinking below the logged count is refused
    let (status, _) = app.put(&set_uri, &token, json!({ "repeat_count": 1 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_stroke_is_unprocessable() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    let session_id = app.create_session(&token, "2025-01-06").await;

    let (status, body) = app
        .post(
            &format!("/api/v1/me/sessions/{}/sets", session_id),
            &token,
            json!({ "repeat_count": 2, "distance_m": 100, "stroke": "doggy" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn test_other_swimmers_sessions_are_forbidden() {
    let app = TestApp::new();
    let (_, owner) = app.swimmer("lane1").await;
    let (_, intruder) = app.swimmer("lane2").await;
    let session_id = app.reference_session(&owner, "2025-01-06").await;
    let uri = format!("/api/v1/me/sessions/{}", session_id);

    let (status, _) = app.get(&uri, &intruder).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&uri, &intruder).await, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post(&format!("{}/sets", uri), &intruder, free_set())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/api/v1/me/sessions/{}", Uuid::new_v4()), &owner)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/v1/me/sessions/not-a-uuid", &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete_cascade() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    let session_id = app.reference_session(&token, "2025-01-06").await;
    let uri = format!("/api/v1/me/sessions/{}", session_id);

    let (status, body) = app
        .put(&uri, &token, json!({ "date": "2025-01-07", "notes": "" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2025-01-07");
    assert!(body["notes"].is_null());

    let first_set = body["sets"][0]["id"].as_str().unwrap().to_string();
    let second_set = Uuid::parse_str(body["sets"][1]["id"].as_str().unwrap()).unwrap();
    let first_rep = body["sets"][0]["reps"][0]["id"].as_str().unwrap().to_string();

    let (status, rep) = app
        .put(
            &format!("/api/v1/me/reps/{}", first_rep),
            &token,
            json!({ "time_sec": 74.5, "notes": "fast turn" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rep["time_sec"], json!(74.5));
    assert_eq!(rep["rpe"], 5);

    assert_eq!(
        app.delete(&format!("/api/v1/me/sets/{}", first_set), &token).await,
        StatusCode::NO_CONTENT
    );
    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["sets"].as_array().unwrap().len(), 1);

    assert_eq!(app.delete(&uri, &token).await, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.store.list_reps(&[second_set]).await.unwrap().is_empty());
    assert!(app.store.get_set(second_set).await.unwrap().is_none());
}

#[tokio::test]
async fn test_null_clears_interval_and_rpe() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    let session_id = app.reference_session(&token, "2025-01-06").await;
    let (_, body) = app
        .get(&format!("/api/v1/me/sessions/{}", session_id), &token)
        .await;
    let set_uri = format!("/api/v1/me/sets/{}", body["sets"][0]["id"].as_str().unwrap());
    let rep_uri = format!("/api/v1/me/reps/{}", body["sets"][0]["reps"][1]["id"].as_str().unwrap());

    let (status, set) = app.put(&set_uri, &token, json!({ "distance_m": 75 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(set["interval_sec"], 90);

    let (status, set) = app.put(&set_uri, &token, json!({ "interval_sec": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(set["interval_sec"].is_null());
    assert_eq!(set["distance_m"], 75);

    let (status, body) = app.put(&set_uri, &token, json!({ "interval_sec": 5 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "interval_sec");

    let (status, rep) = app.put(&rep_uri, &token, json!({ "rpe": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(rep["rpe"].is_null());
    assert_eq!(rep["time_sec"], json!(76.0));
}

#[tokio::test]
async fn test_dashboard_rows_newest_first() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    app.reference_session(&token, "2025-01-06").await;
    app.create_session(&token, "2025-01-08").await;
    app.create_session(&token, "2025-01-02").await;

    let (status, body) = app.get("/api/v1/me/sessions", &token).await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-01-08", "2025-01-06", "2025-01-02"]);
    assert_eq!(body[1]["avg_pace_formatted"], "1:18.14");
    assert!(body[0]["avg_pace_sec_per"].is_null());

    let (_, body) = app.get("/api/v1/me/sessions?limit=1", &token).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/v1/me/sessions?limit=0", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_range_listing_and_summary() {
    let app = TestApp::new();
    let (_, token) = app.swimmer("lane1").await;
    app.reference_session(&token, "2025-01-06").await;
    app.reference_session(&token, "2025-01-09").await;
    app.reference_session(&token, "2025-02-01").await;

    let (status, body) = app
        .get("/api/v1/me/sessions/range?start=2025-01-01&end=2025-01-31", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 2);
    assert_eq!(body["sessions"][0]["date"], "2025-01-06");
    assert_eq!(body["summary"]["sessions"], 2);
    assert_eq!(body["summary"]["total_distance_m"], json!(1400.0));
    assert_eq!(body["summary"]["avg_pace_formatted"], "1:18.14");

    let (status, body) = app
        .get("/api/v1/me/sessions/range/summary?start=2025-01-06&end=2025-01-06", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], 1);
    assert_eq!(body["avg_rpe"], json!(6.5));

    let (status, body) = app
        .get("/api/v1/me/sessions/range/summary?start=2025-02-01&end=2025-01-01", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "end must be >= start");

    let (status, _) = app
        .get("/api/v1/me/sessions/range?start=2025-01-01", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
