use assert_matches::assert_matches;
use chrono::NaiveDate;
use std::sync::Arc;

use swimsmart::error::AppError;
use swimsmart::models::*;
use swimsmart::services::TemplateService;
use swimsmart::store::{MemoryStore, SwimStore};

use super::account;

fn request(name: &str) -> CreateTemplateRequest {
    CreateTemplateRequest {
        name: name.to_string(),
        description: None,
        sets: vec![
            TemplateSet {
                repeat_count: 8,
                distance_m: 50,
                stroke: Stroke::Back,
                interval_sec: Some(60),
                notes: None,
            },
            TemplateSet {
                repeat_count: 1,
                distance_m: 200,
                stroke: Stroke::Breast,
                interval_sec: None,
                notes: Some("easy".to_string()),
            },
        ],
    }
}

#[tokio::test]
async fn test_list_includes_linked_coach_templates() {
    let store = Arc::new(MemoryStore::new());
    let swimmer = account(&store, "lane1", AccountRole::Swimmer).await;
    let coach = account(&store, "deck", AccountRole::Coach).await;
    let other_coach = account(&store, "poolside", AccountRole::Coach).await;
    store
        .link_coach(coach.account_id, swimmer.account_id)
        .await
        .unwrap();

    let shared: Arc<dyn SwimStore> = store.clone();
    let service = TemplateService::new(shared);

    service.create(&swimmer, request("Own kick set")).await.unwrap();
    service.create(&coach, request("Backstroke day")).await.unwrap();
    let hidden = service.create(&other_coach, request("Sprint")).await.unwrap();

    let names: Vec<String> = service
        .list(&swimmer)
        .await
        .unwrap()
        .into_iter()
        .map(|template| template.name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Own kick set".to_string()));
    assert!(names.contains(&"Backstroke day".to_string()));

    assert_eq!(service.list(&coach).await.unwrap().len(), 1);

    let err = service.get(&swimmer, hidden.id).await.unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));
    let err = service.get(&coach, hidden.id).await.unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));
}

#[tokio::test]
async fn test_instantiate_copies_sets_in_order() {
    let store = Arc::new(MemoryStore::new());
    let swimmer = account(&store, "lane1", AccountRole::Swimmer).await;
    let shared: Arc<dyn SwimStore> = store.clone();
    let service = TemplateService::new(shared);

    let template = service.create(&swimmer, request("Mixed")).await.unwrap();
    let view = service
        .instantiate(
            &swimmer,
            template.id,
            InstantiateTemplateRequest {
                date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(view.detail.session.template_id, Some(template.id));
    let strokes: Vec<Stroke> = view.detail.sets.iter().map(|s| s.set.stroke).collect();
    assert_eq!(strokes, vec![Stroke::Back, Stroke::Breast]);
    assert_eq!(view.detail.sets[1].set.position, 2);
    assert!(view.detail.sets.iter().all(|s| s.reps.is_empty()));
    assert_eq!(view.totals.total_distance_m, 600.0);
}

#[tokio::test]
async fn test_missing_template_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let swimmer = account(&store, "lane1", AccountRole::Swimmer).await;
    let shared: Arc<dyn SwimStore> = store.clone();
    let service = TemplateService::new(shared);

    let err = service
        .delete(&swimmer, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, AppError::NotFound("Template"));
}
