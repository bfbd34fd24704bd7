use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use digiurban::client::ApiClient;
use digiurban::domain::artist_groups::{self, ArtistGroupFilters, GroupStatus, UpdateArtistGroupRequest};
use digiurban::domain::ArtistGroup;
use digiurban::store::{ResourceStore, Scope, StoreRegistry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::helpers::{artist_group, artist_group_record, decode, serve, spawn_app, TestApp};

const GROUPS: &str = "/culture/artist-groups";

async fn seeded_store(app: &TestApp, names: &[&str]) -> anyhow::Result<ResourceStore<ArtistGroup>> {
    for name in names {
        app.client
            .create::<ArtistGroup>(&decode(artist_group(name)))
            .await?;
    }
    let store = ResourceStore::new(app.client.clone());
    store.fetch_all(&Default::default()).await;
    assert!(store.error().is_none());
    Ok(store)
}

fn failure() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "code": "INTERNAL_ERROR", "message": "database unavailable" })),
    )
}

/// Backend that lists two groups and fails every mutation
async fn failing_backend() -> ApiClient {
    let list = || async {
        Json(json!({
            "data": [
                artist_group_record("g1", "Banda Lira"),
                artist_group_record("g2", "Coral Municipal"),
            ]
        }))
    };
    let router = Router::new()
        .route(GROUPS, get(list).post(|| async { failure() }))
        .route(
            &format!("{}/:id", GROUPS),
            get(|| async { failure() })
                .put(|| async { failure() })
                .delete(|| async { failure() }),
        )
        .route(
            &format!("{}/:id/members", GROUPS),
            axum::routing::post(|| async { failure() }),
        );
    ApiClient::new(&serve(router).await, 5).unwrap()
}

#[tokio::test]
async fn fetch_all_mirrors_the_server_list() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let store = seeded_store(&app, &["Banda Lira", "Coral Municipal", "Batucada"]).await?;

    let server = app.client.list::<ArtistGroup>(&Default::default()).await?;
    let local: Vec<ArtistGroup> = store.snapshot().iter().map(|g| (**g).clone()).collect();
    assert_eq!(local, server);
    assert!(!store.loading());
    Ok(())
}

#[tokio::test]
async fn created_record_goes_to_the_head() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let store = seeded_store(&app, &["Banda Lira"]).await?;

    let created = store
        .create(&decode(artist_group("Orquestra Jovem")))
        .await?;

    let items = store.snapshot();
    assert_eq!(items.len(), 2);
    assert!(Arc::ptr_eq(&items[0], &created));
    assert_eq!(created.name, "Orquestra Jovem");
    Ok(())
}

#[tokio::test]
async fn update_replaces_only_the_target() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let store = seeded_store(&app, &["Banda Lira", "Coral Municipal", "Batucada"]).await?;
    let before = store.snapshot();
    let target = before[1].id.clone();

    let update = UpdateArtistGroupRequest {
        status: Some(GroupStatus::Inactive),
        ..Default::default()
    };
    let updated = store.update(&target, &update).await?;
    assert_eq!(updated.status, GroupStatus::Inactive);

    let after = store.snapshot();
    assert_eq!(after.len(), before.len());
    assert!(Arc::ptr_eq(&after[0], &before[0]));
    assert!(Arc::ptr_eq(&after[2], &before[2]));
    assert!(Arc::ptr_eq(&after[1], &updated));
    Ok(())
}

#[tokio::test]
async fn delete_removes_only_the_target() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let store = seeded_store(&app, &["Banda Lira", "Coral Municipal", "Batucada"]).await?;
    let before = store.snapshot();
    let target = before[0].id.clone();

    store.delete(&target).await?;

    let after = store.snapshot();
    assert_eq!(after.len(), 2);
    assert!(store.get(&target).is_none());
    assert!(Arc::ptr_eq(&after[0], &before[1]));
    assert!(Arc::ptr_eq(&after[1], &before[2]));
    Ok(())
}

#[tokio::test]
async fn failed_mutations_leave_the_collection_alone() -> anyhow::Result<()> {
    let store = ResourceStore::<ArtistGroup>::new(failing_backend().await);
    store.fetch_all(&Default::default()).await;
    let before = store.snapshot();
    assert_eq!(before.len(), 2);

    let create = store.create(&decode(artist_group("Trio"))).await;
    assert!(create.is_err());
    assert_eq!(store.error().as_deref(), Some("database unavailable"));

    let update = store.update("g1", &UpdateArtistGroupRequest::default()).await;
    assert_eq!(update.unwrap_err().status(), Some(500));

    let delete = store.delete("g2").await;
    assert!(delete.is_err());
    assert!(!store.error().unwrap_or_default().is_empty());

    let after = store.snapshot();
    assert_eq!(after.len(), before.len());
    assert!(before.iter().zip(&after).all(|(a, b)| Arc::ptr_eq(a, b)));
    assert!(!store.loading());
    Ok(())
}

#[tokio::test]
async fn failed_fetch_records_error_and_serves_fallback() -> anyhow::Result<()> {
    let router = Router::new().route(GROUPS, get(|| async { failure() }));
    let client = ApiClient::new(&serve(router).await, 5)?;
    let store = ResourceStore::<ArtistGroup>::new(client);

    store.fetch_all(&Default::default()).await;
    assert!(store.is_empty());
    assert_eq!(store.error().as_deref(), Some("database unavailable"));

    store.set_fallback(vec![decode(artist_group_record("demo", "Grupo Demonstrativo"))]);
    store.fetch_all(&Default::default()).await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.snapshot()[0].id, "demo");
    assert!(store.error().is_some());
    Ok(())
}

#[tokio::test]
async fn selectors_are_pure() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let store = seeded_store(&app, &["Banda Lira", "Coral Municipal"]).await?;
    let target = store.snapshot()[0].id.clone();
    store
        .update(
            &target,
            &UpdateArtistGroupRequest {
                status: Some(GroupStatus::Inactive),
                ..Default::default()
            },
        )
        .await?;
    let before = store.snapshot();

    let first = store.select(|items| artist_groups::active(items));
    let second = store.select(|items| artist_groups::active(items));
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);

    let after = store.snapshot();
    assert!(before.iter().zip(&after).all(|(a, b)| Arc::ptr_eq(a, b)));
    Ok(())
}

#[tokio::test]
async fn registry_shares_one_collection_per_type() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.client
        .create::<ArtistGroup>(&decode(artist_group("Banda Lira")))
        .await?;
    let registry = StoreRegistry::new(app.client.clone());

    let list_view = registry.store::<ArtistGroup>();
    let detail_view = registry.store::<ArtistGroup>();
    let mut changes = detail_view.subscribe();

    list_view.fetch_all(&Default::default()).await;

    assert!(changes.has_changed()?);
    assert_eq!(detail_view.len(), 1);

    let created = detail_view
        .create(&decode(artist_group("Coral Municipal")))
        .await?;
    assert!(Arc::ptr_eq(&list_view.snapshot()[0], &created));
    assert_eq!(registry.len(), 1);
    Ok(())
}

#[tokio::test]
async fn latest_started_fetch_wins() -> anyhow::Result<()> {
    // Inactive listings are slow, so the first fetch finishes last.
    let list = |Query(params): Query<HashMap<String, String>>| async move {
        if params.get("status").map(String::as_str) == Some("INACTIVE") {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({ "data": [artist_group_record("old", "Stale")] }))
        } else {
            Json(json!({ "data": [artist_group_record("new", "Fresh")] }))
        }
    };
    let router = Router::new().route(GROUPS, get(list));
    let store = ResourceStore::<ArtistGroup>::new(ApiClient::new(&serve(router).await, 5)?);

    let slow = tokio::spawn({
        let store = store.clone();
        async move {
            store
                .fetch_all(&ArtistGroupFilters {
                    status: Some(GroupStatus::Inactive),
                    ..Default::default()
                })
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.fetch_all(&Default::default()).await;
    slow.await?;

    let items = store.snapshot();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "new");
    assert!(!store.loading());
    Ok(())
}

#[tokio::test]
async fn dropping_the_scope_abandons_the_request() -> anyhow::Result<()> {
    let router = Router::new().route(
        GROUPS,
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "data": [artist_group_record("late", "Too Late")] }))
        }),
    );
    let registry = StoreRegistry::new(ApiClient::new(&serve(router).await, 10)?);
    let shared = registry.store::<ArtistGroup>();

    let scope = Scope::new();
    let screen = registry.scoped::<ArtistGroup>(&scope);
    let fetch = tokio::spawn(async move { screen.fetch_all(&Default::default()).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(shared.loading());
    drop(scope);

    tokio::time::timeout(Duration::from_secs(1), fetch).await??;
    assert!(shared.is_empty());
    assert!(shared.error().is_none());
    assert!(!shared.loading());
    Ok(())
}

#[tokio::test]
async fn abandoned_requests_keep_the_recorded_error() -> anyhow::Result<()> {
    let router = Router::new()
        .route(
            GROUPS,
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "data": [] }))
            }),
        )
        .route(
            &format!("{}/:id", GROUPS),
            axum::routing::delete(|| async { failure() }),
        );
    let store = ResourceStore::<ArtistGroup>::new(ApiClient::new(&serve(router).await, 10)?);
    assert!(store.delete("g1").await.is_err());
    assert_eq!(store.error().as_deref(), Some("database unavailable"));

    // Abandoned while in flight
    let scope = Scope::new();
    let screen = store.bind(&scope);
    let fetch = tokio::spawn(async move { screen.fetch_all(&Default::default()).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.loading());
    drop(scope);
    tokio::time::timeout(Duration::from_secs(1), fetch).await??;
    assert_eq!(store.error().as_deref(), Some("database unavailable"));
    assert!(!store.loading());

    // Scope already gone before the call
    let scope = Scope::new();
    let screen = store.bind(&scope);
    scope.cancel();
    assert!(screen.delete("g1").await.unwrap_err().is_cancelled());
    screen.fetch_all(&Default::default()).await;
    assert_eq!(store.error().as_deref(), Some("database unavailable"));
    assert!(store.is_empty());
    Ok(())
}

#[tokio::test]
async fn abandoned_fetch_does_not_supersede_an_earlier_one() -> anyhow::Result<()> {
    let list = |Query(params): Query<HashMap<String, String>>| async move {
        if params.get("status").map(String::as_str) == Some("INACTIVE") {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({ "data": [artist_group_record("earlier", "Banda Lira")] }))
        } else {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "data": [artist_group_record("abandoned", "Never")] }))
        }
    };
    let router = Router::new().route(GROUPS, get(list));
    let store = ResourceStore::<ArtistGroup>::new(ApiClient::new(&serve(router).await, 10)?);

    let earlier = tokio::spawn({
        let store = store.clone();
        async move {
            store
                .fetch_all(&ArtistGroupFilters {
                    status: Some(GroupStatus::Inactive),
                    ..Default::default()
                })
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let scope = Scope::new();
    let screen = store.bind(&scope);
    let later = tokio::spawn(async move { screen.fetch_all(&Default::default()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(scope);

    tokio::time::timeout(Duration::from_secs(1), later).await??;
    earlier.await?;

    let items = store.snapshot();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "earlier");
    Ok(())
}
