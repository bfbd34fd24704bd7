use digiurban::client::DocumentUpload;
use digiurban::domain::artist_groups::{ArtistGroupAction, NewGroupMember, UpdateArtistGroupRequest};
use digiurban::domain::cultural_events::{
    Cancellation, CulturalEventAction, EventFilters, EventStatus, UpdateCulturalEventRequest,
};
use digiurban::domain::cultural_spaces::{BookingRequest, CulturalSpaceAction};
use digiurban::domain::{ArtistGroup, ConstructionLicense, CulturalEvent, CulturalSpace};
use reqwest::StatusCode;

use crate::helpers::{
    artist_group, assert_status, construction_license, cultural_event, cultural_space, decode,
    spawn_app,
};

#[tokio::test]
async fn create_then_get_returns_the_stored_record() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let created = app
        .client
        .create::<ArtistGroup>(&decode(artist_group("Banda Lira")))
        .await?;
    assert!(!created.id.is_empty());
    assert_eq!(created.audit.created_by.as_deref(), Some("user-1"));

    let fetched = app.client.get::<ArtistGroup>(&created.id).await?;
    assert_eq!(fetched, created);
    Ok(())
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = spawn_app().await;

    let result = app
        .anonymous()
        .list::<ArtistGroup>(&Default::default())
        .await;

    assert_status(result, 401);
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let app = spawn_app().await;

    let result = app.client.get::<ArtistGroup>("no-such-group").await;

    assert_status(result, 404);
}

#[tokio::test]
async fn blank_required_field_is_unprocessable() {
    let app = spawn_app().await;

    let result = app
        .client
        .create::<ArtistGroup>(&decode(artist_group("   ")))
        .await;

    assert_status(result, 422);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let token = app.token_for("user-1");

    let response = app
        .http()
        .post(app.url("/culture/artist-groups"))
        .bearer_auth(token)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn update_merges_only_the_sent_fields() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let created = app
        .client
        .create::<ArtistGroup>(&decode(artist_group("Coral Municipal")))
        .await?;

    let update = UpdateArtistGroupRequest {
        description: Some("Grupo vocal fundado em 1987".to_string()),
        ..Default::default()
    };
    let updated = app.client.update::<ArtistGroup>(&created.id, &update).await?;

    assert_eq!(updated.name, "Coral Municipal");
    assert_eq!(
        updated.description.as_deref(),
        Some("Grupo vocal fundado em 1987")
    );
    assert_eq!(updated.audit.created_at, created.audit.created_at);
    assert!(updated.audit.updated_at >= created.audit.updated_at);
    Ok(())
}

#[tokio::test]
async fn deleted_records_are_gone() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let keep = app
        .client
        .create::<ArtistGroup>(&decode(artist_group("Quarteto")))
        .await?;
    let gone = app
        .client
        .create::<ArtistGroup>(&decode(artist_group("Trio")))
        .await?;

    app.client.delete::<ArtistGroup>(&gone.id).await?;

    assert_status(app.client.get::<ArtistGroup>(&gone.id).await, 404);
    assert_status(app.client.delete::<ArtistGroup>(&gone.id).await, 404);
    let remaining = app.client.list::<ArtistGroup>(&Default::default()).await?;
    assert_eq!(remaining, vec![keep]);
    Ok(())
}

#[tokio::test]
async fn sub_resource_actions_return_the_parent() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let group = app
        .client
        .create::<ArtistGroup>(&decode(artist_group("Batucada")))
        .await?;

    let with_member = app
        .client
        .act::<ArtistGroup>(
            &group.id,
            &ArtistGroupAction::AddMember(NewGroupMember {
                name: "Carlos".to_string(),
                role: Some("Percussion".to_string()),
                artist_id: None,
            }),
        )
        .await?;
    assert_eq!(with_member.id, group.id);
    assert_eq!(with_member.members.len(), 1);

    let member_id = with_member.members[0].id.clone();
    let without = app
        .client
        .act::<ArtistGroup>(&group.id, &ArtistGroupAction::RemoveMember { member_id })
        .await?;
    assert!(without.members.is_empty());
    Ok(())
}

#[tokio::test]
async fn publishing_a_cancelled_event_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let event = app
        .client
        .create::<CulturalEvent>(&decode(cultural_event(
            "Festival de Inverno",
            "2024-07-10T18:00:00Z",
            "2024-07-10T23:00:00Z",
        )))
        .await?;
    assert_eq!(event.status, EventStatus::Planned);

    let cancelled = app
        .client
        .act::<CulturalEvent>(
            &event.id,
            &CulturalEventAction::Cancel(Cancellation {
                reason: "Chuva".to_string(),
            }),
        )
        .await?;
    assert_eq!(cancelled.status, EventStatus::Cancelled);

    let result = app
        .client
        .act::<CulturalEvent>(&event.id, &CulturalEventAction::Publish)
        .await;
    assert_status(result, 422);

    let stored = app.client.get::<CulturalEvent>(&event.id).await?;
    assert_eq!(stored.status, EventStatus::Cancelled);
    Ok(())
}

#[tokio::test]
async fn update_cannot_publish_a_cancelled_event() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let event = app
        .client
        .create::<CulturalEvent>(&decode(cultural_event(
            "Sarau na Praça",
            "2024-08-02T19:00:00Z",
            "2024-08-02T22:00:00Z",
        )))
        .await?;
    app.client
        .act::<CulturalEvent>(
            &event.id,
            &CulturalEventAction::Cancel(Cancellation {
                reason: "Chuva".to_string(),
            }),
        )
        .await?;

    let publish = UpdateCulturalEventRequest {
        status: Some(EventStatus::Published),
        ..Default::default()
    };
    assert_status(
        app.client.update::<CulturalEvent>(&event.id, &publish).await,
        422,
    );

    let stored = app.client.get::<CulturalEvent>(&event.id).await?;
    assert_eq!(stored.status, EventStatus::Cancelled);
    assert_eq!(stored.cancellation_reason.as_deref(), Some("Chuva"));
    Ok(())
}

#[tokio::test]
async fn overlapping_booking_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let space = app
        .client
        .create::<CulturalSpace>(&decode(cultural_space("Teatro Sesc")))
        .await?;

    let booking = |title: &str, starts_at: &str, ends_at: &str| {
        CulturalSpaceAction::RequestBooking(BookingRequest {
            title: title.to_string(),
            requester: "Cia. Teatral".to_string(),
            starts_at: starts_at.parse().unwrap(),
            ends_at: ends_at.parse().unwrap(),
            event_id: None,
        })
    };

    app.client
        .act::<CulturalSpace>(
            &space.id,
            &booking("Ensaio", "2024-05-02T14:00:00Z", "2024-05-02T18:00:00Z"),
        )
        .await?;

    let clash = app
        .client
        .act::<CulturalSpace>(
            &space.id,
            &booking("Oficina", "2024-05-02T17:00:00Z", "2024-05-02T19:00:00Z"),
        )
        .await;
    assert_status(clash, 409);

    let after = app
        .client
        .act::<CulturalSpace>(
            &space.id,
            &booking("Oficina", "2024-05-02T18:00:00Z", "2024-05-02T19:00:00Z"),
        )
        .await?;
    assert_eq!(after.bookings.len(), 2);
    Ok(())
}

#[tokio::test]
async fn list_applies_filters() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let first = app
        .client
        .create::<CulturalEvent>(&decode(cultural_event(
            "Sarau",
            "2024-03-01T19:00:00Z",
            "2024-03-01T22:00:00Z",
        )))
        .await?;
    app.client
        .create::<CulturalEvent>(&decode(cultural_event(
            "Cine Clube",
            "2024-09-01T19:00:00Z",
            "2024-09-01T22:00:00Z",
        )))
        .await?;
    app.client
        .act::<CulturalEvent>(&first.id, &CulturalEventAction::Publish)
        .await?;

    let published = app
        .client
        .list::<CulturalEvent>(&EventFilters {
            status: Some(EventStatus::Published),
            ..Default::default()
        })
        .await?;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, first.id);

    let autumn = app
        .client
        .list::<CulturalEvent>(&EventFilters {
            from: Some("2024-06-01T00:00:00Z".parse()?),
            ..Default::default()
        })
        .await?;
    assert_eq!(autumn.len(), 1);
    assert_eq!(autumn[0].title, "Cine Clube");
    Ok(())
}

#[tokio::test]
async fn documents_can_be_uploaded_downloaded_and_removed() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let license = app
        .client
        .create::<ConstructionLicense>(&decode(construction_license("2024/0117")))
        .await?;

    let pdf = b"%PDF-1.4 planta baixa".to_vec();
    let updated = app
        .client
        .upload_document::<ConstructionLicense>(
            &license.id,
            DocumentUpload {
                file_name: "planta.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: pdf.clone(),
                name: Some("Planta baixa".to_string()),
            },
        )
        .await?;
    assert_eq!(updated.documents.len(), 1);
    let document = updated.documents[0].clone();
    assert_eq!(document.name, "Planta baixa");
    assert_eq!(document.size_bytes, pdf.len() as u64);
    assert_eq!(document.uploaded_by.as_deref(), Some("user-1"));

    let token = app.token_for("user-1");
    let download = app
        .http()
        .get(app.url(&document.url))
        .bearer_auth(&token)
        .send()
        .await?
        .error_for_status()?;
    assert_eq!(download.headers()["content-type"], "application/pdf");
    assert_eq!(download.bytes().await?.as_ref(), pdf.as_slice());

    app.http()
        .delete(app.url(&document.url))
        .bearer_auth(&token)
        .send()
        .await?
        .error_for_status()?;

    let stored = app.client.get::<ConstructionLicense>(&license.id).await?;
    assert!(stored.documents.is_empty());
    let missing = app
        .http()
        .get(app.url(&document.url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn resources_without_documents_reject_uploads() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let group = app
        .client
        .create::<ArtistGroup>(&decode(artist_group("Orquestra Jovem")))
        .await?;

    let result = app
        .client
        .upload_document::<ArtistGroup>(
            &group.id,
            DocumentUpload {
                file_name: "estatuto.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF".to_vec(),
                name: None,
            },
        )
        .await;

    assert!(result.is_err());
    Ok(())
}
