//! CRUD and sub-resource routes shared by every entity
//!
//! `resource_router::<R>()` mounts, under `R::PATH`:
//!
//! - `GET|POST PATH`
//! - `GET|PUT|DELETE PATH/:id`
//! - `POST|PUT PATH/:id/:segment` (sub-resource actions, document upload)
//! - `GET|PUT|DELETE PATH/:id/:segment/:sub_id` (item actions, document download)

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, ListResponse, MessageResponse};
use crate::app::AppState;
use crate::auth::{AuthContext, RequireAuth};
use crate::db::not_found;
use crate::domain::{
    merge_update, ActionContext, ActionMethod, ActionRoute, Audit, Document, DomainError,
    Resource, SubResourceAction,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestIdExt;

/// Segment under which uploaded documents live
pub const DOCUMENTS_SEGMENT: &str = "documents";

/// Multipart field carrying the uploaded file
pub const FILE_FIELD: &str = "file";

pub fn resource_router<R: Resource>() -> Router<Arc<AppState>> {
    let base = R::PATH;
    Router::new()
        .route(base, get(list::<R>).post(create::<R>))
        .route(
            &format!("{}/:id", base),
            get(fetch::<R>).put(update::<R>).delete(remove::<R>),
        )
        .route(
            &format!("{}/:id/:segment", base),
            axum::routing::post(post_action::<R>).put(put_action::<R>),
        )
        .route(
            &format!("{}/:id/:segment/:sub_id", base),
            get(download_document::<R>)
                .put(put_item_action::<R>)
                .delete(delete_item_action::<R>),
        )
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    if body.is_empty() {
        return serde_json::from_value(Value::Null)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

/// GET {PATH}
async fn list<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(filters): Query<R::Filters>,
) -> ApiResult<ListResponse<R>> {
    let records: Vec<R> = state
        .records
        .list::<R>()
        .await?
        .into_iter()
        .filter(|record| record.matches(&filters))
        .collect();

    tracing::debug!(
        user_id = %auth.user_id,
        resource = R::KIND,
        count = records.len(),
        "Listing records"
    );

    Ok(ListResponse::new(R::KIND, records))
}

/// POST {PATH}
async fn create<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Created<DataResponse<R>>> {
    let req: R::Create = parse_body(&body)?;
    let id = Uuid::new_v4().to_string();
    let record = R::from_create(id, Audit::new(auth.actor()), req)?;

    state.records.insert(&record).await?;

    tracing::info!(
        user_id = %auth.user_id,
        request_id = ?headers.request_id(),
        resource = R::KIND,
        id = %record.id(),
        "Created record"
    );

    Ok(Created {
        location: format!("{}/{}", R::PATH, record.id()),
        body: DataResponse::new(record),
    })
}

/// GET {PATH}/:id
async fn fetch<R: Resource>(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DataResponse<R>> {
    let record = state
        .records
        .get::<R>(&id)
        .await?
        .ok_or_else(|| not_found::<R>(&id))?;
    Ok(DataResponse::new(record))
}

/// PUT {PATH}/:id
async fn update<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<DataResponse<R>> {
    let update: R::Update = parse_body(&body)?;

    let updated = state
        .records
        .modify::<R, _>(&id, |current| {
            let mut merged = merge_update(&current, &update)?;
            merged.audit_mut().touch();
            Ok(merged)
        })
        .await?;

    tracing::info!(user_id = %auth.user_id, resource = R::KIND, id = %id, "Updated record");
    Ok(DataResponse::new(updated))
}

/// DELETE {PATH}/:id
async fn remove<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    if !state.records.delete::<R>(&id).await? {
        return Err(not_found::<R>(&id));
    }

    tracing::info!(user_id = %auth.user_id, resource = R::KIND, id = %id, "Deleted record");
    Ok(MessageResponse::deleted(R::KIND, &id))
}

/// POST {PATH}/:id/:segment
///
/// Multipart requests to `documents` upload a file; everything else is a
/// sub-resource action with an optional JSON body.
async fn post_action<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, segment)): Path<(String, String)>,
    request: Request,
) -> ApiResult<DataResponse<R>> {
    if segment == DOCUMENTS_SEGMENT && is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        return upload_document::<R>(&state, &auth, &id, multipart).await;
    }

    let body = Bytes::from_request(request, &state)
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?;
    let route = ActionRoute::new(ActionMethod::Post, segment, None);
    run_action::<R>(&state, &auth, &id, route, &body).await
}

/// PUT {PATH}/:id/:segment
async fn put_action<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, segment)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<DataResponse<R>> {
    let route = ActionRoute::new(ActionMethod::Put, segment, None);
    run_action::<R>(&state, &auth, &id, route, &body).await
}

/// PUT {PATH}/:id/:segment/:sub_id
async fn put_item_action<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, segment, sub_id)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult<DataResponse<R>> {
    let route = ActionRoute::new(ActionMethod::Put, segment, Some(sub_id));
    run_action::<R>(&state, &auth, &id, route, &body).await
}

/// DELETE {PATH}/:id/:segment/:sub_id
async fn delete_item_action<R: Resource>(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, segment, sub_id)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult<DataResponse<R>> {
    if segment == DOCUMENTS_SEGMENT {
        return delete_document::<R>(&state, &auth, &id, &sub_id).await;
    }
    let route = ActionRoute::new(ActionMethod::Delete, segment, Some(sub_id));
    run_action::<R>(&state, &auth, &id, route, &body).await
}

async fn run_action<R: Resource>(
    state: &AppState,
    auth: &AuthContext,
    id: &str,
    route: ActionRoute,
    body: &Bytes,
) -> ApiResult<DataResponse<R>> {
    let payload: Value = parse_body(body)?;
    let action = R::Action::from_route(&route, payload)?;
    let ctx = ActionContext::new(auth.actor());

    let updated = state
        .records
        .modify::<R, _>(id, move |mut record| {
            record.apply(action, &ctx)?;
            record.validate()?;
            record.audit_mut().touch();
            Ok(record)
        })
        .await?;

    tracing::info!(
        user_id = %auth.user_id,
        resource = R::KIND,
        id = %id,
        action = %route.segment,
        "Applied action"
    );
    Ok(DataResponse::new(updated))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("multipart/form-data"))
}

fn documents_unsupported() -> ApiError {
    DomainError::unknown_action(&ActionRoute::post(DOCUMENTS_SEGMENT)).into()
}

async fn upload_document<R: Resource>(
    state: &AppState,
    auth: &AuthContext,
    id: &str,
    mut multipart: Multipart,
) -> ApiResult<DataResponse<R>> {
    let mut existing = state
        .records
        .get::<R>(id)
        .await?
        .ok_or_else(|| not_found::<R>(id))?;
    if existing.documents_mut().is_none() {
        return Err(documents_unsupported());
    }

    let mut file = None;
    let mut display_name = None;
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some(FILE_FIELD) => {
                let name = field.file_name().unwrap_or("document").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await?;
                file = Some((name, content_type, data));
            }
            Some("name") => display_name = Some(field.text().await?),
            _ => {}
        }
    }
    let (file_name, content_type, data) = file.ok_or_else(|| {
        ApiError::bad_request(format!("multipart field `{}` is required", FILE_FIELD))
    })?;
    if data.is_empty() {
        return Err(ApiError::bad_request("uploaded file is empty"));
    }

    let document_id = Uuid::new_v4().to_string();
    state
        .uploads
        .save(R::KIND, id, &document_id, &data)
        .await?;

    let document = Document {
        id: document_id.clone(),
        name: display_name.unwrap_or(file_name),
        content_type,
        size_bytes: data.len() as u64,
        url: format!("{}/{}/{}/{}", R::PATH, id, DOCUMENTS_SEGMENT, document_id),
        uploaded_at: Utc::now(),
        uploaded_by: auth.actor(),
    };

    let result = state
        .records
        .modify::<R, _>(id, move |mut record| {
            record
                .documents_mut()
                .ok_or_else(documents_unsupported)?
                .push(document);
            record.audit_mut().touch();
            Ok(record)
        })
        .await;

    if result.is_err() {
        state.uploads.remove(R::KIND, id, &document_id).await;
    }
    let updated = result?;

    tracing::info!(
        user_id = %auth.user_id,
        resource = R::KIND,
        id = %id,
        document_id = %document_id,
        bytes = data.len(),
        "Uploaded document"
    );
    Ok(DataResponse::new(updated))
}

async fn delete_document<R: Resource>(
    state: &AppState,
    auth: &AuthContext,
    id: &str,
    document_id: &str,
) -> ApiResult<DataResponse<R>> {
    let target = document_id.to_string();
    let updated = state
        .records
        .modify::<R, _>(id, move |mut record| {
            let documents = record
                .documents_mut()
                .ok_or_else(documents_unsupported)?;
            let before = documents.len();
            documents.retain(|d| d.id != target);
            if documents.len() == before {
                return Err(DomainError::NotFound(format!("document {}", target)).into());
            }
            record.audit_mut().touch();
            Ok(record)
        })
        .await?;

    state.uploads.remove(R::KIND, id, document_id).await;

    tracing::info!(
        user_id = %auth.user_id,
        resource = R::KIND,
        id = %id,
        document_id = %document_id,
        "Deleted document"
    );
    Ok(DataResponse::new(updated))
}

/// GET {PATH}/:id/documents/:document_id
async fn download_document<R: Resource>(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((id, segment, document_id)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    if segment != DOCUMENTS_SEGMENT {
        return Err(ApiError::not_found(format!("no such resource: {}", segment)));
    }

    let mut record = state
        .records
        .get::<R>(&id)
        .await?
        .ok_or_else(|| not_found::<R>(&id))?;
    let document = record
        .documents_mut()
        .and_then(|docs| docs.iter().find(|d| d.id == document_id).cloned())
        .ok_or_else(|| ApiError::not_found(format!("document {} not found", document_id)))?;

    let data = state.uploads.read(R::KIND, &id, &document_id).await?;

    let content_type = HeaderValue::from_str(&document.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
