//! Response envelopes
//!
//! Every successful body is `{ "data": ... }`; lists add a `meta` block.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Single record
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for DataResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub resource: &'static str,
    pub total: usize,
}

/// Filtered collection of one resource type
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(resource: &'static str, data: Vec<T>) -> Self {
        let total = data.len();
        Self {
            data,
            meta: ListMeta { resource, total },
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Body-less outcome such as a deletion
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub code: &'static str,
}

impl MessageResponse {
    pub fn deleted(kind: &str, id: &str) -> Self {
        Self {
            message: format!("{} record {} deleted", kind, id),
            code: "DELETED",
        }
    }
}

impl IntoResponse for MessageResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// 201 with a `Location` header pointing at the new record
pub struct Created<T: Serialize> {
    pub location: String,
    pub body: T,
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::CREATED, Json(self.body)).into_response();
        if let Ok(location) = HeaderValue::from_str(&self.location) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_meta_counts_records() {
        let body = serde_json::to_value(ListResponse::new("families", vec!["a", "b"])).unwrap();
        assert_eq!(body["meta"]["total"], 2);
        assert_eq!(body["meta"]["resource"], "families");
        assert_eq!(body["data"][1], "b");
    }

    #[test]
    fn created_sets_location() {
        let response = Created {
            location: "/culture/events/e1".to_string(),
            body: DataResponse::new("e1"),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/culture/events/e1");
    }
}
