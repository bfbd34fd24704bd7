use reqwest::{multipart, Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::envelope::{unwrap_list, unwrap_record};
use super::ClientError;
use crate::domain::{ActionMethod, Resource, SubResourceAction};
use crate::error::ErrorResponse;

/// A file to attach to a record
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Display name; the file name is used when absent
    pub name: Option<String>,
}

/// Client for the portal REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        debug!(base_url = base_url, "API client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "API request");

        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request and return its decoded JSON body
    async fn send(&self, req: RequestBuilder) -> Result<Value, ClientError> {
        let response = req.send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let error_body = response.json::<ErrorResponse>().await.ok();
        let (code, message) = match error_body {
            Some(body) if !body.message.trim().is_empty() => (Some(body.code), body.message),
            Some(body) => (Some(body.code), format!("Request failed with status {}", status)),
            None => (None, format!("Request failed with status {}", status)),
        };

        warn!(status = %status, message = %message, "API error response");
        Err(ClientError::Status {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// GET {PATH} with `filters` as query parameters
    pub async fn list<R: Resource>(&self, filters: &R::Filters) -> Result<Vec<R>, ClientError> {
        let body = self
            .send(self.request(Method::GET, R::PATH).query(filters))
            .await?;
        unwrap_list(body)
    }

    pub async fn get<R: Resource>(&self, id: &str) -> Result<R, ClientError> {
        let path = format!("{}/{}", R::PATH, id);
        let body = self.send(self.request(Method::GET, &path)).await?;
        unwrap_record(body)
    }

    pub async fn create<R: Resource>(&self, data: &R::Create) -> Result<R, ClientError> {
        let body = self
            .send(self.request(Method::POST, R::PATH).json(data))
            .await?;
        unwrap_record(body)
    }

    pub async fn update<R: Resource>(&self, id: &str, data: &R::Update) -> Result<R, ClientError> {
        let path = format!("{}/{}", R::PATH, id);
        let body = self
            .send(self.request(Method::PUT, &path).json(data))
            .await?;
        unwrap_record(body)
    }

    pub async fn delete<R: Resource>(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("{}/{}", R::PATH, id);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    /// Run a sub-resource action and return the updated parent record
    pub async fn act<R: Resource>(&self, id: &str, action: &R::Action) -> Result<R, ClientError> {
        let route = action.route();
        let method = match route.method {
            ActionMethod::Post => Method::POST,
            ActionMethod::Put => Method::PUT,
            ActionMethod::Delete => Method::DELETE,
        };
        let payload = action.payload()?;

        let mut req = self.request(method, &route.path(R::PATH, id));
        if !payload.is_null() {
            req = req.json(&payload);
        }

        let body = self.send(req).await?;
        unwrap_record(body)
    }

    /// Upload a document as `multipart/form-data`
    pub async fn upload_document<R: Resource>(
        &self,
        id: &str,
        upload: DocumentUpload,
    ) -> Result<R, ClientError> {
        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(name) = upload.name {
            form = form.text("name", name);
        }

        let path = format!("{}/{}/documents", R::PATH, id);
        let body = self
            .send(self.request(Method::POST, &path).multipart(form))
            .await?;
        unwrap_record(body)
    }

    /// Check API health
    pub async fn health_check(&self) -> Result<(), ClientError> {
        self.send(
            self.request(Method::GET, "/health")
                .timeout(Duration::from_secs(5)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_urls() {
        assert!(matches!(
            ApiClient::new("not a url", 5),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://example.org", 5),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
