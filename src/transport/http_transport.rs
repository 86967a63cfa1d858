use crate::error::ApiError;
use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Json,
    Blob,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn blob() -> Self {
        Self {
            response_type: ResponseType::Blob,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, part: FormPart) -> Self {
        self.parts.push(part);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Multipart(MultipartForm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Response {
    /// Parses the body as JSON. An empty body parses as `null`.
    pub fn json(&self) -> Result<serde_json::Value, ApiError> {
        if self.body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, path: &str, options: &RequestOptions) -> Result<Response, ApiError>;
    async fn post(
        &self,
        path: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<Response, ApiError>;
    async fn delete(&self, path: &str) -> Result<Response, ApiError>;
}
