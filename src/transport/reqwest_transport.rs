use crate::error::ApiError;
use crate::transport::{
    HttpTransport, MultipartForm, RequestBody, RequestOptions, Response, ResponseType,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use reqwest::multipart::{Form, Part};
use tracing::debug;

pub struct ReqwestTransport {
    client: Client,
    server: String,
}

impl ReqwestTransport {
    pub fn new(server: &str) -> Self {
        Self {
            client: Client::new(),
            server: server.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    async fn send(
        &self,
        path: &str,
        mut request: RequestBuilder,
        options: Option<&RequestOptions>,
    ) -> Result<Response, ApiError> {
        if let Some(options) = options {
            let accept = match options.response_type {
                ResponseType::Json => "application/json",
                ResponseType::Blob => "*/*",
            };
            request = request.header(header::ACCEPT, accept);

            for (name, value) in &options.headers {
                // reqwest sets its own multipart content-type with the boundary
                if name.eq_ignore_ascii_case("content-type") && value.starts_with("multipart/") {
                    continue;
                }
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let resp = request.send().await?;
        let status = resp.status();
        debug!(path, status = status.as_u16(), "response received");

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        Ok(Response {
            status: status.as_u16(),
            content_type,
            body: resp.bytes().await?,
        })
    }
}

fn build_form(form: MultipartForm) -> Result<Form, ApiError> {
    let mut multipart = Form::new();

    for field in form.parts {
        let mut part = Part::bytes(field.data.to_vec());
        if let Some(file_name) = field.file_name {
            part = part.file_name(file_name);
        }
        if let Some(content_type) = field.content_type {
            part = part.mime_str(&content_type)?;
        }
        multipart = multipart.part(field.name, part);
    }

    Ok(multipart)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, path: &str, options: &RequestOptions) -> Result<Response, ApiError> {
        let request = self.client.get(self.url(path));
        self.send(path, request, Some(options)).await
    }

    async fn post(
        &self,
        path: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<Response, ApiError> {
        let mut request = self.client.post(self.url(path));
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Multipart(form) => request.multipart(build_form(form)?),
        };
        self.send(path, request, Some(options)).await
    }

    async fn delete(&self, path: &str) -> Result<Response, ApiError> {
        let request = self.client.delete(self.url(path));
        self.send(path, request, None).await
    }
}
