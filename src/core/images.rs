use crate::core::data_url::{Blob, decode_blob_to_data_url};
use crate::core::models::{ImageFile, ImageId};
use crate::error::ApiError;
use crate::transport::{FormPart, HttpTransport, MultipartForm, RequestBody, RequestOptions};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

pub(crate) const BASE_PATH: &str = "/images";
pub(crate) const FILE_FIELD: &str = "file";

const FETCHING: &str = "fetching images";
const DOWNLOADING: &str = "downloading image";
const UPLOADING: &str = "uploading image";
const DELETING: &str = "deleting image";

/// `/images/{id}` with the id percent-encoded as exactly one path segment.
fn image_path(id: &ImageId) -> Result<String, ApiError> {
    let mut url = Url::parse(&format!("http://localhost{}", BASE_PATH))
        .map_err(|e| ApiError::InvalidId(format!("{}: {}", id.as_str(), e)))?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(id.as_str());
    }
    Ok(url.path().to_string())
}

fn log_failure(operation: &'static str) -> impl FnOnce(&ApiError) {
    move |e: &ApiError| error!(operation, error = %e, "Error {}", operation)
}

/// Client for the image service. Every call is one request; failures are logged
/// once and handed back to the caller untouched.
#[derive(Clone)]
pub(crate) struct ImageApiClient {
    transport: Arc<dyn HttpTransport>,
}

impl ImageApiClient {
    pub(crate) fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub(crate) async fn list_images(&self) -> Result<Value, ApiError> {
        debug!(path = BASE_PATH, "{}", FETCHING);

        self.fetch_listing()
            .await
            .inspect_err(log_failure(FETCHING))
    }

    pub(crate) async fn download_image(&self, id: &ImageId) -> Result<String, ApiError> {
        let path = image_path(id).inspect_err(log_failure(DOWNLOADING))?;
        debug!(path = %path, "{}", DOWNLOADING);

        self.fetch_data_url(&path)
            .await
            .inspect_err(log_failure(DOWNLOADING))
    }

    pub(crate) async fn upload_image(&self, file: ImageFile) -> Result<(), ApiError> {
        debug!(path = BASE_PATH, file = %file.file_name, "{}", UPLOADING);

        let form = MultipartForm::new().append(FormPart {
            name: FILE_FIELD.to_string(),
            file_name: Some(file.file_name),
            content_type: Some(file.content_type),
            data: file.data,
        });
        let options = RequestOptions::default().with_header("Content-Type", "multipart/form-data");

        self.transport
            .post(BASE_PATH, RequestBody::Multipart(form), &options)
            .await
            .map(|_| ())
            .inspect_err(log_failure(UPLOADING))
    }

    pub(crate) async fn delete_image(&self, id: &ImageId) -> Result<(), ApiError> {
        let path = image_path(id).inspect_err(log_failure(DELETING))?;
        debug!(path = %path, "{}", DELETING);

        self.transport
            .delete(&path)
            .await
            .map(|_| ())
            .inspect_err(log_failure(DELETING))
    }

    async fn fetch_listing(&self) -> Result<Value, ApiError> {
        let resp = self
            .transport
            .get(BASE_PATH, &RequestOptions::default())
            .await?;
        debug!(status = resp.status, bytes = resp.body.len(), "listing received");
        resp.json()
    }

    async fn fetch_data_url(&self, path: &str) -> Result<String, ApiError> {
        let resp = self.transport.get(path, &RequestOptions::blob()).await?;
        decode_blob_to_data_url(Blob::new(resp.content_type, resp.body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_url::parse_data_url;
    use crate::transport::{Response, ResponseType};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Debug, Clone, PartialEq)]
    struct RecordedRequest {
        method: &'static str,
        path: String,
        body: Option<RequestBody>,
        options: Option<RequestOptions>,
    }

    /// In-memory transport: serves canned responses keyed by method and path,
    /// and records every request it sees.
    #[derive(Default)]
    struct RecordingTransport {
        responses: Mutex<HashMap<(&'static str, String), Result<Response, ApiError>>>,
        requests: Mutex<Vec<RecordedRequest>>,
        delay: Option<Duration>,
    }

    impl RecordingTransport {
        fn respond(self, method: &'static str, path: &str, response: Result<Response, ApiError>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert((method, path.to_string()), response);
            self
        }

        fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        async fn handle(&self, request: RecordedRequest) -> Result<Response, ApiError> {
            let key = (request.method, request.path.clone());
            self.requests.lock().unwrap().push(request);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let path = key.1.clone();
            self.responses
                .lock()
                .unwrap()
                .remove(&key)
                .unwrap_or(Err(ApiError::Status { status: 404, path }))
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn get(&self, path: &str, options: &RequestOptions) -> Result<Response, ApiError> {
            self.handle(RecordedRequest {
                method: "GET",
                path: path.to_string(),
                body: None,
                options: Some(options.clone()),
            })
            .await
        }

        async fn post(
            &self,
            path: &str,
            body: RequestBody,
            options: &RequestOptions,
        ) -> Result<Response, ApiError> {
            self.handle(RecordedRequest {
                method: "POST",
                path: path.to_string(),
                body: Some(body),
                options: Some(options.clone()),
            })
            .await
        }

        async fn delete(&self, path: &str) -> Result<Response, ApiError> {
            self.handle(RecordedRequest {
                method: "DELETE",
                path: path.to_string(),
                body: None,
                options: None,
            })
            .await
        }
    }

    fn ok(content_type: &str, body: &'static [u8]) -> Result<Response, ApiError> {
        Ok(Response {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: Bytes::from_static(body),
        })
    }

    fn empty_ok() -> Result<Response, ApiError> {
        Ok(Response {
            status: 200,
            content_type: None,
            body: Bytes::new(),
        })
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    fn client_for(transport: &Arc<RecordingTransport>) -> ImageApiClient {
        ImageApiClient::new(Arc::clone(transport) as Arc<dyn HttpTransport>)
    }

    #[tokio::test]
    async fn list_returns_server_body_unmodified() {
        let transport = Arc::new(RecordingTransport::default().respond(
            "GET",
            "/images",
            ok("application/json", br#"[{"id":"1"},{"id":"2"}]"#),
        ));
        let client = client_for(&transport);

        let images = client.list_images().await.unwrap();

        assert_eq!(images, serde_json::json!([{ "id": "1" }, { "id": "2" }]));
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/images");
        assert_eq!(
            requests[0].options.as_ref().map(|o| o.response_type),
            Some(ResponseType::Json)
        );
    }

    #[tokio::test]
    async fn download_converts_blob_to_data_url() {
        let transport = Arc::new(RecordingTransport::default().respond(
            "GET",
            "/images/42",
            ok("image/jpeg", &[0xFF, 0xD8, 0xFF]),
        ));
        let client = client_for(&transport);

        let url = client
            .download_image(&ImageId::parse("42").unwrap())
            .await
            .unwrap();

        assert_eq!(url, "data:image/jpeg;base64,/9j/");
        assert_eq!(parse_data_url(&url).unwrap().data, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(
            transport.requests()[0].options.as_ref().map(|o| o.response_type),
            Some(ResponseType::Blob)
        );
    }

    #[tokio::test]
    async fn upload_sends_one_multipart_file_field() {
        let transport = Arc::new(RecordingTransport::default().respond("POST", "/images", empty_ok()));
        let client = client_for(&transport);

        client
            .upload_image(ImageFile::new("cat.jpg", vec![1u8, 2, 3]))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/images");

        let Some(RequestBody::Multipart(form)) = &requests[0].body else {
            panic!("expected a multipart body, got {:?}", requests[0].body);
        };
        assert_eq!(form.parts.len(), 1);
        let part = &form.parts[0];
        assert_eq!(part.name, "file");
        assert_eq!(&part.data[..], &[1, 2, 3]);
        assert_eq!(part.file_name.as_deref(), Some("cat.jpg"));
        assert_eq!(part.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(
            requests[0].options.as_ref().map(|o| o.headers.clone()),
            Some(vec![(
                "Content-Type".to_string(),
                "multipart/form-data".to_string()
            )])
        );
    }

    #[tokio::test]
    async fn delete_sends_one_request_without_body() {
        let transport =
            Arc::new(RecordingTransport::default().respond("DELETE", "/images/42", empty_ok()));
        let client = client_for(&transport);

        client.delete_image(&ImageId::from(42)).await.unwrap();

        assert_eq!(
            transport.requests(),
            vec![RecordedRequest {
                method: "DELETE",
                path: "/images/42".to_string(),
                body: None,
                options: None,
            }]
        );
    }

    #[tokio::test]
    async fn failures_are_logged_then_returned_unchanged() {
        let transport = Arc::new(
            RecordingTransport::default()
                .respond(
                    "GET",
                    "/images",
                    Err(ApiError::Status {
                        status: 503,
                        path: "/images".to_string(),
                    }),
                )
                .respond(
                    "POST",
                    "/images",
                    Err(ApiError::Status {
                        status: 415,
                        path: "/images".to_string(),
                    }),
                ),
        );
        let client = client_for(&transport);
        let (logs, _guard) = capture_logs();

        let err = client.list_images().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, ref path } if path == "/images"));
        assert!(logs.contents().contains("Error fetching images"));

        let err = client
            .download_image(&ImageId::from(9))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, ref path } if path == "/images/9"));
        assert!(logs.contents().contains("Error downloading image"));

        let err = client
            .upload_image(ImageFile::new("notes.txt", vec![0u8]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 415, .. }));
        assert!(logs.contents().contains("Error uploading image"));

        let err = client.delete_image(&ImageId::from(9)).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
        assert!(logs.contents().contains("Error deleting image"));

        assert_eq!(logs.contents().matches("ERROR").count(), 4);
    }

    #[tokio::test]
    async fn blob_read_failure_is_logged_once_and_returned() {
        let transport = Arc::new(RecordingTransport::default().respond(
            "GET",
            "/images/5",
            ok("image/jpeg,evil", &[0xFF, 0xD8]),
        ));
        let client = client_for(&transport);
        let (logs, _guard) = capture_logs();

        let err = client
            .download_image(&ImageId::from(5))
            .await
            .unwrap_err();

        let ApiError::Decode(message) = &err else {
            panic!("expected a decode error, got {err:?}");
        };
        assert!(message.contains("image/jpeg,evil"));
        assert!(logs.contents().contains("Error downloading image"));
        assert_eq!(logs.contents().matches("ERROR").count(), 1);
    }

    #[test]
    fn image_paths_hold_the_id_as_one_encoded_segment() {
        let path = |value: &str| image_path(&ImageId::parse(value).unwrap()).unwrap();

        assert_eq!(image_path(&ImageId::from(42)).unwrap(), "/images/42");
        assert_eq!(path("a?x=1"), "/images/a%3Fx=1");
        assert_eq!(path("a#frag"), "/images/a%23frag");
        assert_eq!(path("%2e%2e"), "/images/%252e%252e");
        assert_eq!(path("a b"), "/images/a%20b");
    }

    #[tokio::test]
    async fn invalid_json_listing_is_reported() {
        let transport = Arc::new(RecordingTransport::default().respond(
            "GET",
            "/images",
            ok("text/html", b"<html>oops</html>"),
        ));
        let client = client_for(&transport);

        let err = client.list_images().await.unwrap_err();

        assert!(matches!(err, ApiError::Json(_)));
    }

    #[tokio::test]
    async fn concurrent_downloads_do_not_interfere() {
        let transport = Arc::new(RecordingTransport {
            delay: Some(Duration::from_millis(10)),
            ..RecordingTransport::default()
        }
        .respond("GET", "/images/1", ok("image/png", b"first"))
        .respond("GET", "/images/2", ok("image/gif", b"second")));
        let client = client_for(&transport);

        let first_id = ImageId::from(1);
        let second_id = ImageId::from(2);

        let (first, second) = tokio::join!(
            client.download_image(&first_id),
            client.download_image(&second_id),
        );

        let first = parse_data_url(&first.unwrap()).unwrap();
        let second = parse_data_url(&second.unwrap()).unwrap();
        assert_eq!((first.media_type.as_str(), first.data.as_slice()), ("image/png", &b"first"[..]));
        assert_eq!((second.media_type.as_str(), second.data.as_slice()), ("image/gif", &b"second"[..]));
        assert_eq!(transport.requests().len(), 2);
    }
}
