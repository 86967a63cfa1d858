mod http_transport;
mod reqwest_transport;

use std::sync::Arc;

pub use http_transport::{
    FormPart, HttpTransport, MultipartForm, RequestBody, RequestOptions, Response, ResponseType,
};
pub use reqwest_transport::ReqwestTransport;

pub fn build_transport(server: &str) -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestTransport::new(server))
}
