use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request to '{path}' failed with status {status}")]
    Status { status: u16, path: String },
    #[error("Failed to decode image data: {0}")]
    Decode(String),
    #[error("Invalid image id: {0:?}")]
    InvalidId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Status { status: 404, .. } => "not_found",
            Self::Status { .. } => "http_status",
            Self::Decode(_) => "decode_error",
            Self::InvalidId(_) => "invalid_id",
            Self::Io(_) => "io_error",
            Self::Json(_) => "invalid_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_stable_error_codes() {
        let not_found = ApiError::Status {
            status: 404,
            path: "/images/7".to_string(),
        };
        assert_eq!(not_found.code(), "not_found");
        assert_eq!(
            not_found.to_string(),
            "Request to '/images/7' failed with status 404"
        );

        let unsupported = ApiError::Status {
            status: 415,
            path: "/images".to_string(),
        };
        assert_eq!(unsupported.code(), "http_status");
    }
}
