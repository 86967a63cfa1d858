use crate::error::ApiError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;

pub(crate) const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Raw bytes of a downloaded image together with the media type the server declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Blob {
    pub(crate) media_type: Option<String>,
    pub(crate) data: Bytes,
}

impl Blob {
    pub(crate) fn new(media_type: Option<String>, data: Bytes) -> Self {
        Self { media_type, data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataUrl {
    pub(crate) media_type: String,
    pub(crate) data: Vec<u8>,
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b"!#$&^_.+-".contains(&b))
}

fn is_media_type(value: &str) -> bool {
    value
        .split_once('/')
        .is_some_and(|(kind, subtype)| is_token(kind) && is_token(subtype))
}

/// Media type used in the data URL, without parameters such as `charset`.
/// A declared type that is not `type/subtype` cannot be embedded and fails the read.
fn essence(media_type: Option<&str>) -> Result<String, ApiError> {
    let essence = media_type
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_MEDIA_TYPE)
        .to_ascii_lowercase();

    if !is_media_type(&essence) {
        return Err(ApiError::Decode(format!("invalid media type {:?}", essence)));
    }

    Ok(essence)
}

pub(crate) fn encode_data_url(blob: &Blob) -> Result<String, ApiError> {
    Ok(format!(
        "data:{};base64,{}",
        essence(blob.media_type.as_deref())?,
        STANDARD.encode(&blob.data)
    ))
}

/// Reads the blob into a data URL on the blocking pool and waits for the read to finish.
/// The read is not cancellable: dropping the future leaves it running to completion.
pub(crate) async fn decode_blob_to_data_url(blob: Blob) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || encode_data_url(&blob))
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?
}

pub(crate) fn parse_data_url(value: &str) -> Result<DataUrl, ApiError> {
    let (header, payload) = value
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| ApiError::Decode("not a data URL".to_string()))?;

    let mut params = header.split(';');
    let media_type = match params.next().unwrap_or_default() {
        "" => DEFAULT_MEDIA_TYPE.to_string(),
        value => value.to_string(),
    };

    if params.next_back() != Some("base64") {
        return Err(ApiError::Decode(
            "only base64 data URLs are supported".to_string(),
        ));
    }

    let data = STANDARD
        .decode(payload)
        .map_err(|e| ApiError::Decode(e.to_string()))?;

    Ok(DataUrl { media_type, data })
}
