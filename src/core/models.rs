use crate::error::ApiError;
use bytes::Bytes;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ImageId(String);

impl ImageId {
    /// Ids are opaque and kept exactly as given. They must not be blank, must not
    /// contain `/`, and must not be the dot segments `.` or `..`, so that every id
    /// addresses exactly one resource under the images path.
    pub(crate) fn parse(value: impl Into<String>) -> Result<Self, ApiError> {
        let value = value.into();

        if value.trim().is_empty() || value.contains('/') || value == "." || value == ".." {
            return Err(ApiError::InvalidId(value));
        }

        Ok(Self(value))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ImageId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageFile {
    pub(crate) file_name: String,
    pub(crate) content_type: String,
    pub(crate) data: Bytes,
}

impl ImageFile {
    pub(crate) fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = media_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    pub(crate) async fn open(path: &Path) -> Result<Self, ApiError> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self::new(file_name, data))
    }
}

pub(crate) fn media_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub(crate) fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}
