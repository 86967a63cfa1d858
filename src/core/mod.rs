mod data_url;
mod images;
mod models;

pub(crate) use data_url::{DataUrl, parse_data_url};
pub(crate) use images::ImageApiClient;
pub(crate) use models::{ImageFile, ImageId, extension_for};
