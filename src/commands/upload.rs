use crate::core::ImageFile;
use crate::output::{Spinner, emit_output, is_json_mode};
use crate::utils::{get_client, handle_error};
use bytesize::ByteSize;
use clap::ArgMatches;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct UploadOutput {
    file_name: String,
    content_type: String,
    size: usize,
}

pub async fn upload(matches: &ArgMatches) {
    let path = matches
        .get_one::<String>("file")
        .map(PathBuf::from)
        .unwrap_or_default();

    let file = ImageFile::open(&path)
        .await
        .unwrap_or_else(|e| handle_error(e));

    let summary = UploadOutput {
        file_name: file.file_name.clone(),
        content_type: file.content_type.clone(),
        size: file.data.len(),
    };

    let client = get_client(matches);

    let spinner = Spinner::start(format!(
        "Uploading '{}' ({})...",
        summary.file_name,
        ByteSize(summary.size as u64)
    ));

    if let Err(e) = client.upload_image(file).await {
        spinner.fail();
        handle_error(e);
    }

    spinner.finish("Image uploaded");

    if is_json_mode() {
        emit_output(&summary);
    }
}
