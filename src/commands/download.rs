use crate::core::{DataUrl, ImageId, extension_for, parse_data_url};
use crate::output::{Spinner, emit_output, is_json_mode};
use crate::utils::{get_client, handle_error};
use bytesize::ByteSize;
use clap::ArgMatches;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct DownloadOutput<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
}

/// A directory target gets a file named after the image id.
fn target_path(output: &Path, id: &ImageId, data: &DataUrl) -> PathBuf {
    if output.is_dir() {
        output.join(format!("{}.{}", id, extension_for(&data.media_type)))
    } else {
        output.to_path_buf()
    }
}

pub async fn download(matches: &ArgMatches) {
    let raw_id = matches.get_one::<String>("id").cloned().unwrap_or_default();
    let id = ImageId::parse(raw_id).unwrap_or_else(|e| handle_error(e));
    let output = matches.get_one::<String>("output").map(PathBuf::from);

    let client = get_client(matches);

    let spinner = Spinner::start(format!("Downloading image '{}'...", id));
    let data_url = match client.download_image(&id).await {
        Ok(data_url) => data_url,
        Err(e) => {
            spinner.fail();
            handle_error(e);
        }
    };

    let Some(output) = output else {
        spinner.finish("Image downloaded");
        if is_json_mode() {
            emit_output(&DownloadOutput {
                id: id.as_str(),
                data_url: Some(&data_url),
                path: None,
                size: None,
            });
        } else {
            println!("{data_url}");
        }
        return;
    };

    let data = parse_data_url(&data_url).unwrap_or_else(|e| handle_error(e));
    let path = target_path(&output, &id, &data);

    if let Err(e) = tokio::fs::write(&path, &data.data).await {
        spinner.fail();
        handle_error(e.into());
    }

    spinner.finish(&format!(
        "Saved {} to {}",
        ByteSize(data.data.len() as u64),
        path.display()
    ));

    if is_json_mode() {
        emit_output(&DownloadOutput {
            id: id.as_str(),
            data_url: None,
            path: Some(path.display().to_string()),
            size: Some(data.data.len()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_targets_are_named_after_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataUrl {
            media_type: "image/png".to_string(),
            data: vec![1],
        };
        let id = ImageId::parse("42").unwrap();

        assert_eq!(target_path(dir.path(), &id, &data), dir.path().join("42.png"));

        let file = dir.path().join("cat.jpg");
        assert_eq!(target_path(&file, &id, &data), file);
    }
}
