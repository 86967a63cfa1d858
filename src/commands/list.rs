use crate::output::{Spinner, emit_output, is_json_mode};
use crate::utils::{get_client, handle_error};
use clap::ArgMatches;
use console::style;
use serde_json::Value;
use tabled::{Table, Tabled};

#[derive(Debug, PartialEq, Tabled)]
struct ImageRow {
    id: String,
    name: String,
}

fn field(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(value) => value.to_string(),
    }
}

/// Rows for the listing table, or `None` when the server's shape is not a list of objects.
fn image_rows(images: &Value) -> Option<Vec<ImageRow>> {
    let entries = images.as_array()?;

    entries
        .iter()
        .map(|entry| {
            entry.is_object().then(|| ImageRow {
                id: field(entry, "id"),
                name: field(entry, "name"),
            })
        })
        .collect()
}

pub async fn list(matches: &ArgMatches) {
    let client = get_client(matches);

    let spinner = Spinner::start("Fetching images...".to_string());
    let images = match client.list_images().await {
        Ok(images) => images,
        Err(e) => {
            spinner.fail();
            handle_error(e);
        }
    };

    if is_json_mode() {
        emit_output(&images);
        return;
    }

    match image_rows(&images) {
        Some(rows) if rows.is_empty() => {
            spinner.finish("No images");
            println!("{}", style("The server has no images yet.").yellow());
        }
        Some(rows) => {
            spinner.finish(&format!("{} image(s)", rows.len()));
            println!("{}", Table::new(rows));
        }
        None => {
            spinner.finish("Images fetched");
            let pretty = serde_json::to_string_pretty(&images).unwrap_or_else(|_| images.to_string());
            println!("{pretty}");
        }
    }
}
