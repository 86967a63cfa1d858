use crate::core::{ImageApiClient, ImageId};
use crate::error::ApiError;
use crate::output::{Spinner, emit_error, emit_output, is_json_mode};
use crate::utils::{get_client, handle_error};
use clap::ArgMatches;
use console::style;
use dialoguer::Confirm;
use futures::future::join_all;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DeleteResult {
    id: String,
    deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_ids(values: Vec<String>) -> Result<Vec<ImageId>, ApiError> {
    let mut ids: Vec<ImageId> = Vec::new();

    for value in values {
        let id = ImageId::parse(value)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    Ok(ids)
}

/// Each id is its own request; one failure does not stop the others.
async fn delete_all(client: &ImageApiClient, ids: &[ImageId]) -> Vec<DeleteResult> {
    let results = join_all(ids.iter().map(|id| client.delete_image(id))).await;

    ids.iter()
        .zip(results)
        .map(|(id, result)| DeleteResult {
            id: id.to_string(),
            deleted: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        })
        .collect()
}

pub async fn delete(matches: &ArgMatches) {
    let values = matches
        .get_many::<String>("id")
        .map(|values| values.cloned().collect::<Vec<String>>())
        .unwrap_or_default();
    let ids = parse_ids(values).unwrap_or_else(|e| handle_error(e));

    if ids.is_empty() {
        emit_error("At least one image id is required", "missing_argument");
    }

    let confirmed = matches.get_flag("yes") || is_json_mode() || {
        let listed = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<String>>()
            .join(", ");
        Confirm::new()
            .with_prompt(format!("Delete image(s) {}?", listed))
            .default(false)
            .interact()
            .unwrap_or_else(|e| emit_error(&e.to_string(), "prompt_error"))
    };

    if !confirmed {
        println!("{}", style("Aborted.").yellow());
        return;
    }

    let client = get_client(matches);

    let spinner = Spinner::start(format!("Deleting {} image(s)...", ids.len()));
    let results = delete_all(&client, &ids).await;
    let failed = results.iter().filter(|result| !result.deleted).count();

    if failed == 0 {
        spinner.finish("Image(s) deleted");
    } else {
        spinner.fail();
    }

    if is_json_mode() {
        emit_output(&results);
    } else {
        for result in results.iter().filter(|result| !result.deleted) {
            eprintln!(
                "{} {}: {}",
                style("Failed").red(),
                result.id,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
