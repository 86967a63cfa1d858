use clap::error::ErrorKind;
use clap::{Arg, ArgAction, Command, arg};

use crate::output::{
    OutputMode, detect_mode_from_args, emit_error, emit_help, emit_version,
    init_panic_hook_if_json,
};

mod commands;
mod core;
mod error;
mod logging;
mod output;
mod transport;
mod utils;

fn cli() -> Command {
    Command::new("imgc")
        .about("A command-line client for the image storage service")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(--server <URL> "The image server origin (default: stored config or http://localhost:8080)")
                .required(false)
                .global(true),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Output mode")
                .value_parser(["interactive", "json"])
                .global(true),
        )
        .arg(
            arg!(-v --verbose "Log every request to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("config")
                .about("Store the image server to talk to"),
        )
        .subcommand(
            Command::new("list")
                .about("List all images stored on the server"),
        )
        .subcommand(
            Command::new("download")
                .about("Download an image as a data URL, or save it to a file")
                .arg(arg!(<ID> "The id of the image").id("id"))
                .arg(arg!(-o --output <OUTPUT> "Write the image bytes to this file or directory").required(false)),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload an image file")
                .arg(arg!(<FILE> "The image file to upload").id("file")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete one or more images")
                .arg(
                    Arg::new("id")
                        .value_name("ID")
                        .help("The ids of the images to delete")
                        .required(true)
                        .num_args(1..),
                )
                .arg(arg!(-y --yes "Do not ask for confirmation").action(ArgAction::SetTrue)),
        )
}

#[derive(Debug, PartialEq, Eq)]
enum ParseOutcome {
    Help,
    Version,
    Invalid,
}

fn parse_outcome(kind: ErrorKind) -> ParseOutcome {
    match kind {
        ErrorKind::DisplayHelp => ParseOutcome::Help,
        ErrorKind::DisplayVersion => ParseOutcome::Version,
        _ => ParseOutcome::Invalid,
    }
}

/// JSON-mode counterpart of `clap::Error::exit`.
fn report_parse_error(e: clap::Error) -> ! {
    let text = e.render().to_string();

    match parse_outcome(e.kind()) {
        ParseOutcome::Help => {
            emit_help(text);
            std::process::exit(0);
        }
        ParseOutcome::Version => {
            emit_version(text.trim().to_string());
            std::process::exit(0);
        }
        ParseOutcome::Invalid => emit_error(text.trim(), "invalid_arguments"),
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mode = detect_mode_from_args(&args);
    output::set_output_mode(mode);
    init_panic_hook_if_json();

    let matches = match cli().try_get_matches_from(&args) {
        Ok(matches) => matches,
        Err(e) if mode == OutputMode::Json => report_parse_error(e),
        Err(e) => e.exit(),
    };

    logging::init_tracing(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("config", matches)) => commands::config(matches),
        Some(("list", matches)) => commands::list(matches).await,
        Some(("download", matches)) => commands::download(matches).await,
        Some(("upload", matches)) => commands::upload(matches).await,
        Some(("delete", matches)) => commands::delete(matches).await,
        _ => emit_error(
            "Invalid command! Run 'imgc --help' for more information.",
            "invalid_command",
        ),
    }
}
