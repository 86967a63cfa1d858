use crate::commands::config::{DEFAULT_SERVER, read_config};
use crate::core::ImageApiClient;
use crate::error::ApiError;
use crate::output::emit_error;
use crate::transport::build_transport;
use clap::ArgMatches;
use dirs::home_dir;
use std::path::{Path, PathBuf};

pub fn config_dir() -> Result<PathBuf, String> {
    home_dir()
        .map(|home| home.join(".imgc"))
        .ok_or_else(|| "Could not determine the home directory".to_string())
}

/// `--server` wins over the stored config, which wins over the default.
pub fn resolve_server(flag: Option<&String>, dir: Option<&Path>) -> String {
    if let Some(server) = flag {
        return server.clone();
    }

    dir.and_then(read_config)
        .map(|config| config.server)
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
}

pub fn get_client(matches: &ArgMatches) -> ImageApiClient {
    let dir = config_dir().ok();
    let server = resolve_server(matches.get_one::<String>("server"), dir.as_deref());

    ImageApiClient::new(build_transport(&server))
}

pub fn handle_error(err: ApiError) -> ! {
    emit_error(&err.to_string(), err.code())
}
