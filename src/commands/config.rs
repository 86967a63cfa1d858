use crate::output::{Spinner, emit_error, emit_output, is_json_mode};
use crate::utils::config_dir;
use clap::ArgMatches;
use dialoguer::Input;
use rmp_serde::Serializer;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SERVER: &str = "http://localhost:8080";
const CONFIG_FILE: &str = "config.msgpack";

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub server: String,
}

pub fn is_valid_server(server: &str) -> bool {
    let pattern = regex::Regex::new(r"^https?://[^\s/?#]+(:\d+)?/?$");
    pattern.map(|p| p.is_match(server)).unwrap_or(false)
}

pub fn read_config(dir: &Path) -> Option<Config> {
    let contents = std::fs::read(dir.join(CONFIG_FILE)).ok()?;
    rmp_serde::from_slice(&contents).ok()
}

pub fn write_config(dir: &Path, config: &Config) -> Result<(), String> {
    let mut buf = Vec::new();
    config
        .serialize(&mut Serializer::new(&mut buf))
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
    }

    std::fs::write(dir.join(CONFIG_FILE), buf).map_err(|e| format!("Failed to write config: {}", e))
}

pub fn config(matches: &ArgMatches) {
    let server = matches.get_one::<String>("server").map_or_else(
        || {
            if is_json_mode() {
                emit_error("Missing required argument: --server", "missing_argument");
            }

            Input::<String>::new()
                .with_prompt("Enter the image server URL (e.g. 'http://localhost:8080')")
                .default(DEFAULT_SERVER.to_string())
                .interact_text()
                .unwrap_or_else(|e| emit_error(&e.to_string(), "prompt_error"))
        },
        |server| server.to_string(),
    );

    if !is_valid_server(&server) {
        emit_error(
            "The server must be an http(s) origin like 'http://localhost:8080'",
            "invalid_server",
        );
    }

    let dir = config_dir().unwrap_or_else(|e| emit_error(&e, "config_error"));

    let spinner = Spinner::start("Writing config...".to_string());

    let config = Config { server };
    if let Err(e) = write_config(&dir, &config) {
        spinner.fail();
        emit_error(&e, "config_error");
    }

    if is_json_mode() {
        emit_output(&config);
    }
    spinner.finish("Config written");
}
