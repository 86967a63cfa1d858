use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Interactive,
    Json,
}

static OUTPUT_MODE: OnceLock<OutputMode> = OnceLock::new();

fn parse_mode(value: &str) -> OutputMode {
    match value.to_ascii_lowercase().as_str() {
        "interactive" => OutputMode::Interactive,
        _ => OutputMode::Json,
    }
}

/// Looks for `--mode` before clap runs so that even argument errors honour it.
pub fn detect_mode_from_args(args: &[String]) -> OutputMode {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--mode" {
            return iter
                .next()
                .map(|value| parse_mode(value))
                .unwrap_or(OutputMode::Json);
        } else if let Some(value) = arg.strip_prefix("--mode=") {
            return parse_mode(value);
        }
    }

    OutputMode::Interactive
}

pub fn set_output_mode(mode: OutputMode) {
    let _ = OUTPUT_MODE.set(mode);
}

pub fn output_mode() -> OutputMode {
    *OUTPUT_MODE.get_or_init(|| OutputMode::Interactive)
}

pub fn is_json_mode() -> bool {
    output_mode() == OutputMode::Json
}

#[derive(Serialize)]
struct Event<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: T,
}

#[derive(Serialize)]
struct ErrorData<'a> {
    message: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct ProgressData<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct TextData {
    text: String,
}

#[derive(Serialize)]
struct PanicData {
    message: String,
    code: &'static str,
    location: Option<String>,
}

fn render_event<T: Serialize>(kind: &str, data: &T) -> String {
    let event = Event { kind, data };
    serde_json::to_string(&event).unwrap_or_else(|e| {
        let fallback = Event {
            kind: "error",
            data: ErrorData {
                message: &e.to_string(),
                code: "serialization_error",
            },
        };
        serde_json::to_string(&fallback).unwrap_or_else(|_| {
            "{\"type\":\"error\",\"data\":{\"message\":\"serialization_error\",\"code\":\"serialization_error\"}}".to_string()
        })
    })
}

fn emit_event<T: Serialize>(kind: &'static str, data: &T, to_stderr: bool) {
    let json = render_event(kind, data);

    if to_stderr {
        eprintln!("{json}");
    } else {
        println!("{json}");
    }
}

pub fn emit_output<T: Serialize>(data: &T) {
    emit_event("output", data, false);
}

pub fn emit_help(text: String) {
    let payload = TextData { text };
    emit_event("help", &payload, false);
}

pub fn emit_version(text: String) {
    let payload = TextData { text };
    emit_event("version", &payload, false);
}

pub fn emit_error(message: &str, code: &str) -> ! {
    if is_json_mode() {
        let payload = ErrorData { message, code };
        emit_event("error", &payload, true);
    } else {
        eprintln!("{} {}", style("Error:").red().bold(), message);
    }
    std::process::exit(1);
}

pub fn init_panic_hook_if_json() {
    if !is_json_mode() {
        return;
    }

    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(value) = info.payload().downcast_ref::<&str>() {
            value.to_string()
        } else if let Some(value) = info.payload().downcast_ref::<String>() {
            value.clone()
        } else {
            "panic".to_string()
        };

        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()));

        let payload = PanicData {
            message,
            code: "panic",
            location,
        };

        emit_event("error", &payload, true);
    }));
}

/// Spinner in interactive mode, a single progress event in JSON mode.
pub struct Spinner {
    pb: Option<ProgressBar>,
}

impl Spinner {
    pub fn start(message: String) -> Self {
        if is_json_mode() {
            emit_event("progress", &ProgressData { message: &message }, false);
            return Self { pb: None };
        }

        let pb = ProgressBar::new(100);
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(template) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(message);

        Self { pb: Some(pb) }
    }

    pub fn finish(self, message: &str) {
        let Some(pb) = self.pb else {
            return;
        };

        let elapsed = pb.elapsed();
        if let Ok(template) = ProgressStyle::with_template("{prefix:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_prefix("✓");
        pb.finish_with_message(format!("{} ({:.2?})", message, elapsed));
    }

    pub fn fail(self) {
        if let Some(pb) = self.pb {
            pb.finish_and_clear();
        }
    }
}
