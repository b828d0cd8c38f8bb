use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use billed_core::config::{AppConfig, LoadOptions, CONFIG_FILE_NAME};
use toml::Value;

use crate::commands::{exit, CommandResult};

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                exit::INPUT,
            )
        }
    };

    CommandResult { exit_code: 0, output: render(&config, config_path) }
}

/// One line per key with the layer it came from.
pub fn render(config: &AppConfig, config_path: Option<&Path>) -> String {
    let file_path = config_path.map(Path::to_path_buf).or_else(detect_config_path);
    let file_doc = load_config_file_doc(file_path.as_deref());

    let fields = [
        Field {
            key: "store.timeout_ms",
            env_keys: &["BILLED_STORE_TIMEOUT_MS"],
            value: config.store.timeout_ms.to_string(),
        },
        Field {
            key: "receipts.allowed_media_types",
            env_keys: &["BILLED_RECEIPTS_ALLOWED_MEDIA_TYPES"],
            value: config.receipts.allowed_media_types.join(","),
        },
        Field {
            key: "display.locale",
            env_keys: &["BILLED_DISPLAY_LOCALE"],
            value: config.display.locale.to_string(),
        },
        Field {
            key: "display.modal_width_px",
            env_keys: &["BILLED_DISPLAY_MODAL_WIDTH_PX"],
            value: config.display.modal_width_px.to_string(),
        },
        Field {
            key: "logging.level",
            env_keys: &["BILLED_LOGGING_LEVEL", "BILLED_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["BILLED_LOGGING_FORMAT", "BILLED_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, file_doc.as_ref(), file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = file_doc {
        if contains_path(doc, field.key) {
            let file_path = file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
