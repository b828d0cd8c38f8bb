use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::Locale;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub receipts: ReceiptConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub timeout_ms: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Clone, Debug)]
pub struct ReceiptConfig {
    pub allowed_media_types: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub locale: Locale,
    pub modal_width_px: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub store_timeout_ms: Option<u64>,
    pub allowed_media_types: Option<Vec<String>>,
    pub locale: Option<Locale>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_ALLOWED_MEDIA_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

pub const CONFIG_FILE_NAME: &str = "billed.toml";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig { timeout_ms: 10_000 },
            receipts: ReceiptConfig {
                allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES
                    .iter()
                    .map(|media_type| media_type.to_string())
                    .collect(),
            },
            display: DisplayConfig { locale: Locale::Fr, modal_width_px: 800 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(store) = patch.store {
            if let Some(timeout_ms) = store.timeout_ms {
                self.store.timeout_ms = timeout_ms;
            }
        }

        if let Some(receipts) = patch.receipts {
            if let Some(allowed_media_types) = receipts.allowed_media_types {
                self.receipts.allowed_media_types = allowed_media_types;
            }
        }

        if let Some(display) = patch.display {
            if let Some(locale) = display.locale {
                self.display.locale = locale;
            }
            if let Some(modal_width_px) = display.modal_width_px {
                self.display.modal_width_px = modal_width_px;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BILLED_STORE_TIMEOUT_MS") {
            self.store.timeout_ms = parse_u64("BILLED_STORE_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("BILLED_RECEIPTS_ALLOWED_MEDIA_TYPES") {
            self.receipts.allowed_media_types = split_list(&value);
        }

        if let Some(value) = read_env("BILLED_DISPLAY_LOCALE") {
            self.display.locale = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "BILLED_DISPLAY_LOCALE".to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = read_env("BILLED_DISPLAY_MODAL_WIDTH_PX") {
            self.display.modal_width_px = parse_u32("BILLED_DISPLAY_MODAL_WIDTH_PX", &value)?;
        }

        let log_level = read_env("BILLED_LOGGING_LEVEL").or_else(|| read_env("BILLED_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BILLED_LOGGING_FORMAT").or_else(|| read_env("BILLED_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(timeout_ms) = overrides.store_timeout_ms {
            self.store.timeout_ms = timeout_ms;
        }
        if let Some(allowed_media_types) = overrides.allowed_media_types {
            self.receipts.allowed_media_types = allowed_media_types;
        }
        if let Some(locale) = overrides.locale {
            self.display.locale = locale;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_receipts(&self.receipts)?;
        validate_display(&self.display)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.timeout_ms == 0 || store.timeout_ms > 300_000 {
        return Err(ConfigError::Validation(
            "store.timeout_ms must be in range 1..=300000".to_string(),
        ));
    }
    Ok(())
}

fn validate_receipts(receipts: &ReceiptConfig) -> Result<(), ConfigError> {
    if receipts.allowed_media_types.is_empty() {
        return Err(ConfigError::Validation(
            "receipts.allowed_media_types must list at least one media type".to_string(),
        ));
    }

    if let Some(bad) = receipts
        .allowed_media_types
        .iter()
        .find(|media_type| !media_type.contains('/') || media_type.trim().len() < 3)
    {
        return Err(ConfigError::Validation(format!(
            "receipts.allowed_media_types entry `{bad}` is not a media type (expected type/subtype)"
        )));
    }

    Ok(())
}

fn validate_display(display: &DisplayConfig) -> Result<(), ConfigError> {
    if display.modal_width_px == 0 {
        return Err(ConfigError::Validation(
            "display.modal_width_px must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    store: Option<StorePatch>,
    receipts: Option<ReceiptsPatch>,
    display: Option<DisplayPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ReceiptsPatch {
    allowed_media_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayPatch {
    locale: Option<Locale>,
    modal_width_px: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
