use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ipfabric: IpfabricConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct IpfabricConfig {
    pub url: String,
    pub token: SecretString,
    pub verify_tls: bool,
    pub timeout_secs: u64,
    pub api_version: String,
    pub snapshot_id: Option<String>,
    pub page_size: u32,
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
    pub snapshot_id: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ipfabric: IpfabricConfig {
                url: String::new(),
                token: String::new().into(),
                verify_tls: true,
                timeout_secs: 60,
                api_version: "v7.0".to_string(),
                snapshot_id: None,
                page_size: 1000,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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

impl IpfabricConfig {
    /// Versioned API root, e.g. `https://ipf.example.com/api/v7.0`.
    pub fn api_base(&self) -> String {
        format!("{}/api/{}", self.url.trim().trim_end_matches('/'), self.api_version.trim())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(ipfabric) = patch.ipfabric {
            if let Some(url) = ipfabric.url {
                self.ipfabric.url = url;
            }
            if let Some(ipfabric_token_value) = ipfabric.token {
                self.ipfabric.token = secret_value(ipfabric_token_value);
            }
            if let Some(verify_tls) = ipfabric.verify_tls {
                self.ipfabric.verify_tls = verify_tls;
            }
            if let Some(timeout_secs) = ipfabric.timeout_secs {
                self.ipfabric.timeout_secs = timeout_secs;
            }
            if let Some(api_version) = ipfabric.api_version {
                self.ipfabric.api_version = api_version;
            }
            if let Some(snapshot_id) = ipfabric.snapshot_id {
                self.ipfabric.snapshot_id = Some(snapshot_id);
            }
            if let Some(page_size) = ipfabric.page_size {
                self.ipfabric.page_size = page_size;
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
        if let Some(value) = read_env("IPF_URL") {
            self.ipfabric.url = value;
        }
        if let Some(value) = read_env("IPF_TOKEN") {
            self.ipfabric.token = secret_value(value);
        }
        if let Some(value) = read_env("IPF_VERIFY") {
            self.ipfabric.verify_tls = parse_flag("IPF_VERIFY", &value)?;
        }
        if let Some(value) = read_env("IPF_TIMEOUT") {
            self.ipfabric.timeout_secs = parse_u64("IPF_TIMEOUT", &value)?;
        }
        if let Some(value) = read_env("IPF_API_VERSION") {
            self.ipfabric.api_version = value;
        }
        if let Some(value) = read_env("IPF_SNAPSHOT_ID") {
            self.ipfabric.snapshot_id = Some(value);
        }
        if let Some(value) = read_env("IPF_PAGE_SIZE") {
            self.ipfabric.page_size = parse_u32("IPF_PAGE_SIZE", &value)?;
        }

        if let Some(value) = read_env("IPF_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("IPF_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(snapshot_id) = overrides.snapshot_id {
            self.ipfabric.snapshot_id = Some(snapshot_id);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ipfabric(&self.ipfabric)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("ipf-mcp.toml"), PathBuf::from("config/ipf-mcp.toml")]
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

fn validate_ipfabric(ipfabric: &IpfabricConfig) -> Result<(), ConfigError> {
    let url = ipfabric.url.trim();
    if url.is_empty() {
        return Err(ConfigError::Validation(
            "ipfabric.url is required. Set IPF_URL to the platform base URL, e.g. https://ipfabric.example.com"
                .to_string(),
        ));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "ipfabric.url must start with http:// or https://".to_string(),
        ));
    }

    if ipfabric.token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "ipfabric.token is required. Set IPF_TOKEN to an API token from Settings > Integration > API Tokens"
                .to_string(),
        ));
    }

    if ipfabric.timeout_secs == 0 || ipfabric.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "ipfabric.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if ipfabric.page_size == 0 || ipfabric.page_size > 10_000 {
        return Err(ConfigError::Validation(
            "ipfabric.page_size must be in range 1..=10000".to_string(),
        ));
    }

    let api_version = ipfabric.api_version.trim();
    let well_formed = api_version
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.'));
    if !well_formed {
        return Err(ConfigError::Validation(format!(
            "ipfabric.api_version `{api_version}` must look like `v7.0`"
        )));
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    ipfabric: Option<IpfabricPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct IpfabricPatch {
    url: Option<String>,
    token: Option<String>,
    verify_tls: Option<bool>,
    timeout_secs: Option<u64>,
    api_version: Option<String>,
    snapshot_id: Option<String>,
    page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
