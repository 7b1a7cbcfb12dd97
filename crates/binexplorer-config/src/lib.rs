use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_BINEXPLORER_CONFIG: &str = "BINEXPLORER_CONFIG";

const DEFAULT_BACKEND_BASE_URL: &str = "http://127.0.0.1:8282";
const DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DBL_CLICK_WAIT_TIME_MS: u64 = 250;
const DEFAULT_UI_THEME: &str = "default";
const DEFAULT_UI_TRANSCRIPT_LINE_LIMIT: usize = 500;
const LOG_FILE_NAME: &str = "binexplorer.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BinExplorerConfig {
    #[serde(default)]
    pub backend: BackendConfigToml,
    #[serde(default)]
    pub selector: SelectorConfigToml,
    #[serde(default)]
    pub ui: UiConfigToml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRuntimeConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorRuntimeConfig {
    pub dbl_click_wait_time: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiViewConfig {
    pub theme: String,
    pub transcript_line_limit: usize,
}

impl BinExplorerConfig {
    pub fn backend_runtime(&self) -> BackendRuntimeConfig {
        BackendRuntimeConfig {
            base_url: self.backend.base_url.clone(),
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
        }
    }

    pub fn selector_runtime(&self) -> SelectorRuntimeConfig {
        SelectorRuntimeConfig {
            dbl_click_wait_time: Duration::from_millis(self.selector.dbl_click_wait_time_ms),
        }
    }

    pub fn ui_view(&self) -> UiViewConfig {
        UiViewConfig {
            theme: self.ui.theme.clone(),
            transcript_line_limit: self.ui.transcript_line_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfigToml {
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,
    #[serde(default = "default_backend_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfigToml {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
            request_timeout_secs: default_backend_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorConfigToml {
    /// Double-activation window in milliseconds.
    #[serde(rename = "dblClickWaitTime", default = "default_dbl_click_wait_time_ms")]
    pub dbl_click_wait_time_ms: u64,
}

impl Default for SelectorConfigToml {
    fn default() -> Self {
        Self {
            dbl_click_wait_time_ms: default_dbl_click_wait_time_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfigToml {
    #[serde(default = "default_ui_transcript_line_limit")]
    pub transcript_line_limit: usize,
    #[serde(default = "default_ui_theme")]
    pub theme: String,
}

impl Default for UiConfigToml {
    fn default() -> Self {
        Self {
            transcript_line_limit: default_ui_transcript_line_limit(),
            theme: default_ui_theme(),
        }
    }
}

fn default_backend_base_url() -> String {
    DEFAULT_BACKEND_BASE_URL.to_owned()
}

fn default_backend_request_timeout_secs() -> u64 {
    DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS
}

fn default_dbl_click_wait_time_ms() -> u64 {
    DEFAULT_DBL_CLICK_WAIT_TIME_MS
}

fn default_ui_theme() -> String {
    DEFAULT_UI_THEME.to_owned()
}

fn default_ui_transcript_line_limit() -> usize {
    DEFAULT_UI_TRANSCRIPT_LINE_LIMIT
}

pub fn load_from_env() -> Result<BinExplorerConfig, ConfigError> {
    let path = config_path_from_env()?;
    load_from_path(path)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<BinExplorerConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home
        .join(".config")
        .join("binexplorer")
        .join("config.toml"))
}

/// `BINEXPLORER_CONFIG` when set and non-blank, the default path otherwise.
pub fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_BINEXPLORER_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "BINEXPLORER_CONFIG contained invalid UTF-8",
        )),
    }
}

/// Log file kept next to the config file.
pub fn log_file_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(LOG_FILE_NAME)
}

fn resolve_home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("USERPROFILE")
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
}

fn persist_config(path: &Path, config: &BinExplorerConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize BINEXPLORER_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write BINEXPLORER_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<BinExplorerConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for BINEXPLORER_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = BinExplorerConfig::default();
            persist_config(path, &default_config)?;

            toml::to_string_pretty(&default_config).map_err(|err| {
                ConfigError::configuration(format!(
                    "Failed to serialize default BINEXPLORER_CONFIG: {err}"
                ))
            })?
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read BINEXPLORER_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: BinExplorerConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse BINEXPLORER_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    let changed = normalize_config(&mut config)?;
    if changed {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut BinExplorerConfig) -> Result<bool, ConfigError> {
    let mut changed = false;

    changed |= normalize_backend_config(&mut config.backend)?;
    changed |= normalize_selector_config(&mut config.selector);
    changed |= normalize_ui_config(&mut config.ui);

    Ok(changed)
}

pub fn normalize_backend_config(config: &mut BackendConfigToml) -> Result<bool, ConfigError> {
    let mut changed = normalize_base_url(&mut config.base_url)?;

    let normalized_timeout_secs = config.request_timeout_secs.clamp(1, 300);
    if normalized_timeout_secs != config.request_timeout_secs {
        config.request_timeout_secs = normalized_timeout_secs;
        changed = true;
    }

    Ok(changed)
}

pub fn normalize_selector_config(config: &mut SelectorConfigToml) -> bool {
    let normalized_wait_time_ms = config.dbl_click_wait_time_ms.clamp(50, 2_000);
    if normalized_wait_time_ms != config.dbl_click_wait_time_ms {
        config.dbl_click_wait_time_ms = normalized_wait_time_ms;
        return true;
    }
    false
}

pub fn normalize_ui_config(config: &mut UiConfigToml) -> bool {
    let mut changed = normalize_non_empty_string(&mut config.theme, default_ui_theme());

    let normalized_transcript_line_limit = config.transcript_line_limit.max(1);
    if normalized_transcript_line_limit != config.transcript_line_limit {
        config.transcript_line_limit = normalized_transcript_line_limit;
        changed = true;
    }

    changed
}

/// Overrides the configured backend address, e.g. from a CLI flag.
pub fn apply_backend_url_override(
    config: &mut BinExplorerConfig,
    base_url: &str,
) -> Result<(), ConfigError> {
    config.backend.base_url = base_url.to_owned();
    normalize_base_url(&mut config.backend.base_url)?;
    Ok(())
}

fn normalize_base_url(value: &mut String) -> Result<bool, ConfigError> {
    let mut changed = normalize_non_empty_string(value, default_backend_base_url());

    let stripped = value.trim_end_matches('/');
    if stripped.len() != value.len() {
        *value = stripped.to_owned();
        changed = true;
    }

    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::configuration(format!(
            "backend.base_url must start with http:// or https://, got '{value}'"
        )));
    }

    Ok(changed)
}

fn normalize_non_empty_string(value: &mut String, default: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if *value != default {
            *value = default;
            return true;
        }
        return false;
    }

    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn with_env_vars<F>(vars: &[(&str, Option<&str>)], test: F)
    where
        F: FnOnce(),
    {
        let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let backup = vars
            .iter()
            .map(|(name, _)| ((*name).to_owned(), std::env::var(name).ok()))
            .collect::<Vec<_>>();

        for (name, value) in vars {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }

        test();

        for (name, value) in backup {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "binexplorer-config-{prefix}-{nanos}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path).expect("create temp dir");
        path
    }

    fn remove_temp_path(path: &Path) {
        let _ = std::fs::remove_dir_all(path);
    }

    fn write_config_file(path: &Path, raw: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture config parent");
        }
        std::fs::write(path, raw.as_bytes()).expect("write fixture config");
    }

    #[test]
    fn load_from_env_creates_default_config_when_missing() {
        let home = unique_temp_dir("home-defaults");
        let expected = home
            .join(".config")
            .join("binexplorer")
            .join("config.toml");

        with_env_vars(
            &[
                ("HOME", Some(home.to_str().expect("home path"))),
                ("USERPROFILE", None),
                (ENV_BINEXPLORER_CONFIG, None),
            ],
            || {
                let config = load_from_env().expect("load defaults");
                assert_eq!(config, BinExplorerConfig::default());
                assert!(expected.exists());

                let persisted = std::fs::read_to_string(&expected).expect("read persisted");
                assert!(persisted.contains("dblClickWaitTime = 250"));
            },
        );

        remove_temp_path(&home);
    }

    #[test]
    fn load_from_env_honors_explicit_config_path() {
        let home = unique_temp_dir("home-explicit-path");
        let root = unique_temp_dir("explicit-path");
        let explicit = root.join("nested").join("custom.toml");

        with_env_vars(
            &[
                ("HOME", Some(home.to_str().expect("home path"))),
                (
                    ENV_BINEXPLORER_CONFIG,
                    Some(explicit.to_str().expect("explicit path")),
                ),
            ],
            || {
                load_from_env().expect("load explicit");
                assert!(explicit.exists());
                assert!(!home.join(".config").join("binexplorer").exists());
            },
        );

        remove_temp_path(&home);
        remove_temp_path(&root);
    }

    #[test]
    fn blank_env_path_falls_back_to_default_location() {
        let home = unique_temp_dir("home-blank-path");

        with_env_vars(
            &[
                ("HOME", Some(home.to_str().expect("home path"))),
                (ENV_BINEXPLORER_CONFIG, Some("   ")),
            ],
            || {
                let path = config_path_from_env().expect("resolve path");
                assert_eq!(
                    path,
                    home.join(".config").join("binexplorer").join("config.toml")
                );
            },
        );

        remove_temp_path(&home);
    }

    #[test]
    fn normalization_clamps_values_and_persists_changes() {
        let root = unique_temp_dir("normalization");
        let path = root.join("config.toml");
        write_config_file(
            &path,
            r#"
[backend]
base_url = " https://analysis.local:8282/ "
request_timeout_secs = 0

[selector]
dblClickWaitTime = 10

[ui]
transcript_line_limit = 0
theme = "  "
"#,
        );

        let config = load_from_path(&path).expect("load normalized");
        assert_eq!(config.backend.base_url, "https://analysis.local:8282");
        assert_eq!(config.backend.request_timeout_secs, 1);
        assert_eq!(config.selector.dbl_click_wait_time_ms, 50);
        assert_eq!(config.ui.transcript_line_limit, 1);
        assert_eq!(config.ui.theme, "default");

        let reloaded: BinExplorerConfig =
            toml::from_str(&std::fs::read_to_string(&path).expect("read persisted"))
                .expect("parse persisted");
        assert_eq!(reloaded, config);

        remove_temp_path(&root);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let root = unique_temp_dir("partial");
        let path = root.join("config.toml");
        write_config_file(&path, "[selector]\ndblClickWaitTime = 400\n");

        let config = load_from_path(&path).expect("load partial");
        assert_eq!(
            config.selector_runtime().dbl_click_wait_time,
            Duration::from_millis(400)
        );
        assert_eq!(config.backend_runtime().base_url, "http://127.0.0.1:8282");
        assert_eq!(
            config.backend_runtime().request_timeout,
            Duration::from_secs(30)
        );
        assert_eq!(config.ui_view().transcript_line_limit, 500);

        remove_temp_path(&root);
    }

    #[test]
    fn invalid_base_url_scheme_is_rejected() {
        let root = unique_temp_dir("invalid-url");
        let path = root.join("config.toml");
        write_config_file(&path, "[backend]\nbase_url = \"ftp://nowhere\"\n");

        let err = load_from_path(&path).expect_err("scheme must be rejected");
        assert!(err.to_string().contains("backend.base_url"));

        remove_temp_path(&root);
    }

    #[test]
    fn malformed_toml_reports_the_path() {
        let root = unique_temp_dir("malformed");
        let path = root.join("config.toml");
        write_config_file(&path, "[selector\n");

        let err = load_from_path(&path).expect_err("malformed config");
        assert!(err.to_string().contains("Failed to parse BINEXPLORER_CONFIG"));

        remove_temp_path(&root);
    }

    #[test]
    fn backend_url_override_is_normalized() {
        let mut config = BinExplorerConfig::default();
        apply_backend_url_override(&mut config, "http://10.0.0.2:9000/").expect("override");
        assert_eq!(config.backend.base_url, "http://10.0.0.2:9000");

        assert!(apply_backend_url_override(&mut config, "10.0.0.2").is_err());
    }

    #[test]
    fn log_file_sits_next_to_the_config() {
        assert_eq!(
            log_file_path(Path::new("/tmp/binexplorer/config.toml")),
            PathBuf::from("/tmp/binexplorer/binexplorer.log")
        );
        assert_eq!(
            log_file_path(Path::new("config.toml")),
            PathBuf::from("./binexplorer.log")
        );
    }
}
