use anyhow::{Context, Result};
use kvdesk_core::client::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current settings schema version - increment when making breaking changes
pub const SETTINGS_VERSION: u32 = 2;

/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "KVDESK_API_URL";

/// App settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Settings schema version for migration support
    #[serde(default = "default_settings_version")]
    pub version: u32,
    /// Base URL of the management service
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Revisions fetched per history request (default: 20)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Ask for remaining TTLs when listing directories
    #[serde(default = "default_include_ttl")]
    pub include_ttl: bool,
    /// Connection that was active when the shell last exited
    #[serde(default)]
    pub last_active_connection: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            history_limit: default_history_limit(),
            include_ttl: default_include_ttl(),
            last_active_connection: None,
        }
    }
}

impl AppSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Apply `KVDESK_API_URL` if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                log::info!("Using API base URL from {}: {}", API_URL_ENV, url);
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }
}

fn default_settings_version() -> u32 {
    // Files written before versioning
    0
}

fn default_api_base_url() -> String {
    kvdesk_core::client::http::DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_include_ttl() -> bool {
    true
}

/// Config directory (`<config_dir>/kvdesk`)
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kvdesk")
}

/// Get the settings file path
pub fn get_settings_path() -> PathBuf {
    get_config_dir().join("settings.json")
}

/// Load app settings from the default location
pub fn load_settings() -> AppSettings {
    load_settings_from(&get_settings_path())
}

/// Load app settings with partial recovery and migration
pub fn load_settings_from(path: &Path) -> AppSettings {
    if !path.exists() {
        log::info!("Settings file not found at {}, using defaults", path.display());
        return AppSettings::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::error!("Failed to read settings file {}: {}", path.display(), e);
            return AppSettings::default();
        }
    };

    match serde_json::from_str::<AppSettings>(&content) {
        Ok(settings) => return migrate_settings(settings, path),
        Err(e) => {
            log::warn!("Failed to parse settings directly: {}, attempting partial recovery", e);
        }
    }

    match recover_settings_from_json(&content) {
        Ok(settings) => {
            log::info!("Recovered settings with partial data");
            let settings = migrate_settings(settings, path);
            if let Err(e) = save_settings_to(&settings, path) {
                log::warn!("Failed to save recovered settings: {}", e);
            }
            settings
        }
        Err(e) => {
            log::error!("Failed to recover settings from {}: {}", path.display(), e);
            log::error!("Using default settings. The old settings file has been preserved.");
            AppSettings::default()
        }
    }
}

/// Pull out every field that still parses; the rest fall back to defaults.
fn recover_settings_from_json(content: &str) -> Result<AppSettings> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Settings file is not valid JSON")?;
    let obj = value
        .as_object()
        .context("Settings file root is not a JSON object")?;

    let mut settings = AppSettings::default();

    if let Some(v) = obj.get("version").and_then(|v| v.as_u64()) {
        settings.version = v as u32;
    }

    if let Some(v) = obj.get("api_base_url").and_then(|v| v.as_str()) {
        settings.api_base_url = v.to_string();
    }

    if let Some(v) = obj.get("request_timeout_secs").and_then(|v| v.as_u64()) {
        settings.request_timeout_secs = v.clamp(1, 600);
    }

    if let Some(v) = obj.get("history_limit").and_then(|v| v.as_u64()) {
        settings.history_limit = (v as usize).clamp(1, MAX_HISTORY_LIMIT);
    } else if obj.contains_key("history_limit") {
        log::warn!("Could not parse history_limit, using default");
    }

    if let Some(v) = obj.get("include_ttl").and_then(|v| v.as_bool()) {
        settings.include_ttl = v;
    }

    if let Some(v) = obj.get("last_active_connection") {
        if let Ok(id) = serde_json::from_value::<Option<String>>(v.clone()) {
            settings.last_active_connection = id;
        }
    }

    Ok(settings)
}

/// Bring settings up to the current schema version
fn migrate_settings(mut settings: AppSettings, path: &Path) -> AppSettings {
    let original_version = settings.version;

    if settings.version == 0 {
        log::info!("Migrating settings from pre-versioning (v0) to v1");
        settings.version = 1;
    }

    // v1 stored an unbounded history limit
    if settings.version == 1 {
        log::info!("Migrating settings from v1 to v2");
        settings.history_limit = settings.history_limit.clamp(1, MAX_HISTORY_LIMIT);
        settings.version = 2;
    }

    if settings.version < SETTINGS_VERSION {
        log::warn!(
            "Settings version {} is older than current version {}, some settings may use defaults",
            original_version,
            SETTINGS_VERSION
        );
        settings.version = SETTINGS_VERSION;
    }

    if original_version != settings.version {
        log::info!("Settings migrated from v{} to v{}", original_version, settings.version);
        if let Err(e) = save_settings_to(&settings, path) {
            log::warn!("Failed to save migrated settings: {}", e);
        }
    }

    settings
}

/// Save app settings to the default location
pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_settings_to(settings, &get_settings_path())
}

pub fn save_settings_to(settings: &AppSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json"));
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.api_base_url, "http://localhost:8888/api");
        assert_eq!(settings.history_limit, 20);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            api_base_url: "http://etcd-admin:9000/api".to_string(),
            include_ttl: false,
            last_active_connection: Some("abc".to_string()),
            ..AppSettings::default()
        };
        save_settings_to(&settings, &path).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        save_settings_to(&AppSettings::default(), &path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn partial_recovery_keeps_valid_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"version": 2, "api_base_url": "http://other/api", "history_limit": "lots", "include_ttl": false}"#,
        )
        .unwrap();

        let settings = load_settings_from(&path);
        assert_eq!(settings.api_base_url, "http://other/api");
        assert_eq!(settings.history_limit, DEFAULT_HISTORY_LIMIT);
        assert!(!settings.include_ttl);

        // recovered file was rewritten in valid form
        let rewritten: AppSettings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rewritten, settings);
    }

    #[test]
    fn unversioned_file_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"history_limit": 5000}"#).unwrap();

        let settings = load_settings_from(&path);
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.history_limit, MAX_HISTORY_LIMIT);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert_eq!(load_settings_from(&path), AppSettings::default());
        // left untouched
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json at all");
    }
}
