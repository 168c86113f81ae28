use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::notification::NotificationBackend;

const DEFAULT_NOTIFICATION_BACKEND: &str = "log";
const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const MIN_NOTIFICATION_DURATION_MS: u64 = 1_000;
const MAX_NOTIFICATION_DURATION_MS: u64 = 30_000;
const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the task API. When unset the local database is used.
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub database_path: Option<PathBuf>,
    pub request_timeout_ms: u64,
    pub notification_backend: String,
    pub notification_duration_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            database_path: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            notification_backend: DEFAULT_NOTIFICATION_BACKEND.to_string(),
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("task-board");
        path.push("settings.toml");
        Some(path)
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    settings.validate();
                    settings
                }
                Err(error) => {
                    warn!(
                        "failed to parse settings config '{}': {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read settings config '{}': {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    /// Database used when no API is configured.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(|| {
            let mut path = dirs::data_local_dir()?;
            path.push("task-board");
            path.push("tasks.sqlite");
            Some(path)
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn notification_backend(&self) -> NotificationBackend {
        NotificationBackend::from_settings_value(&self.notification_backend).unwrap_or_default()
    }

    fn validate(&mut self) {
        self.request_timeout_ms = self
            .request_timeout_ms
            .clamp(MIN_REQUEST_TIMEOUT_MS, MAX_REQUEST_TIMEOUT_MS);
        self.notification_duration_ms = self
            .notification_duration_ms
            .clamp(MIN_NOTIFICATION_DURATION_MS, MAX_NOTIFICATION_DURATION_MS);

        self.api_url = self
            .api_url
            .take()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self.api_token = self
            .api_token
            .take()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        self.notification_backend =
            match NotificationBackend::from_settings_value(&self.notification_backend) {
                Some(backend) => backend.as_str().to_string(),
                None => {
                    warn!(
                        "invalid notification_backend '{}' in settings config; falling back to {}",
                        self.notification_backend, DEFAULT_NOTIFICATION_BACKEND
                    );
                    DEFAULT_NOTIFICATION_BACKEND.to_string()
                }
            };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_file_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join("task-board").join("settings.toml")
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.api_url, None);
        assert_eq!(settings.request_timeout_ms, 10_000);
        assert_eq!(settings.notification_backend, "log");
        assert_eq!(settings.notification_backend(), NotificationBackend::Log);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = settings_file_path(&temp_dir);
        assert_eq!(Settings::load_from_path(&path), Settings::default());
    }

    #[test]
    fn test_load_malformed_toml() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = settings_file_path(&temp_dir);
        fs::create_dir_all(path.parent().expect("settings path should have parent"))
            .expect("failed to create config dir");
        fs::write(&path, "api_url = \"http://x\"\nrequest_timeout_ms = [invalid")
            .expect("failed to write malformed settings");

        assert_eq!(Settings::load_from_path(&path), Settings::default());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = settings_file_path(&temp_dir);
        fs::create_dir_all(path.parent().expect("settings path should have parent"))
            .expect("failed to create config dir");
        fs::write(&path, "api_url = \"https://api.example.com/v1/\"")
            .expect("failed to write partial settings");

        let settings = Settings::load_from_path(&path);
        assert_eq!(
            settings.api_url.as_deref(),
            Some("https://api.example.com/v1")
        );
        assert_eq!(settings.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(settings.notification_backend, DEFAULT_NOTIFICATION_BACKEND);
    }

    #[test]
    fn test_load_full_toml() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = settings_file_path(&temp_dir);
        fs::create_dir_all(path.parent().expect("settings path should have parent"))
            .expect("failed to create config dir");
        fs::write(
            &path,
            "api_url = \"https://api.example.com\"\n\
             api_token = \"secret\"\n\
             database_path = \"/tmp/tasks.sqlite\"\n\
             request_timeout_ms = 2500\n\
             notification_backend = \"both\"\n\
             notification_duration_ms = 4000\n",
        )
        .expect("failed to write settings");

        let expected = Settings {
            api_url: Some("https://api.example.com".to_string()),
            api_token: Some("secret".to_string()),
            database_path: Some(PathBuf::from("/tmp/tasks.sqlite")),
            request_timeout_ms: 2_500,
            notification_backend: "both".to_string(),
            notification_duration_ms: 4_000,
        };
        assert_eq!(Settings::load_from_path(&path), expected);
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut settings = Settings {
            request_timeout_ms: 1,
            notification_duration_ms: u64::MAX,
            ..Settings::default()
        };

        settings.validate();

        assert_eq!(settings.request_timeout_ms, MIN_REQUEST_TIMEOUT_MS);
        assert_eq!(settings.notification_duration_ms, MAX_NOTIFICATION_DURATION_MS);
    }

    #[test]
    fn test_validate_blank_strings_become_none() {
        let mut settings = Settings {
            api_url: Some("   ".to_string()),
            api_token: Some("".to_string()),
            ..Settings::default()
        };

        settings.validate();

        assert_eq!(settings.api_url, None);
        assert_eq!(settings.api_token, None);
    }

    #[test]
    fn test_validate_invalid_notification_backend() {
        let mut settings = Settings {
            notification_backend: "Tmux".to_string(),
            ..Settings::default()
        };

        settings.validate();

        assert_eq!(settings.notification_backend, "log");
    }
}
