use serde::{Deserialize, Serialize};
use slidepost_core::{
    DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_HOURS, DEFAULT_MAX_QUOTA, DEFAULT_SWEEP_INTERVAL,
    QuotaAccounting, Result, ServiceOptions, SlideError,
};
use std::path::PathBuf;
use std::time::Duration;

const STORAGE_DIR_NAME: &str = ".slidepost";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Origin embedded in upload confirmation links.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Directory whose `static` subdirectory is served under `/static`.
    #[serde(default)]
    pub web_root: Option<PathBuf>,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Numeric settings left at zero fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Defaults to `~/.slidepost`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub max_file_size: u64,
    #[serde(default)]
    pub max_hours: u64,
    #[serde(default)]
    pub max_quota: u64,
    #[serde(default)]
    pub quota_accounting: QuotaAccounting,
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_url: default_public_url(),
            web_root: None,
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load `path` if it exists, then overlay `SLIDEPOST_*` environment
    /// variables (`SLIDEPOST_STORAGE__MAX_HOURS=12`).
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("SLIDEPOST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SlideError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| SlideError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn storage_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.storage.root {
            return Ok(root.clone());
        }

        dirs::home_dir()
            .map(|home| home.join(STORAGE_DIR_NAME))
            .ok_or_else(|| SlideError::Config("could not obtain home dir".to_string()))
    }

    pub fn to_service_options(&self) -> Result<ServiceOptions> {
        let storage = &self.storage;
        let mut options = ServiceOptions::new(self.storage_root()?);

        let public_url = self.public_url.trim().trim_end_matches('/');
        options.public_url = if public_url.is_empty() {
            default_public_url()
        } else {
            public_url.to_string()
        };

        options.max_file_size = non_zero_or(storage.max_file_size, DEFAULT_MAX_FILE_SIZE);
        options.max_hours = non_zero_or(storage.max_hours, DEFAULT_MAX_HOURS);
        options.max_quota = non_zero_or(storage.max_quota, DEFAULT_MAX_QUOTA);
        options.quota_accounting = storage.quota_accounting;
        options.sweep_interval = match storage.sweep_interval_secs {
            0 => DEFAULT_SWEEP_INTERVAL,
            secs => Duration::from_secs(secs),
        };

        Ok(options)
    }
}

fn non_zero_or(value: u64, default: u64) -> u64 {
    if value == 0 { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MAX_HOURS_VAR: &str = "SLIDEPOST_STORAGE__MAX_HOURS";
    const BIND_ADDR_VAR: &str = "SLIDEPOST_BIND_ADDR";

    /// Removes the variables it set when dropped, also on assertion failure.
    struct EnvGuard(Vec<&'static str>);

    impl EnvGuard {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (key, value) in vars {
                // SAFETY: every test touching the process environment is #[serial]
                unsafe { std::env::set_var(key, value) };
            }
            Self(vars.iter().map(|(key, _)| *key).collect())
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in &self.0 {
                // SAFETY: see EnvGuard::set
                unsafe { std::env::remove_var(key) };
            }
        }
    }

    #[test]
    fn defaults_apply_to_unset_and_zero_values() {
        let mut config = Config::default();
        config.storage.root = Some(PathBuf::from("/srv/slides"));
        config.storage.max_hours = 0;

        let options = config.to_service_options().unwrap();
        assert_eq!(options.storage_root, PathBuf::from("/srv/slides"));
        assert_eq!(options.public_url, "http://localhost:8080");
        assert_eq!(options.max_file_size, 100_000);
        assert_eq!(options.max_hours, 48);
        assert_eq!(options.max_quota, 100_000_000);
        assert_eq!(options.quota_accounting, QuotaAccounting::Aggregate);
        assert_eq!(options.sweep_interval, Duration::from_secs(3600));
    }

    #[test]
    #[serial]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slidepost.yaml");
        std::fs::write(
            &path,
            "bind_addr: 127.0.0.1:9000\n\
             public_url: https://slides.example.org/\n\
             storage:\n  \
               root: /var/lib/slidepost\n  \
               max_hours: 12\n  \
               max_quota: 5000000\n  \
               quota_accounting: directory_entry\n  \
               sweep_interval_secs: 60\n",
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");

        let options = config.to_service_options().unwrap();
        assert_eq!(options.public_url, "https://slides.example.org");
        assert_eq!(options.storage_root, PathBuf::from("/var/lib/slidepost"));
        assert_eq!(options.max_file_size, 100_000);
        assert_eq!(options.max_hours, 12);
        assert_eq!(options.max_quota, 5_000_000);
        assert_eq!(options.quota_accounting, QuotaAccounting::DirectoryEntry);
        assert_eq!(options.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    #[serial]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.web_root.is_none());
        assert!(config.storage.root.is_none());
    }

    #[test]
    #[serial]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slidepost.yaml");
        std::fs::write(
            &path,
            "bind_addr: 127.0.0.1:9000\n\
             storage:\n  \
               root: /var/lib/slidepost\n  \
               max_hours: 24\n",
        )
        .unwrap();

        let _env = EnvGuard::set(&[(MAX_HOURS_VAR, "12"), (BIND_ADDR_VAR, "127.0.0.1:7000")]);
        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000");

        let options = config.to_service_options().unwrap();
        assert_eq!(options.max_hours, 12);
        assert_eq!(options.storage_root, PathBuf::from("/var/lib/slidepost"));
    }

    #[test]
    #[serial]
    fn environment_applies_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let _env = EnvGuard::set(&[(MAX_HOURS_VAR, "12")]);
        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.storage.max_hours, 12);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}
