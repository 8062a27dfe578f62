use crate::storage::QuotaAccounting;
use std::path::PathBuf;
use std::time::Duration;

/// 100KB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100_000;
pub const DEFAULT_MAX_HOURS: u64 = 48;
/// 100MB
pub const DEFAULT_MAX_QUOTA: u64 = 100_000_000;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";

/// Settings shared by the store, the operations and the sweeper.
///
/// Built once at startup and handed out behind an `Arc`; nothing mutates it
/// afterwards.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Directory holding the `slides` subdirectory.
    pub storage_root: PathBuf,
    /// Origin used when building retrieval URLs, without a trailing slash.
    pub public_url: String,
    pub max_file_size: u64,
    /// Hours after which a blob is evicted by the sweeper.
    pub max_hours: u64,
    pub max_quota: u64,
    pub quota_accounting: QuotaAccounting,
    pub sweep_interval: Duration,
}

impl ServiceOptions {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_hours: DEFAULT_MAX_HOURS,
            max_quota: DEFAULT_MAX_QUOTA,
            quota_accounting: QuotaAccounting::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn max_age(&self) -> chrono::Duration {
        i64::try_from(self.max_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn slide_url(&self, key: &str) -> String {
        format!("{}/slide/{}", self.public_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_url_joins_origin_and_key() {
        let mut options = ServiceOptions::new("/tmp/slidepost");
        options.public_url = "https://slides.example.org/".to_string();
        assert_eq!(
            options.slide_url("d41d8cd98f00b204e9800998ecf8427e"),
            "https://slides.example.org/slide/d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn max_age_saturates_on_huge_values() {
        let mut options = ServiceOptions::new("/tmp/slidepost");
        assert_eq!(options.max_age(), chrono::Duration::hours(48));

        options.max_hours = u64::MAX;
        assert_eq!(options.max_age(), chrono::Duration::MAX);
    }
}
