use std::sync::Arc;

/// Shown wherever the offline cache version would be when it can't be asked.
pub const CACHE_VERSION_PLACEHOLDER: &str = "offline cache unavailable";

/// Cache name used by the asset-caching shell that ships with the app.
pub const SHELL_CACHE_NAME: &str = "quiet-daily-v2";

/// The offline asset cache answers "which cache version is active". Hosts
/// without one simply don't attach a source.
pub trait CacheVersionSource: Send + Sync {
    fn active_version(&self) -> Option<String>;
}

/// Reports a fixed version, e.g. one read from configuration.
#[derive(Debug, Clone)]
pub struct StaticCacheVersion(String);

impl StaticCacheVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }
}

impl Default for StaticCacheVersion {
    fn default() -> Self {
        Self::new(SHELL_CACHE_NAME)
    }
}

impl CacheVersionSource for StaticCacheVersion {
    fn active_version(&self) -> Option<String> {
        let version = self.0.trim();
        (!version.is_empty()).then(|| version.to_string())
    }
}

impl<T: CacheVersionSource + ?Sized> CacheVersionSource for Arc<T> {
    fn active_version(&self) -> Option<String> {
        (**self).active_version()
    }
}

/// Best-effort version label; never fails.
pub fn describe_cache_version(source: Option<&dyn CacheVersionSource>) -> String {
    source
        .and_then(|source| source.active_version())
        .unwrap_or_else(|| CACHE_VERSION_PLACEHOLDER.to_string())
}
