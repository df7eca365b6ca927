//! Cached application usage records.
//!
//! The app list is rebuilt elsewhere from usage statistics; this module
//! owns its cache schema and the tier-ranked name search the quick-search
//! surface runs over it. Fields missing from an older cache decode to
//! their defaults instead of failing the list.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::CacheStore;
use crate::ranking::{name_cmp, rank, PriorityTier, Query};

/// One installed application with its usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppUsageRecord {
    pub app_name: String,
    pub package_name: String,
    pub last_used_time: i64,
    pub total_time_in_foreground: i64,
    pub launch_count: i64,
    pub first_install_time: i64,
    pub is_system_app: bool,
}

/// Rank apps against a query; Excluded candidates are dropped, ties break
/// alphabetically.
pub fn search<'a>(
    apps: &'a [AppUsageRecord],
    query: &Query,
    limit: usize,
) -> Vec<&'a AppUsageRecord> {
    let mut scored: Vec<(PriorityTier, &AppUsageRecord)> = apps
        .iter()
        .filter_map(|app| {
            let tier = rank(&app.app_name, query);
            if tier.is_excluded() {
                None
            } else {
                Some((tier, app))
            }
        })
        .collect();

    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| name_cmp(&a.1.app_name, &b.1.app_name)));
    scored.into_iter().take(limit).map(|(_, app)| app).collect()
}

/// Thin binding of the app list to its named cache snapshot.
pub struct AppRepository {
    cache: CacheStore<AppUsageRecord>,
}

impl AppRepository {
    pub fn new() -> Self {
        Self {
            cache: CacheStore::new("apps"),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cache: CacheStore::in_dir(dir, "apps"),
        }
    }

    /// The cached app list, `None` on any cache miss.
    pub fn load_cached(&self) -> Option<Vec<AppUsageRecord>> {
        self.cache.load()
    }

    /// Replace the cached list wholesale.
    pub fn save(&self, apps: &[AppUsageRecord]) -> bool {
        self.cache.save(apps)
    }

    pub fn last_updated_at_millis(&self) -> i64 {
        self.cache.last_updated_at_millis()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for AppRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str) -> AppUsageRecord {
        AppUsageRecord {
            app_name: name.to_string(),
            package_name: format!("com.example.{}", name.to_lowercase()),
            ..Default::default()
        }
    }

    #[test]
    fn test_search_tiers_then_alphabetical() {
        let apps = vec![app("Bjorn Player"), app("John Maps"), app("Calculator")];
        let query = Query::new("jo");

        let names: Vec<&str> = search(&apps, &query, 10)
            .iter()
            .map(|a| a.app_name.as_str())
            .collect();
        assert_eq!(names, ["John Maps", "Bjorn Player"]);
    }

    #[test]
    fn test_search_respects_limit() {
        let apps = vec![app("Mail"), app("Maps"), app("Market")];
        let query = Query::new("ma");
        assert_eq!(search(&apps, &query, 2).len(), 2);
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let record: AppUsageRecord =
            serde_json::from_str(r#"{"appName":"Mail","packageName":"com.example.mail"}"#)
                .unwrap();
        assert_eq!(record.launch_count, 0);
        assert_eq!(record.last_used_time, 0);
        assert!(!record.is_system_app);
    }

    #[test]
    fn test_repository_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = AppRepository::in_dir(dir.path());

        assert!(repo.load_cached().is_none());
        let apps = vec![app("Mail"), app("Maps")];
        assert!(repo.save(&apps));
        assert_eq!(repo.load_cached(), Some(apps));
        assert!(repo.last_updated_at_millis() > 0);

        repo.clear_cache();
        assert!(repo.load_cached().is_none());
    }
}
