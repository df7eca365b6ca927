//! Scout - search, discovery, and caching core for a device-wide
//! quick-search surface.
//!
//! Scout aggregates apps, contacts, and vendor-declared static shortcuts
//! into ranked result lists, and keeps a persistent snapshot per data
//! source so cold starts answer instantly while a full rescan runs.
//!
//! # Architecture
//!
//! The library is organized into these main modules:
//!
//! - [`ranking`] - Deterministic tier ranking shared across data sources
//! - [`cache`] - Generic corruption-tolerant snapshot cache
//! - [`platform`] - Collaborator traits (package manager, contacts
//!   provider, foreign-package resources) plus a directory-backed host
//! - [`services`] - Data sources: contact aggregation, shortcut
//!   discovery, cached app usage records
//! - [`config`] - Configuration loading and management
//!
//! Everything is synchronous and blocking; callers run scans and searches
//! off any latency-sensitive context, and serialize rescans per
//! repository instance. No failure in this core is fatal: bad input
//! degrades to fewer results or a stale-but-valid snapshot.
//!
//! # Example
//!
//! ```ignore
//! use scout::{Config, ShortcutRepository};
//! use scout::platform::fs::FsPlatform;
//! use std::sync::Arc;
//!
//! let config = Config::load();
//! let platform = Arc::new(FsPlatform::scan(&config.bundle_roots()));
//! let repo = ShortcutRepository::new(
//!     platform.clone(),
//!     platform,
//!     scout::CacheStore::new("shortcuts"),
//! );
//!
//! // Serve the cached snapshot immediately, rescan in the background.
//! let stale = repo.load_cached();
//! let fresh = repo.load_from_system();
//! ```

// Public modules
pub mod cache;
pub mod config;
pub mod platform;
pub mod ranking;
pub mod services;

// Internal modules
mod error;

// Re-export commonly used types for convenience
pub use cache::{CachedSnapshot, CacheStore};
pub use config::Config;
pub use error::{ScoutError, ScoutResult};
pub use ranking::{rank, PriorityTier, Query};
pub use services::apps::{AppRepository, AppUsageRecord};
pub use services::contacts::{ContactAggregator, ContactMethod, ContactRecord};
pub use services::shortcuts::{
    DiscoveryEngine, IntentSpec, LaunchRejection, ShortcutRepository, StaticShortcutRecord,
    TypedValue,
};
