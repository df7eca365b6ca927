//! Platform abstraction layer.
//!
//! The core never talks to a real package manager, contacts database, or
//! foreign-package resource table directly; it goes through the capability
//! traits here. That keeps the discovery and aggregation logic testable
//! with in-memory fakes and lets a host wire in whatever backing store it
//! has. [`fs::FsPlatform`] is the bundled directory-backed host.

pub mod fs;

use crate::error::ScoutResult;
use crate::services::shortcuts::{IntentSpec, TypedValue};

/// A launcher-visible activity, as enumerated across all user profiles.
#[derive(Debug, Clone)]
pub struct LauncherActivity {
    pub package: String,
    pub class: String,
    pub app_label: String,
    /// Shortcut descriptor reference declared on the activity itself.
    /// Preferred over the application-level one.
    pub activity_shortcuts_ref: Option<String>,
    /// Shortcut descriptor reference declared at the application level.
    pub app_shortcuts_ref: Option<String>,
}

impl LauncherActivity {
    /// The descriptor reference to parse for this activity, if any.
    pub fn shortcuts_ref(&self) -> Option<&str> {
        self.activity_shortcuts_ref
            .as_deref()
            .or(self.app_shortcuts_ref.as_deref())
    }
}

/// What the package manager knows about a resolved activity.
#[derive(Debug, Clone)]
pub struct ActivityInfo {
    pub exported: bool,
    pub permission: Option<String>,
}

/// Enumerate and resolve activities, and answer package-level questions.
pub trait ActivityResolver: Send + Sync {
    /// All launcher-visible activities. Implementations that support
    /// multiple user profiles enumerate them all, falling back to a
    /// legacy single-profile enumeration if the profile-aware scan fails.
    fn launcher_activities(&self) -> ScoutResult<Vec<LauncherActivity>>;

    /// Resolve an intent to a concrete activity, if one exists.
    fn resolve_activity(&self, intent: &IntentSpec) -> Option<ActivityInfo>;

    fn is_package_installed(&self, package: &str) -> bool;

    /// Whether the calling application holds the named permission.
    fn holds_permission(&self, permission: &str) -> bool;
}

/// Resolve resources scoped to a foreign application.
pub trait ResourceResolver: Send + Sync {
    /// Open a shortcut descriptor and return its raw XML.
    fn open_descriptor(&self, package: &str, reference: &str) -> ScoutResult<String>;

    /// Resolve a string resource reference.
    fn resolve_string(&self, package: &str, reference: &str) -> Option<String>;

    /// Resolve a typed resource reference; the resolved platform type
    /// picks the variant.
    fn resolve_typed(&self, package: &str, reference: &str) -> Option<TypedValue>;
}

/// One row of the contacts phone table.
#[derive(Debug, Clone)]
pub struct PhoneRow {
    pub contact_id: i64,
    pub lookup_key: String,
    pub display_name: String,
    pub photo_uri: Option<String>,
    pub number: String,
    pub label: Option<String>,
    pub row_id: i64,
    pub is_primary: bool,
    pub is_super_primary: bool,
}

/// One row of the contacts data table (phones, emails, third-party
/// messaging entries alike, distinguished by MIME type).
#[derive(Debug, Clone)]
pub struct DataRow {
    pub contact_id: i64,
    pub row_id: i64,
    pub mime_type: String,
    pub value: String,
    pub label: Option<String>,
    pub is_primary: bool,
    pub is_super_primary: bool,
}

/// Raw contact rows, pre-ordered by (super-primary desc, primary desc)
/// within each contact as the aggregation contract requires.
pub trait ContactsProvider: Send + Sync {
    /// Whether contact access has been granted. When false the
    /// aggregator returns empty results, never an error.
    fn has_permission(&self) -> bool;

    /// Every phone row, one per stored number.
    fn phone_rows(&self) -> ScoutResult<Vec<PhoneRow>>;

    /// Phone rows restricted to the given contacts.
    fn phone_rows_for(&self, contact_ids: &[i64]) -> ScoutResult<Vec<PhoneRow>>;

    /// Data rows restricted to the given contacts.
    fn data_rows_for(&self, contact_ids: &[i64]) -> ScoutResult<Vec<DataRow>>;
}
