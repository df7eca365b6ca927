//! Static shortcut discovery.
//!
//! Installed applications publish declarative shortcut descriptors; this
//! module reconstructs launchable records from them. A full rescan walks
//! every launcher-visible activity, parses each application's descriptor
//! at most once, filters to shortcuts a caller can actually launch, and
//! feeds the result to the cache store so later cold starts answer
//! instantly from the snapshot. One broken application never aborts the
//! scan of the rest.

pub mod parser;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::platform::{ActivityResolver, ResourceResolver};
use crate::ranking::name_cmp;
use parser::DescriptorParser;

/// A typed intent-extra value. Closed set; the wire `type` tag picks the
/// variant on decode.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Uri(String),
    String(String),
}

impl TypedValue {
    /// The wire `type` tag for this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Bool(_) => "boolean",
            TypedValue::Int(_) => "int",
            TypedValue::Long(_) => "long",
            TypedValue::Float(_) => "float",
            TypedValue::Double(_) => "double",
            TypedValue::Uri(_) => "uri",
            TypedValue::String(_) => "string",
        }
    }

    /// The wire string rendering of the value.
    pub fn render(&self) -> String {
        match self {
            TypedValue::Bool(v) => v.to_string(),
            TypedValue::Int(v) => v.to_string(),
            TypedValue::Long(v) => v.to_string(),
            TypedValue::Float(v) => v.to_string(),
            TypedValue::Double(v) => v.to_string(),
            TypedValue::Uri(v) | TypedValue::String(v) => v.clone(),
        }
    }

    /// Rebuild a value from its wire `(type, value)` pair. `None` when
    /// the tag is unknown or the payload doesn't parse.
    pub fn from_wire(type_name: &str, value: &str) -> Option<TypedValue> {
        match type_name {
            "boolean" => value.parse().ok().map(TypedValue::Bool),
            "int" => value.parse().ok().map(TypedValue::Int),
            "long" => value.parse().ok().map(TypedValue::Long),
            "float" => value.parse().ok().map(TypedValue::Float),
            "double" => value.parse().ok().map(TypedValue::Double),
            "uri" => Some(TypedValue::Uri(value.to_string())),
            "string" => Some(TypedValue::String(value.to_string())),
            _ => None,
        }
    }
}

/// A named extra attached to an intent.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentExtra {
    pub name: String,
    pub value: TypedValue,
}

/// A reconstructed launch intent.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentSpec {
    pub action: Option<String>,
    pub target_package: String,
    /// Fully-qualified class name when the descriptor names one;
    /// otherwise the intent is package-targeted only.
    pub target_class: Option<String>,
    pub data_uri: Option<String>,
    pub extras: Vec<IntentExtra>,
    /// Always true: the launching side starts a fresh task.
    pub new_task: bool,
}

/// One vendor-declared static shortcut, ready to launch.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticShortcutRecord {
    pub package_name: String,
    pub app_label: String,
    pub id: String,
    pub short_label: Option<String>,
    pub long_label: Option<String>,
    pub icon_ref: Option<String>,
    pub enabled: bool,
    pub intents: Vec<IntentSpec>,
}

impl StaticShortcutRecord {
    /// Short label, else long label, else the id.
    pub fn display_name(&self) -> &str {
        self.short_label
            .as_deref()
            .or(self.long_label.as_deref())
            .unwrap_or(&self.id)
    }
}

/// A shortcut id must be non-blank, not purely numeric, and not an
/// unresolved resource placeholder.
pub fn is_valid_shortcut_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && !id.bytes().all(|b| b.is_ascii_digit()) && !id.starts_with('@')
}

/// Why a shortcut failed the launch-safety check. Returned as a value,
/// never thrown.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LaunchRejection {
    #[error("shortcut is disabled")]
    Disabled,
    #[error("shortcut declares no intent")]
    NoIntent,
    #[error("intent does not resolve to an activity")]
    ActivityNotFound,
    #[error("target activity is not exported")]
    NotExported,
    #[error("target activity requires permission {0}")]
    PermissionRequired(String),
}

/// Check that a shortcut can be launched safely: enabled, has an intent,
/// resolves to an exported activity, and any declared permission is held.
pub fn check_launchable(
    resolver: &dyn ActivityResolver,
    shortcut: &StaticShortcutRecord,
) -> Result<(), LaunchRejection> {
    if !shortcut.enabled {
        return Err(LaunchRejection::Disabled);
    }
    // The last intent in the list is the one the launcher fires.
    let intent = shortcut.intents.last().ok_or(LaunchRejection::NoIntent)?;
    let info = resolver
        .resolve_activity(intent)
        .ok_or(LaunchRejection::ActivityNotFound)?;
    if !info.exported {
        return Err(LaunchRejection::NotExported);
    }
    if let Some(permission) = info.permission {
        if !resolver.holds_permission(&permission) {
            return Err(LaunchRejection::PermissionRequired(permission));
        }
    }
    Ok(())
}

// --- Wire codec -----------------------------------------------------------
//
// The cached payload is a list of these, camelCase-keyed. Optional fields
// missing on decode default rather than failing the whole list; a single
// malformed extra is dropped without losing its shortcut.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShortcutWire {
    pub package_name: String,
    pub app_label: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_res_id: Option<String>,
    pub enabled: bool,
    pub intents: Vec<IntentWire>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentWire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Vec<ExtraWire>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtraWire {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
}

impl ShortcutWire {
    pub fn encode(shortcut: &StaticShortcutRecord) -> Self {
        Self {
            package_name: shortcut.package_name.clone(),
            app_label: shortcut.app_label.clone(),
            id: shortcut.id.clone(),
            short_label: shortcut.short_label.clone(),
            long_label: shortcut.long_label.clone(),
            icon_res_id: shortcut.icon_ref.clone(),
            enabled: shortcut.enabled,
            intents: shortcut
                .intents
                .iter()
                .map(|intent| IntentWire {
                    action: intent.action.clone(),
                    target_package: Some(intent.target_package.clone()),
                    target_class: intent.target_class.clone(),
                    data: intent.data_uri.clone(),
                    extras: if intent.extras.is_empty() {
                        None
                    } else {
                        Some(
                            intent
                                .extras
                                .iter()
                                .map(|extra| ExtraWire {
                                    name: extra.name.clone(),
                                    type_name: extra.value.type_name().to_string(),
                                    value: extra.value.render(),
                                })
                                .collect(),
                        )
                    },
                })
                .collect(),
        }
    }

    /// Rebuild the record. `None` when the id doesn't validate; bad
    /// extras are dropped individually.
    pub fn decode(self) -> Option<StaticShortcutRecord> {
        if !is_valid_shortcut_id(&self.id) {
            return None;
        }
        let package_name = self.package_name;
        let intents = self
            .intents
            .into_iter()
            .map(|intent| IntentSpec {
                action: intent.action,
                target_package: intent
                    .target_package
                    .unwrap_or_else(|| package_name.clone()),
                target_class: intent.target_class,
                data_uri: intent.data,
                extras: intent
                    .extras
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|extra| {
                        TypedValue::from_wire(&extra.type_name, &extra.value)
                            .map(|value| IntentExtra {
                                name: extra.name,
                                value,
                            })
                    })
                    .collect(),
                new_task: true,
            })
            .collect();

        Some(StaticShortcutRecord {
            package_name,
            app_label: self.app_label,
            id: self.id,
            short_label: self.short_label,
            long_label: self.long_label,
            icon_ref: self.icon_res_id,
            enabled: self.enabled,
            intents,
        })
    }
}

// --- Discovery ------------------------------------------------------------

/// One full scan over every installed application's descriptors.
pub struct DiscoveryEngine<'a> {
    activities: &'a dyn ActivityResolver,
    resources: &'a dyn ResourceResolver,
}

impl<'a> DiscoveryEngine<'a> {
    pub fn new(
        activities: &'a dyn ActivityResolver,
        resources: &'a dyn ResourceResolver,
    ) -> Self {
        Self {
            activities,
            resources,
        }
    }

    /// Run the full discovery pass.
    ///
    /// Every per-application step is fault-isolated: a missing resource or
    /// malformed descriptor skips that application only. The result is
    /// filtered to safely launchable shortcuts and sorted by
    /// (app label, display name, id), case-insensitively.
    pub fn scan(&self) -> Vec<StaticShortcutRecord> {
        let activities = match self.activities.launcher_activities() {
            Ok(activities) => activities,
            Err(e) => {
                warn!(error = %e, "launcher activity enumeration failed");
                return Vec::new();
            }
        };

        // One descriptor reference per application; an activity-level
        // declaration beats an application-level one.
        let mut per_package: BTreeMap<String, (String, String, bool)> = BTreeMap::new();
        for activity in &activities {
            let Some(reference) = activity.shortcuts_ref() else {
                continue;
            };
            let activity_level = activity.activity_shortcuts_ref.is_some();
            let replace = match per_package.get(&activity.package) {
                None => true,
                Some((_, _, existing_activity_level)) => {
                    activity_level && !*existing_activity_level
                }
            };
            if replace {
                per_package.insert(
                    activity.package.clone(),
                    (activity.app_label.clone(), reference.to_string(), activity_level),
                );
            }
        }

        let mut parsed_keys: HashSet<(String, String)> = HashSet::new();
        let mut shortcuts = Vec::new();

        for (package, (app_label, reference, _)) in per_package {
            // ResourceKey dedup: parse each descriptor at most once.
            if !parsed_keys.insert((package.clone(), reference.clone())) {
                continue;
            }

            let xml = match self.resources.open_descriptor(&package, &reference) {
                Ok(xml) => xml,
                Err(e) => {
                    warn!(package = %package, error = %e, "descriptor unavailable, skipping application");
                    continue;
                }
            };

            let parser = DescriptorParser::new(&package, &app_label, self.resources);
            match parser.parse(&xml) {
                Ok(parsed) => shortcuts.extend(parsed),
                Err(e) => {
                    warn!(package = %package, error = %e, "descriptor parse failed, skipping application");
                }
            }
        }

        self.filter_and_sort(shortcuts)
    }

    fn filter_and_sort(
        &self,
        mut shortcuts: Vec<StaticShortcutRecord>,
    ) -> Vec<StaticShortcutRecord> {
        shortcuts.retain(|shortcut| match check_launchable(self.activities, shortcut) {
            Ok(()) => true,
            Err(rejection) => {
                debug!(
                    package = %shortcut.package_name,
                    id = %shortcut.id,
                    %rejection,
                    "filtering unlaunchable shortcut"
                );
                false
            }
        });
        shortcuts.sort_by(|a, b| {
            name_cmp(&a.app_label, &b.app_label)
                .then_with(|| name_cmp(a.display_name(), b.display_name()))
                .then_with(|| name_cmp(&a.id, &b.id))
        });
        shortcuts
    }
}

// --- Repository -----------------------------------------------------------

#[derive(Default)]
struct Snapshot {
    version: u64,
    records: Option<Arc<Vec<StaticShortcutRecord>>>,
}

/// Serves shortcut lists, instantly from a snapshot when one exists.
///
/// The in-memory snapshot is a versioned cell behind a mutex so a racing
/// rescan is at least detectable through [`Self::snapshot_version`].
/// At-most-one rescan in flight remains a caller contract; the repository
/// does not serialize rescans itself.
pub struct ShortcutRepository {
    activities: Arc<dyn ActivityResolver>,
    resources: Arc<dyn ResourceResolver>,
    cache: CacheStore<ShortcutWire>,
    snapshot: Mutex<Snapshot>,
}

impl ShortcutRepository {
    pub fn new(
        activities: Arc<dyn ActivityResolver>,
        resources: Arc<dyn ResourceResolver>,
        cache: CacheStore<ShortcutWire>,
    ) -> Self {
        Self {
            activities,
            resources,
            cache,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// Always performs a full rescan, persists the fresh result, and
    /// atomically replaces the in-memory snapshot.
    pub fn load_from_system(&self) -> Vec<StaticShortcutRecord> {
        let engine = DiscoveryEngine::new(self.activities.as_ref(), self.resources.as_ref());
        let records = engine.scan();

        let wire: Vec<ShortcutWire> = records.iter().map(ShortcutWire::encode).collect();
        if !self.cache.save(&wire) {
            warn!("shortcut cache save failed, serving fresh scan uncached");
        }

        self.replace_snapshot(records.clone());
        records
    }

    /// Serves the in-memory snapshot if present, else the cache store.
    /// Either way the result is re-filtered through the launch-safety
    /// checks; `None` means a cache miss and the caller should rescan.
    pub fn load_cached(&self) -> Option<Vec<StaticShortcutRecord>> {
        if let Some(records) = self.current_snapshot() {
            return Some(self.refilter(records.as_ref().clone()));
        }

        let wire = self.cache.load()?;
        let records: Vec<StaticShortcutRecord> =
            wire.into_iter().filter_map(ShortcutWire::decode).collect();

        self.replace_snapshot(records.clone());
        Some(self.refilter(records))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        let mut snapshot = self.lock_snapshot();
        snapshot.version += 1;
        snapshot.records = None;
    }

    /// When the cached shortcut list was last rebuilt, 0 if never.
    pub fn last_updated_at_millis(&self) -> i64 {
        self.cache.last_updated_at_millis()
    }

    /// Bumps on every snapshot replacement; lets callers detect that a
    /// concurrent rescan overwrote what they were looking at.
    pub fn snapshot_version(&self) -> u64 {
        self.lock_snapshot().version
    }

    fn current_snapshot(&self) -> Option<Arc<Vec<StaticShortcutRecord>>> {
        self.lock_snapshot().records.clone()
    }

    fn replace_snapshot(&self, records: Vec<StaticShortcutRecord>) {
        let mut snapshot = self.lock_snapshot();
        snapshot.version += 1;
        snapshot.records = Some(Arc::new(records));
    }

    // The guard only covers cheap field swaps, so a panic while holding
    // it leaves the snapshot consistent; keep serving it after poison.
    fn lock_snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refilter(&self, mut records: Vec<StaticShortcutRecord>) -> Vec<StaticShortcutRecord> {
        records.retain(|shortcut| check_launchable(self.activities.as_ref(), shortcut).is_ok());
        records
    }
}
