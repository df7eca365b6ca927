//! Directory-backed host platform.
//!
//! Each installed application is a bundle directory holding a
//! `package.toml` manifest (identity, activities, resource tables) next
//! to its shortcut descriptor XML files. Bundle roots are scanned the
//! same way the launcher scans application directories: shallow walk,
//! first bundle for a package wins, a malformed bundle is skipped with a
//! warning rather than failing the scan.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{ActivityInfo, ActivityResolver, LauncherActivity, ResourceResolver};
use crate::error::{ScoutError, ScoutResult};
use crate::services::shortcuts::parser::qualify_class;
use crate::services::shortcuts::{IntentSpec, TypedValue};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct BundleManifest {
    package: String,
    label: String,
    #[serde(default)]
    app: AppSection,
    #[serde(default, rename = "activity")]
    activities: Vec<ActivitySection>,
    #[serde(default)]
    resources: ResourcesSection,
}

#[derive(Debug, Default, Deserialize)]
struct AppSection {
    shortcuts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivitySection {
    class: String,
    #[serde(default)]
    launcher: bool,
    #[serde(default)]
    exported: bool,
    permission: Option<String>,
    shortcuts: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourcesSection {
    #[serde(default)]
    strings: BTreeMap<String, String>,
    #[serde(default)]
    values: BTreeMap<String, toml::Value>,
}

struct Bundle {
    dir: PathBuf,
    manifest: BundleManifest,
}

/// The bundled [`ActivityResolver`] + [`ResourceResolver`] implementation
/// over on-disk package bundles.
pub struct FsPlatform {
    bundles: BTreeMap<String, Bundle>,
    held_permissions: Vec<String>,
}

impl FsPlatform {
    /// Scan the given bundle roots. Bundles that fail to parse are
    /// skipped individually.
    pub fn scan(roots: &[PathBuf]) -> Self {
        let mut bundles = BTreeMap::new();

        for root in roots {
            if !root.exists() {
                continue;
            }
            for entry in WalkDir::new(root)
                .max_depth(2)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_name() != "package.toml" {
                    continue;
                }
                let manifest_path = entry.path();
                match Self::read_manifest(manifest_path) {
                    Ok(manifest) => {
                        let dir = manifest_path
                            .parent()
                            .unwrap_or(Path::new("."))
                            .to_path_buf();
                        // First bundle seen for a package wins.
                        bundles
                            .entry(manifest.package.clone())
                            .or_insert(Bundle { dir, manifest });
                    }
                    Err(e) => {
                        warn!(path = %manifest_path.display(), error = %e, "skipping unreadable bundle");
                    }
                }
            }
        }

        debug!(count = bundles.len(), "indexed package bundles");
        Self {
            bundles,
            held_permissions: Vec::new(),
        }
    }

    /// Permissions the calling application holds, for the launch-safety
    /// permission gate.
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.held_permissions = permissions;
        self
    }

    pub fn package_count(&self) -> usize {
        self.bundles.len()
    }

    fn read_manifest(path: &Path) -> ScoutResult<BundleManifest> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    fn bundle(&self, package: &str) -> Option<&Bundle> {
        self.bundles.get(package)
    }

    /// `@xml/name` resolves to `name.xml` inside the bundle directory.
    fn descriptor_path(bundle: &Bundle, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix("@xml/")?;
        Some(bundle.dir.join(format!("{name}.xml")))
    }
}

impl ActivityResolver for FsPlatform {
    fn launcher_activities(&self) -> ScoutResult<Vec<LauncherActivity>> {
        let mut activities = Vec::new();
        for bundle in self.bundles.values() {
            let manifest = &bundle.manifest;
            for activity in manifest.activities.iter().filter(|a| a.launcher) {
                activities.push(LauncherActivity {
                    package: manifest.package.clone(),
                    class: qualify_class(&manifest.package, &activity.class),
                    app_label: manifest.label.clone(),
                    activity_shortcuts_ref: activity.shortcuts.clone(),
                    app_shortcuts_ref: manifest.app.shortcuts.clone(),
                });
            }
        }
        Ok(activities)
    }

    fn resolve_activity(&self, intent: &IntentSpec) -> Option<ActivityInfo> {
        let target_class = intent.target_class.as_deref()?;
        let bundle = self.bundle(&intent.target_package)?;
        let manifest = &bundle.manifest;
        manifest
            .activities
            .iter()
            .find(|a| qualify_class(&manifest.package, &a.class) == target_class)
            .map(|a| ActivityInfo {
                exported: a.exported,
                permission: a.permission.clone(),
            })
    }

    fn is_package_installed(&self, package: &str) -> bool {
        self.bundles.contains_key(package)
    }

    fn holds_permission(&self, permission: &str) -> bool {
        self.held_permissions.iter().any(|p| p == permission)
    }
}

impl ResourceResolver for FsPlatform {
    fn open_descriptor(&self, package: &str, reference: &str) -> ScoutResult<String> {
        let bundle = self
            .bundle(package)
            .ok_or_else(|| ScoutError::Package(format!("unknown package {package}")))?;
        let path = Self::descriptor_path(bundle, reference).ok_or_else(|| {
            ScoutError::Resource(format!("{reference} is not a descriptor reference"))
        })?;
        Ok(fs::read_to_string(path)?)
    }

    fn resolve_string(&self, package: &str, reference: &str) -> Option<String> {
        let name = reference.strip_prefix("@string/")?;
        self.bundle(package)?
            .manifest
            .resources
            .strings
            .get(name)
            .cloned()
    }

    fn resolve_typed(&self, package: &str, reference: &str) -> Option<TypedValue> {
        // Any `@<type>/name` reference looks the value up by name; the
        // stored value's own type picks the variant.
        let name = reference.strip_prefix('@')?.split('/').nth(1)?;
        let value = self.bundle(package)?.manifest.resources.values.get(name)?;
        match value {
            toml::Value::Boolean(b) => Some(TypedValue::Bool(*b)),
            toml::Value::Integer(i) => Some(match i32::try_from(*i) {
                Ok(narrow) => TypedValue::Int(narrow),
                Err(_) => TypedValue::Long(*i),
            }),
            toml::Value::Float(f) => Some(TypedValue::Float(*f as f32)),
            toml::Value::String(s) => Some(TypedValue::String(s.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_bundle(root: &Path, dir_name: &str, manifest: &str, descriptor: Option<&str>) {
        let dir = root.join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.toml"), manifest).unwrap();
        if let Some(xml) = descriptor {
            fs::write(dir.join("shortcuts.xml"), xml).unwrap();
        }
    }

    const MAIL_MANIFEST: &str = r#"
        package = "com.example.mail"
        label = "Mail"

        [[activity]]
        class = ".MainActivity"
        launcher = true
        exported = true
        shortcuts = "@xml/shortcuts"

        [resources.strings]
        compose = "Compose"

        [resources.values]
        badge = 3
    "#;

    #[test]
    fn test_scan_and_enumerate() {
        let root = tempfile::TempDir::new().unwrap();
        write_bundle(root.path(), "mail", MAIL_MANIFEST, Some("<shortcuts/>"));

        let platform = FsPlatform::scan(&[root.path().to_path_buf()]);
        assert_eq!(platform.package_count(), 1);
        assert!(platform.is_package_installed("com.example.mail"));

        let activities = platform.launcher_activities().unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].class, "com.example.mail.MainActivity");
        assert_eq!(activities[0].shortcuts_ref(), Some("@xml/shortcuts"));
    }

    #[test]
    fn test_malformed_bundle_skipped() {
        let root = tempfile::TempDir::new().unwrap();
        write_bundle(root.path(), "mail", MAIL_MANIFEST, None);
        write_bundle(root.path(), "broken", "label = [not, valid", None);

        let platform = FsPlatform::scan(&[root.path().to_path_buf()]);
        assert_eq!(platform.package_count(), 1);
    }

    #[test]
    fn test_descriptor_and_resources() {
        let root = tempfile::TempDir::new().unwrap();
        write_bundle(root.path(), "mail", MAIL_MANIFEST, Some("<shortcuts/>"));
        let platform = FsPlatform::scan(&[root.path().to_path_buf()]);

        assert_eq!(
            platform
                .open_descriptor("com.example.mail", "@xml/shortcuts")
                .unwrap(),
            "<shortcuts/>"
        );
        assert!(platform
            .open_descriptor("com.example.mail", "@xml/missing")
            .is_err());
        assert_eq!(
            platform.resolve_string("com.example.mail", "@string/compose"),
            Some("Compose".to_string())
        );
        assert_eq!(
            platform.resolve_typed("com.example.mail", "@integer/badge"),
            Some(TypedValue::Int(3))
        );
    }

    #[test]
    fn test_resolve_activity_and_permissions() {
        let root = tempfile::TempDir::new().unwrap();
        write_bundle(root.path(), "mail", MAIL_MANIFEST, None);
        let platform = FsPlatform::scan(&[root.path().to_path_buf()])
            .with_permissions(vec!["com.example.PERM".to_string()]);

        let intent = IntentSpec {
            action: None,
            target_package: "com.example.mail".to_string(),
            target_class: Some("com.example.mail.MainActivity".to_string()),
            data_uri: None,
            extras: Vec::new(),
            new_task: true,
        };
        let info = platform.resolve_activity(&intent).unwrap();
        assert!(info.exported);

        assert!(platform.holds_permission("com.example.PERM"));
        assert!(!platform.holds_permission("com.other.PERM"));
    }
}
