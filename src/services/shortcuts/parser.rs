//! Shortcut descriptor parsing.
//!
//! Descriptors are a three-level XML tree (`shortcut` → `intent`* →
//! `extra`*) with both namespaced and unnamespaced attribute spellings in
//! the wild; namespaced wins. Parsing is an explicit state machine driven
//! by the XML event stream: one malformed extra is dropped without losing
//! the intent, while a malformed document fails the whole application and
//! is skipped by the caller.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::{is_valid_shortcut_id, IntentExtra, IntentSpec, StaticShortcutRecord, TypedValue};
use crate::error::ScoutResult;
use crate::platform::ResourceResolver;

/// Where the walk currently is in the descriptor tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InShortcut,
    InIntent,
    InExtra,
}

/// Explicitly-typed literal attributes, in resolution order.
const EXPLICIT_VALUE_ATTRS: &[(&str, ExplicitKind)] = &[
    ("valueBoolean", ExplicitKind::Boolean),
    ("valueInt", ExplicitKind::Int),
    ("valueInteger", ExplicitKind::Int),
    ("valueLong", ExplicitKind::Long),
    ("valueFloat", ExplicitKind::Float),
    ("valueDouble", ExplicitKind::Double),
    ("valueUri", ExplicitKind::Uri),
    ("valueString", ExplicitKind::String),
];

#[derive(Debug, Clone, Copy)]
enum ExplicitKind {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Uri,
    String,
}

/// Parses one application's shortcut descriptor.
pub struct DescriptorParser<'a> {
    package: String,
    app_label: String,
    resolver: &'a dyn ResourceResolver,
}

impl<'a> DescriptorParser<'a> {
    pub fn new(package: &str, app_label: &str, resolver: &'a dyn ResourceResolver) -> Self {
        Self {
            package: package.to_string(),
            app_label: app_label.to_string(),
            resolver,
        }
    }

    /// Walk the descriptor and collect every committable shortcut.
    ///
    /// A shortcut commits when its closing tag is reached with `enabled`
    /// still true and a valid id. Malformed XML fails the whole document.
    pub fn parse(&self, xml: &str) -> ScoutResult<Vec<StaticShortcutRecord>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut state = State::Idle;
        let mut shortcuts = Vec::new();
        let mut current_shortcut: Option<StaticShortcutRecord> = None;
        let mut current_intent: Option<IntentSpec> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    state = self.enter_element(
                        state,
                        &e,
                        &mut current_shortcut,
                        &mut current_intent,
                    );
                }
                Event::Empty(e) => {
                    // Self-closing element: enter and leave in one step.
                    let entered = self.enter_element(
                        state,
                        &e,
                        &mut current_shortcut,
                        &mut current_intent,
                    );
                    if entered != state {
                        state = self.leave_element(
                            entered,
                            local_name(&e),
                            &mut shortcuts,
                            &mut current_shortcut,
                            &mut current_intent,
                        );
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    state = self.leave_element(
                        state,
                        name,
                        &mut shortcuts,
                        &mut current_shortcut,
                        &mut current_intent,
                    );
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(shortcuts)
    }

    fn enter_element(
        &self,
        state: State,
        e: &BytesStart<'_>,
        current_shortcut: &mut Option<StaticShortcutRecord>,
        current_intent: &mut Option<IntentSpec>,
    ) -> State {
        match (state, local_name(e).as_str()) {
            (State::Idle, "shortcut") => {
                *current_shortcut = Some(self.begin_shortcut(e));
                State::InShortcut
            }
            (State::InShortcut, "intent") => {
                *current_intent = Some(self.begin_intent(e));
                State::InIntent
            }
            (State::InIntent, "extra") => {
                if let Some(intent) = current_intent.as_mut() {
                    if let Some(extra) = self.build_extra(e) {
                        intent.extras.push(extra);
                    }
                }
                State::InExtra
            }
            // Anything else (container roots, unknown elements) is ignored.
            _ => state,
        }
    }

    fn leave_element(
        &self,
        state: State,
        name: String,
        shortcuts: &mut Vec<StaticShortcutRecord>,
        current_shortcut: &mut Option<StaticShortcutRecord>,
        current_intent: &mut Option<IntentSpec>,
    ) -> State {
        match (state, name.as_str()) {
            (State::InShortcut, "shortcut") => {
                if let Some(shortcut) = current_shortcut.take() {
                    if shortcut.enabled && is_valid_shortcut_id(&shortcut.id) {
                        shortcuts.push(shortcut);
                    } else {
                        debug!(
                            package = %self.package,
                            id = %shortcut.id,
                            "dropping shortcut at commit"
                        );
                    }
                }
                State::Idle
            }
            (State::InIntent, "intent") => {
                if let (Some(shortcut), Some(intent)) =
                    (current_shortcut.as_mut(), current_intent.take())
                {
                    shortcut.intents.push(intent);
                }
                State::InShortcut
            }
            (State::InExtra, "extra") => State::InIntent,
            _ => state,
        }
    }

    fn begin_shortcut(&self, e: &BytesStart<'_>) -> StaticShortcutRecord {
        StaticShortcutRecord {
            package_name: self.package.clone(),
            app_label: self.app_label.clone(),
            id: attr_value(e, "shortcutId").unwrap_or_default(),
            short_label: self.resolve_label(attr_value(e, "shortcutShortLabel")),
            long_label: self.resolve_label(attr_value(e, "shortcutLongLabel")),
            icon_ref: attr_value(e, "icon"),
            enabled: attr_value(e, "enabled")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            intents: Vec::new(),
        }
    }

    fn begin_intent(&self, e: &BytesStart<'_>) -> IntentSpec {
        let target_package =
            attr_value(e, "targetPackage").unwrap_or_else(|| self.package.clone());
        let target_class = attr_value(e, "targetClass")
            .map(|class| qualify_class(&target_package, &class));

        IntentSpec {
            action: attr_value(e, "action"),
            target_package,
            target_class,
            data_uri: attr_value(e, "data"),
            extras: Vec::new(),
            // The launching side starts every reconstructed intent in a
            // fresh task.
            new_task: true,
        }
    }

    /// Build one typed extra, or `None` if it is malformed (the rest of
    /// the intent still parses).
    fn build_extra(&self, e: &BytesStart<'_>) -> Option<IntentExtra> {
        let name = attr_value(e, "name")?;
        match self.resolve_extra_value(e) {
            Some(value) => Some(IntentExtra { name, value }),
            None => {
                debug!(package = %self.package, extra = %name, "skipping malformed extra");
                None
            }
        }
    }

    /// Ordered resolution chain for an extra's value: resource reference,
    /// then explicitly-typed literal, then type-inferred literal.
    fn resolve_extra_value(&self, e: &BytesStart<'_>) -> Option<TypedValue> {
        if let Some(reference) = attr_value(e, "resource") {
            if let Some(value) = self.resolver.resolve_typed(&self.package, &reference) {
                return Some(value);
            }
        }

        for (attr, kind) in EXPLICIT_VALUE_ATTRS {
            if let Some(raw) = attr_value(e, attr) {
                if raw.trim().is_empty() {
                    continue;
                }
                return parse_explicit(*kind, &raw);
            }
        }

        attr_value(e, "value").map(|raw| infer_typed(&raw))
    }

    /// Labels may be a resource reference or a literal. An unresolvable
    /// reference yields no label rather than leaking the raw marker.
    fn resolve_label(&self, raw: Option<String>) -> Option<String> {
        let raw = raw?;
        if raw.starts_with('@') {
            self.resolver.resolve_string(&self.package, &raw)
        } else {
            Some(raw)
        }
    }
}

/// Fully qualify an activity class name against its owning package.
pub fn qualify_class(package: &str, class: &str) -> String {
    if class.starts_with('.') {
        format!("{package}{class}")
    } else if class.contains('.') {
        class.to_string()
    } else {
        format!("{package}.{class}")
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Look an attribute up by local name; a namespaced spelling wins over an
/// unnamespaced one.
fn attr_value(e: &BytesStart<'_>, name: &str) -> Option<String> {
    let mut plain = None;
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() != name.as_bytes() {
            continue;
        }
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        if attr.key.prefix().is_some() {
            return Some(value);
        }
        plain = Some(value);
    }
    plain
}

fn parse_explicit(kind: ExplicitKind, raw: &str) -> Option<TypedValue> {
    match kind {
        ExplicitKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => Some(TypedValue::Bool(true)),
            "false" => Some(TypedValue::Bool(false)),
            _ => None,
        },
        ExplicitKind::Int => raw.parse().ok().map(TypedValue::Int),
        ExplicitKind::Long => raw.parse().ok().map(TypedValue::Long),
        ExplicitKind::Float => raw.parse().ok().map(TypedValue::Float),
        ExplicitKind::Double => raw.parse().ok().map(TypedValue::Double),
        ExplicitKind::Uri => Some(TypedValue::Uri(raw.to_string())),
        ExplicitKind::String => Some(TypedValue::String(raw.to_string())),
    }
}

/// Infer the type of an untyped literal `value` attribute.
///
/// Leading-zero numeric-looking tokens stay strings so formats like phone
/// extensions survive the round trip.
fn infer_typed(raw: &str) -> TypedValue {
    if raw.eq_ignore_ascii_case("true") {
        return TypedValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return TypedValue::Bool(false);
    }

    if raw.len() > 1 && raw.starts_with('0') && raw.bytes().all(|b| b.is_ascii_digit()) {
        return TypedValue::String(raw.to_string());
    }

    let looks_fractional = raw.contains('.') || raw.contains('e') || raw.contains('E');
    if !looks_fractional {
        if let Ok(wide) = raw.parse::<i64>() {
            return match i32::try_from(wide) {
                Ok(narrow) => TypedValue::Int(narrow),
                Err(_) => TypedValue::Long(wide),
            };
        }
    } else if let Ok(f) = raw.parse::<f32>() {
        return TypedValue::Float(f);
    }

    TypedValue::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ResourceResolver;

    /// Resolver with a couple of canned string/typed resources.
    struct FakeResolver;

    impl ResourceResolver for FakeResolver {
        fn open_descriptor(&self, _package: &str, _reference: &str) -> ScoutResult<String> {
            unreachable!("parser never opens descriptors")
        }

        fn resolve_string(&self, _package: &str, reference: &str) -> Option<String> {
            match reference {
                "@string/compose" => Some("Compose".to_string()),
                _ => None,
            }
        }

        fn resolve_typed(&self, _package: &str, reference: &str) -> Option<TypedValue> {
            match reference {
                "@integer/badge_count" => Some(TypedValue::Int(3)),
                _ => None,
            }
        }
    }

    fn parse(xml: &str) -> Vec<StaticShortcutRecord> {
        DescriptorParser::new("com.example.mail", "Mail", &FakeResolver)
            .parse(xml)
            .unwrap()
    }

    #[test]
    fn test_full_shortcut() {
        let xml = r#"
            <shortcuts xmlns:android="http://schemas.android.com/apk/res/android">
              <shortcut android:shortcutId="compose"
                        android:shortcutShortLabel="@string/compose"
                        android:shortcutLongLabel="Compose a new message"
                        android:icon="@drawable/ic_compose">
                <intent android:action="android.intent.action.VIEW"
                        android:targetClass=".ComposeActivity"
                        android:data="mailto:">
                  <extra android:name="draft" android:value="true"/>
                </intent>
              </shortcut>
            </shortcuts>"#;

        let shortcuts = parse(xml);
        assert_eq!(shortcuts.len(), 1);

        let shortcut = &shortcuts[0];
        assert_eq!(shortcut.id, "compose");
        assert_eq!(shortcut.short_label.as_deref(), Some("Compose"));
        assert_eq!(
            shortcut.long_label.as_deref(),
            Some("Compose a new message")
        );
        assert_eq!(shortcut.icon_ref.as_deref(), Some("@drawable/ic_compose"));
        assert!(shortcut.enabled);

        let intent = &shortcut.intents[0];
        assert_eq!(intent.action.as_deref(), Some("android.intent.action.VIEW"));
        assert_eq!(intent.target_package, "com.example.mail");
        assert_eq!(
            intent.target_class.as_deref(),
            Some("com.example.mail.ComposeActivity")
        );
        assert_eq!(intent.data_uri.as_deref(), Some("mailto:"));
        assert!(intent.new_task);
        assert_eq!(intent.extras[0].value, TypedValue::Bool(true));
    }

    #[test]
    fn test_invalid_ids_never_commit() {
        for id in ["", "123", "@2131230001"] {
            let xml = format!(
                r#"<shortcuts><shortcut shortcutId="{id}"><intent targetClass="A"/></shortcut></shortcuts>"#
            );
            assert!(parse(&xml).is_empty(), "id {id:?} should be rejected");
        }
    }

    #[test]
    fn test_disabled_shortcut_never_commits() {
        let xml = r#"<shortcuts>
            <shortcut shortcutId="hidden" enabled="false"><intent targetClass="A"/></shortcut>
            <shortcut shortcutId="shown"><intent targetClass="A"/></shortcut>
        </shortcuts>"#;
        let shortcuts = parse(xml);
        assert_eq!(shortcuts.len(), 1);
        assert_eq!(shortcuts[0].id, "shown");
    }

    #[test]
    fn test_namespaced_attribute_wins() {
        let xml = r#"<shortcuts xmlns:android="http://schemas.android.com/apk/res/android">
            <shortcut shortcutId="plain" android:shortcutId="namespaced">
              <intent targetClass="A"/>
            </shortcut>
        </shortcuts>"#;
        assert_eq!(parse(xml)[0].id, "namespaced");
    }

    #[test]
    fn test_class_qualification() {
        assert_eq!(qualify_class("com.app", ".Main"), "com.app.Main");
        assert_eq!(qualify_class("com.app", "Main"), "com.app.Main");
        assert_eq!(qualify_class("com.app", "org.other.Main"), "org.other.Main");
    }

    #[test]
    fn test_target_package_defaults_to_scanned_app() {
        let xml = r#"<shortcuts><shortcut shortcutId="s">
            <intent action="a.b.VIEW"/>
        </shortcut></shortcuts>"#;
        let shortcuts = parse(xml);
        let intent = &shortcuts[0].intents[0];
        assert_eq!(intent.target_package, "com.example.mail");
        assert_eq!(intent.target_class, None);
    }

    #[test]
    fn test_extra_resource_reference_wins() {
        let xml = r#"<shortcuts><shortcut shortcutId="s"><intent targetClass="A">
            <extra name="count" resource="@integer/badge_count" value="99"/>
        </intent></shortcut></shortcuts>"#;
        let shortcuts = parse(xml);
        assert_eq!(
            shortcuts[0].intents[0].extras[0].value,
            TypedValue::Int(3)
        );
    }

    #[test]
    fn test_extra_explicit_type_order() {
        let xml = r#"<shortcuts><shortcut shortcutId="s"><intent targetClass="A">
            <extra name="a" valueBoolean="true" valueString="nope"/>
            <extra name="b" valueLong="5000000000"/>
            <extra name="c" valueUri="content://x"/>
        </intent></shortcut></shortcuts>"#;
        let extras = &parse(xml)[0].intents[0].extras;
        assert_eq!(extras[0].value, TypedValue::Bool(true));
        assert_eq!(extras[1].value, TypedValue::Long(5_000_000_000));
        assert_eq!(extras[2].value, TypedValue::Uri("content://x".to_string()));
    }

    #[test]
    fn test_malformed_extra_is_skipped_not_fatal() {
        let xml = r#"<shortcuts><shortcut shortcutId="s"><intent targetClass="A">
            <extra name="bad" valueInt="not-a-number"/>
            <extra name="good" value="7"/>
        </intent></shortcut></shortcuts>"#;
        let extras = &parse(xml)[0].intents[0].extras;
        assert_eq!(extras.len(), 1);
        assert_eq!(extras[0].name, "good");
        assert_eq!(extras[0].value, TypedValue::Int(7));
    }

    #[test]
    fn test_untyped_inference() {
        assert_eq!(infer_typed("true"), TypedValue::Bool(true));
        assert_eq!(infer_typed("FALSE"), TypedValue::Bool(false));
        assert_eq!(infer_typed("42"), TypedValue::Int(42));
        assert_eq!(infer_typed("-7"), TypedValue::Int(-7));
        assert_eq!(infer_typed("5000000000"), TypedValue::Long(5_000_000_000));
        assert_eq!(infer_typed("3.5"), TypedValue::Float(3.5));
        assert_eq!(infer_typed("1e3"), TypedValue::Float(1000.0));
        assert_eq!(infer_typed("hello"), TypedValue::String("hello".to_string()));
        // Leading zero stays a string (phone extensions and the like).
        assert_eq!(infer_typed("0123"), TypedValue::String("0123".to_string()));
        // A lone zero is still a number.
        assert_eq!(infer_typed("0"), TypedValue::Int(0));
    }

    #[test]
    fn test_label_reference_unresolved_yields_none() {
        let xml = r#"<shortcuts><shortcut shortcutId="s" shortcutShortLabel="@string/missing">
            <intent targetClass="A"/>
        </shortcut></shortcuts>"#;
        assert_eq!(parse(xml)[0].short_label, None);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let parser = DescriptorParser::new("com.bad", "Bad", &FakeResolver);
        assert!(parser.parse("<shortcuts><shortcut").is_err());
    }
}
