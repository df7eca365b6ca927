//! Contact aggregation.
//!
//! The contacts provider hands back one row per phone number and one row
//! per data method; this module folds that multiset into deduplicated
//! contact records with ordered action methods. Phone numbers routinely
//! appear twice (local format and E.164), so merging keeps the form that
//! carries a country code. Provider failures and missing permission both
//! come back as an empty list, never an error.

use std::collections::HashMap;
use tracing::debug;

use crate::platform::{ActivityResolver, ContactsProvider, DataRow, PhoneRow};
use crate::ranking::{name_cmp, rank, PriorityTier, Query};

/// Package probed for the video-calling companion; a Phone row only grows
/// a meet method when it is installed.
const MEET_PACKAGE: &str = "com.google.android.apps.tachyon";

const MIME_PHONE: &str = "vnd.android.cursor.item/phone_v2";
const MIME_EMAIL: &str = "vnd.android.cursor.item/email_v2";
const MIME_WHATSAPP_MESSAGE: &str = "vnd.android.cursor.item/vnd.com.whatsapp.profile";
const MIME_WHATSAPP_CALL: &str = "vnd.android.cursor.item/vnd.com.whatsapp.voip.call";
const MIME_WHATSAPP_VIDEO_CALL: &str = "vnd.android.cursor.item/vnd.com.whatsapp.video.call";
const MIME_TELEGRAM_MESSAGE: &str =
    "vnd.android.cursor.item/vnd.org.telegram.messenger.android.profile";
const MIME_TELEGRAM_CALL: &str =
    "vnd.android.cursor.item/vnd.org.telegram.messenger.android.call";
const MIME_TELEGRAM_VIDEO_CALL: &str =
    "vnd.android.cursor.item/vnd.org.telegram.messenger.android.call.video";

/// Vendor-namespace prefix shared by third-party contact methods.
const VENDOR_MIME_PREFIX: &str = "vnd.android.cursor.item/vnd.";

/// Fallback label when a vendor MIME type can't be attributed to an app.
const GENERIC_APP_LABEL: &str = "Open in app";

/// Common fields carried by every contact method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub label: String,
    pub raw_value: String,
    pub source_row_id: i64,
    pub is_primary: bool,
}

/// One actionable way to reach a contact.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactMethod {
    Phone(MethodInfo),
    Sms(MethodInfo),
    Email(MethodInfo),
    WhatsAppCall(MethodInfo),
    WhatsAppMessage(MethodInfo),
    WhatsAppVideoCall(MethodInfo),
    TelegramMessage(MethodInfo),
    TelegramCall(MethodInfo),
    TelegramVideoCall(MethodInfo),
    GoogleMeet(MethodInfo),
    CustomApp {
        info: MethodInfo,
        mime_type: String,
        package_name: Option<String>,
    },
}

impl ContactMethod {
    pub fn info(&self) -> &MethodInfo {
        match self {
            ContactMethod::Phone(info)
            | ContactMethod::Sms(info)
            | ContactMethod::Email(info)
            | ContactMethod::WhatsAppCall(info)
            | ContactMethod::WhatsAppMessage(info)
            | ContactMethod::WhatsAppVideoCall(info)
            | ContactMethod::TelegramMessage(info)
            | ContactMethod::TelegramCall(info)
            | ContactMethod::TelegramVideoCall(info)
            | ContactMethod::GoogleMeet(info) => info,
            ContactMethod::CustomApp { info, .. } => info,
        }
    }

    fn is_email(&self) -> bool {
        matches!(self, ContactMethod::Email(_))
    }
}

/// A merged, deduplicated contact.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRecord {
    pub contact_id: i64,
    pub lookup_key: String,
    pub display_name: String,
    /// No two entries are the same number under loose equivalence.
    pub phone_numbers: Vec<String>,
    pub photo_uri: Option<String>,
    pub methods: Vec<ContactMethod>,
}

/// Loose phone equivalence: digits-only comparison ignoring a leading
/// country calling code (up to three digits).
pub fn loosely_equal(a: &str, b: &str) -> bool {
    let a: String = a.chars().filter(|c| c.is_ascii_digit()).collect();
    let b: String = b.chars().filter(|c| c.is_ascii_digit()).collect();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let (longer, shorter) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };
    longer.len() - shorter.len() <= 3 && longer.ends_with(shorter.as_str())
}

fn has_country_code(number: &str) -> bool {
    number.trim_start().starts_with('+')
}

/// Fold one more number into a contact's list, keeping the invariant that
/// no two entries are loosely equal. The country-code form always wins.
fn merge_phone_number(numbers: &mut Vec<String>, incoming: &str) {
    if numbers.iter().any(|existing| existing == incoming) {
        return;
    }
    for existing in numbers.iter_mut() {
        if loosely_equal(existing, incoming) {
            if has_country_code(incoming) && !has_country_code(existing) {
                *existing = incoming.to_string();
            }
            return;
        }
    }
    numbers.push(incoming.to_string());
}

/// Derive a package name from a vendor MIME type of the form
/// `<prefix>.<a>.<b>.<suffix>`: the first two dot-separated segments
/// after the prefix.
fn vendor_package(mime_type: &str) -> Option<String> {
    let rest = mime_type.strip_prefix(VENDOR_MIME_PREFIX)?;
    let segments: Vec<&str> = rest.split('.').collect();
    if segments.len() < 3 || segments[0].is_empty() || segments[1].is_empty() {
        return None;
    }
    Some(format!("{}.{}", segments[0], segments[1]))
}

/// Merges raw provider rows into ranked, deduplicated contact records.
pub struct ContactAggregator<'a> {
    provider: &'a dyn ContactsProvider,
    packages: &'a dyn ActivityResolver,
}

impl<'a> ContactAggregator<'a> {
    pub fn new(provider: &'a dyn ContactsProvider, packages: &'a dyn ActivityResolver) -> Self {
        Self { provider, packages }
    }

    /// Look specific contacts up, sorted case-insensitively by name.
    pub fn lookup_by_ids(&self, ids: &[i64]) -> Vec<ContactRecord> {
        if !self.provider.has_permission() {
            return Vec::new();
        }
        let phone_rows = match self.provider.phone_rows_for(ids) {
            Ok(rows) => rows,
            Err(e) => {
                debug!(error = %e, "contact lookup failed");
                return Vec::new();
            }
        };

        let mut contacts: HashMap<i64, ContactRecord> = HashMap::new();
        for row in phone_rows {
            self.accumulate_phone_row(&mut contacts, row);
        }

        let mut records = self.attach_methods(contacts);
        records.sort_by(|a, b| name_cmp(&a.display_name, &b.display_name));
        records
    }

    /// Search contacts by display name.
    ///
    /// `limit` caps the number of distinct contacts admitted while rows
    /// accumulate; a contact already admitted keeps receiving its
    /// remaining phone rows even after the cap is reached. Results are
    /// ordered by match tier, then alphabetically.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ContactRecord> {
        if !self.provider.has_permission() {
            return Vec::new();
        }
        let query = Query::new(query);
        if query.is_empty() {
            return Vec::new();
        }
        let rows = match self.provider.phone_rows() {
            Ok(rows) => rows,
            Err(e) => {
                debug!(error = %e, "contact search failed");
                return Vec::new();
            }
        };

        let mut contacts: HashMap<i64, ContactRecord> = HashMap::new();
        let mut tiers: HashMap<i64, PriorityTier> = HashMap::new();

        for row in rows {
            if contacts.contains_key(&row.contact_id) {
                self.accumulate_phone_row(&mut contacts, row);
                continue;
            }
            if contacts.len() >= limit {
                continue;
            }
            let tier = rank(&row.display_name, &query);
            if tier.is_excluded() {
                continue;
            }
            tiers.insert(row.contact_id, tier);
            self.accumulate_phone_row(&mut contacts, row);
        }

        let mut records = self.attach_methods(contacts);
        records.sort_by(|a, b| {
            tiers[&a.contact_id]
                .cmp(&tiers[&b.contact_id])
                .then_with(|| name_cmp(&a.display_name, &b.display_name))
        });
        records
    }

    fn accumulate_phone_row(&self, contacts: &mut HashMap<i64, ContactRecord>, row: PhoneRow) {
        let contact = contacts.entry(row.contact_id).or_insert_with(|| ContactRecord {
            contact_id: row.contact_id,
            lookup_key: row.lookup_key.clone(),
            display_name: row.display_name.clone(),
            phone_numbers: Vec::new(),
            photo_uri: row.photo_uri.clone(),
            methods: Vec::new(),
        });
        if contact.photo_uri.is_none() {
            contact.photo_uri = row.photo_uri;
        }
        merge_phone_number(&mut contact.phone_numbers, &row.number);
    }

    /// Fetch the data rows for the accumulated contacts and assemble
    /// their method lists.
    fn attach_methods(&self, contacts: HashMap<i64, ContactRecord>) -> Vec<ContactRecord> {
        let mut contacts = contacts;
        if contacts.is_empty() {
            return Vec::new();
        }
        let ids: Vec<i64> = contacts.keys().copied().collect();
        let rows = match self.provider.data_rows_for(&ids) {
            Ok(rows) => rows,
            Err(e) => {
                debug!(error = %e, "method rows unavailable");
                Vec::new()
            }
        };

        let meet_available = self.packages.is_package_installed(MEET_PACKAGE);
        let mut seen_numbers: HashMap<i64, Vec<String>> = HashMap::new();

        // Rows arrive (super-primary desc, primary desc); arrival order is
        // preserved for everything except the final Email-last pass.
        for row in rows {
            let Some(contact) = contacts.get_mut(&row.contact_id) else {
                continue;
            };
            self.append_methods(contact, &row, meet_available, &mut seen_numbers);
        }

        for contact in contacts.values_mut() {
            // Stable: Email methods migrate to the end, the rest keep
            // arrival order.
            contact.methods.sort_by_key(|m| m.is_email());
        }

        contacts.into_values().collect()
    }

    fn append_methods(
        &self,
        contact: &mut ContactRecord,
        row: &DataRow,
        meet_available: bool,
        seen_numbers: &mut HashMap<i64, Vec<String>>,
    ) {
        let info = MethodInfo {
            label: row.label.clone().unwrap_or_default(),
            raw_value: row.value.clone(),
            source_row_id: row.row_id,
            is_primary: row.is_primary,
        };

        match row.mime_type.as_str() {
            MIME_PHONE => {
                // Duplicate phone rows for the same number would grow
                // duplicate action buttons; only the first counts.
                let seen = seen_numbers.entry(row.contact_id).or_default();
                if seen.iter().any(|n| n == &row.value) {
                    return;
                }
                seen.push(row.value.clone());

                contact.methods.push(ContactMethod::Phone(info.clone()));
                contact.methods.push(ContactMethod::Sms(info.clone()));
                if meet_available {
                    contact.methods.push(ContactMethod::GoogleMeet(info));
                }
            }
            MIME_EMAIL => contact.methods.push(ContactMethod::Email(info)),
            MIME_WHATSAPP_MESSAGE => {
                contact.methods.push(ContactMethod::WhatsAppMessage(info))
            }
            MIME_WHATSAPP_CALL => contact.methods.push(ContactMethod::WhatsAppCall(info)),
            MIME_WHATSAPP_VIDEO_CALL => {
                contact.methods.push(ContactMethod::WhatsAppVideoCall(info))
            }
            MIME_TELEGRAM_MESSAGE => {
                contact.methods.push(ContactMethod::TelegramMessage(info))
            }
            MIME_TELEGRAM_CALL => contact.methods.push(ContactMethod::TelegramCall(info)),
            MIME_TELEGRAM_VIDEO_CALL => {
                contact.methods.push(ContactMethod::TelegramVideoCall(info))
            }
            mime if mime.starts_with(VENDOR_MIME_PREFIX) => {
                let package_name = vendor_package(mime);
                // Without a recognizable package the row's own label is
                // untrustworthy too; fall back to the generic one.
                let info = if package_name.is_none() {
                    MethodInfo {
                        label: GENERIC_APP_LABEL.to_string(),
                        ..info
                    }
                } else {
                    info
                };
                contact.methods.push(ContactMethod::CustomApp {
                    info,
                    mime_type: mime.to_string(),
                    package_name,
                });
            }
            _ => {}
        }
    }
}
