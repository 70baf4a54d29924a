//! Mapping submitted form values onto Mautic contact attributes.
//!
//! A feed maps each standard Mautic field, and any number of custom fields,
//! to a form field ID. Building a contact walks that mapping and copies the
//! entry's values verbatim.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{Contact, CustomFieldDefinition, ResourceId};

/// Mautic contact fields every feed can map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardField {
    Email,
    FirstName,
    LastName,
    Phone,
    Checkbox,
    Radio,
    Dropdown,
}

impl StandardField {
    pub const ALL: [StandardField; 7] = [
        StandardField::Email,
        StandardField::FirstName,
        StandardField::LastName,
        StandardField::Phone,
        StandardField::Checkbox,
        StandardField::Radio,
        StandardField::Dropdown,
    ];

    /// Mautic field alias used as the contact attribute key.
    pub fn alias(self) -> &'static str {
        match self {
            StandardField::Email => "email",
            StandardField::FirstName => "firstname",
            StandardField::LastName => "lastname",
            StandardField::Phone => "phone",
            StandardField::Checkbox => "checkbox",
            StandardField::Radio => "radio",
            StandardField::Dropdown => "dropdown",
        }
    }

    /// Accepts the Mautic alias or the settings key (`first_name`, ...).
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "email" => StandardField::Email,
            "firstname" | "first_name" => StandardField::FirstName,
            "lastname" | "last_name" => StandardField::LastName,
            "phone" | "phone_number" => StandardField::Phone,
            "checkbox" => StandardField::Checkbox,
            "radio" => StandardField::Radio,
            "dropdown" => StandardField::Dropdown,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            StandardField::Email => "Email Address",
            StandardField::FirstName => "First Name",
            StandardField::LastName => "Last Name",
            StandardField::Phone => "Phone Number",
            StandardField::Checkbox => "Checkbox",
            StandardField::Radio => "Radio Button",
            StandardField::Dropdown => "Dropdown",
        }
    }

    /// Form field types the admin may pick for this field.
    pub fn field_types(self) -> &'static [&'static str] {
        match self {
            StandardField::Email => &["email", "hidden"],
            StandardField::FirstName | StandardField::LastName => &["name", "text", "hidden"],
            StandardField::Phone => &["phone", "text", "hidden"],
            StandardField::Checkbox => &["checkbox"],
            StandardField::Radio => &["radio"],
            StandardField::Dropdown => &["select"],
        }
    }
}

impl fmt::Display for StandardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// A feed's field mapping: Mautic field → form field ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(
        default,
        rename = "mapped_fields",
        alias = "mappedFields",
        serialize_with = "serialize_standard",
        deserialize_with = "deserialize_standard"
    )]
    pub standard: BTreeMap<StandardField, String>,
    #[serde(default, rename = "mapped_custom_fields", alias = "mappedCustomFields")]
    pub custom: BTreeMap<String, String>,
}

fn serialize_standard<S: Serializer>(
    map: &BTreeMap<StandardField, String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (field, form_field) in map {
        out.serialize_entry(field.alias(), form_field)?;
    }
    out.end()
}

fn deserialize_standard<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<StandardField, String>, D::Error> {
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, form_field)| {
            StandardField::from_key(&key)
                .map(|field| (field, form_field))
                .ok_or_else(|| D::Error::custom(format!("unknown Mautic field `{key}`")))
        })
        .collect()
}

impl FieldMapping {
    pub fn map(mut self, field: StandardField, form_field: &str) -> Self {
        self.standard.insert(field, form_field.to_string());
        self
    }

    pub fn map_custom(mut self, custom_field_id: &str, form_field: &str) -> Self {
        self.custom
            .insert(custom_field_id.to_string(), form_field.to_string());
        self
    }

    /// Mapped pairs of (contact attribute, form field ID), standard fields
    /// first. Unmapped (blank) entries are skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.standard
            .iter()
            .map(|(field, id)| (field.alias(), id.as_str()))
            .chain(self.custom.iter().map(|(k, id)| (k.as_str(), id.as_str())))
            .filter(|(_, id)| !id.trim().is_empty())
    }

    /// Builds the contact payload for one submission.
    pub fn build_contact(&self, entry: &Entry) -> Contact {
        self.pairs()
            .map(|(attribute, form_field)| (attribute, entry.field_value(form_field)))
            .collect()
    }
}

/// One submitted form entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: Some(id.into()),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field_id: &str, value: &str) -> Self {
        self.values.insert(field_id.to_string(), value.to_string());
        self
    }

    /// Submitted value of `field_id`. An exact key wins. Otherwise the
    /// non-empty inputs `id.1`, `id.2`, ... are joined with `", "` in input
    /// order, which is how checkbox choices are sent. Missing fields yield an
    /// empty string.
    ///
    /// Name and address fields are meant to be mapped per input (`1.3` for
    /// a first name, `1.6` for a last name). Mapping the whole field still
    /// goes through the checkbox join, giving `"Ada, Lovelace"` rather than
    /// the space-joined `"Ada Lovelace"` the form builder shows in exports.
    pub fn field_value(&self, field_id: &str) -> String {
        if let Some(value) = self.values.get(field_id) {
            return value.clone();
        }

        let prefix = format!("{field_id}.");
        let mut inputs: Vec<(u32, &str)> = self
            .values
            .iter()
            .filter_map(|(key, value)| {
                let index = key.strip_prefix(&prefix)?.parse().ok()?;
                (!value.is_empty()).then_some((index, value.as_str()))
            })
            .collect();
        inputs.sort_by_key(|(index, _)| *index);
        inputs
            .into_iter()
            .map(|(_, value)| value)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One row of a field-map settings widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapEntry {
    pub name: String,
    pub label: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_types: Vec<String>,
}

/// Rows for the standard Mautic fields.
pub fn standard_field_map() -> Vec<FieldMapEntry> {
    StandardField::ALL
        .iter()
        .map(|field| FieldMapEntry {
            name: field.alias().to_string(),
            label: field.label().to_string(),
            required: false,
            field_types: field.field_types().iter().map(|t| t.to_string()).collect(),
        })
        .collect()
}

/// Rows for Mautic custom fields, keyed by custom field ID.
pub fn custom_field_map(definitions: &[CustomFieldDefinition]) -> Vec<FieldMapEntry> {
    definitions
        .iter()
        .map(|def| FieldMapEntry {
            name: def.id.to_string(),
            label: snake_to_title(&def.name),
            required: false,
            field_types: Vec::new(),
        })
        .collect()
}

/// `company_size` → `Company Size`.
pub fn snake_to_title(s: &str) -> String {
    s.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_keys_map_to_mautic_aliases() {
        assert_eq!(StandardField::from_key("first_name"), Some(StandardField::FirstName));
        assert_eq!(StandardField::from_key("phone_number"), Some(StandardField::Phone));
        assert_eq!(StandardField::from_key("lastname"), Some(StandardField::LastName));
        assert_eq!(StandardField::from_key("company"), None);
    }

    #[test]
    fn contact_copies_values_verbatim() {
        let mapping = FieldMapping::default().map(StandardField::Email, "email_1");
        let entry = Entry::new("1").with("email_1", "a@b.com");
        let contact = mapping.build_contact(&entry);
        assert_eq!(contact.get("email"), Some("a@b.com"));
        assert_eq!(contact.len(), 1);
    }

    #[test]
    fn custom_fields_are_mapped_like_standard_ones() {
        let mapping = FieldMapping::default()
            .map(StandardField::FirstName, "1.3")
            .map_custom("e1_T", "4");
        let entry = Entry::new("1").with("1.3", "Ada").with("4", "50-100");
        let contact = mapping.build_contact(&entry);
        assert_eq!(contact.get("firstname"), Some("Ada"));
        assert_eq!(contact.get("e1_T"), Some("50-100"));
    }

    #[test]
    fn contact_keys_stay_within_mapping() {
        let mapping = FieldMapping::default()
            .map(StandardField::Email, "1")
            .map(StandardField::Phone, "")
            .map_custom("e1_T", "9");
        let entry = Entry::new("1").with("1", "a@b.com").with("2", "ignored");
        let contact = mapping.build_contact(&entry);
        let keys: Vec<&str> = contact.keys().collect();
        assert_eq!(keys, vec!["e1_T", "email"]);
    }

    #[test]
    fn missing_value_is_empty_string() {
        assert_eq!(Entry::new("1").field_value("3"), "");
    }

    #[test]
    fn checkbox_inputs_join_in_input_order() {
        let entry = Entry::new("1")
            .with("5.10", "Tenth")
            .with("5.2", "Second")
            .with("5.1", "First")
            .with("5.3", "")
            .with("55.1", "Other field");
        assert_eq!(entry.field_value("5"), "First, Second, Tenth");
    }

    #[test]
    fn name_inputs_resolve_individually() {
        let entry = Entry::new("1").with("1.3", "Ada").with("1.6", "Lovelace");
        assert_eq!(entry.field_value("1.3"), "Ada");
        assert_eq!(entry.field_value("1.6"), "Lovelace");
        // The whole field falls back to the checkbox join.
        assert_eq!(entry.field_value("1"), "Ada, Lovelace");
    }

    #[test]
    fn mapping_round_trips_through_json_keys() {
        let mapping: FieldMapping = serde_json::from_str(
            r#"{"mapped_fields":{"email":"1","first_name":"2.3"},"mapped_custom_fields":{"e1_T":"4"}}"#,
        )
        .unwrap();
        assert_eq!(mapping.standard.get(&StandardField::FirstName).map(String::as_str), Some("2.3"));
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["mapped_fields"]["firstname"], "2.3");
    }

    #[test]
    fn unknown_standard_key_is_rejected() {
        let result: Result<FieldMapping, _> =
            serde_json::from_str(r#"{"mapped_fields":{"company":"1"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn snake_case_becomes_title_case() {
        assert_eq!(snake_to_title("company_size"), "Company Size");
        assert_eq!(snake_to_title("nps"), "Nps");
        assert_eq!(snake_to_title("__double__under"), "Double Under");
    }

    #[test]
    fn custom_rows_use_id_as_name() {
        let rows = custom_field_map(&[CustomFieldDefinition {
            id: "e1_T".into(),
            name: "company_size".to_string(),
        }]);
        assert_eq!(rows[0].name, "e1_T");
        assert_eq!(rows[0].label, "Company Size");
    }

    #[test]
    fn standard_rows_cover_every_field() {
        let rows = standard_field_map();
        assert_eq!(rows.len(), StandardField::ALL.len());
        assert_eq!(rows[0].field_types, vec!["email", "hidden"]);
    }
}
