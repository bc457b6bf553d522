use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};
use tracing::warn;

use super::schema::{FIELDS, FieldDef, FieldKind, Theme};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Typed value of one present column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Integer(i64),
    Decimal(f64),
    Photos(Vec<String>),
}

impl FieldValue {
    /// Plain-text rendering used for table cells and the export.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Date(date) => date.format(DATE_FORMAT).to_string(),
            FieldValue::Integer(value) => value.to_string(),
            FieldValue::Decimal(value) => value.to_string(),
            FieldValue::Photos(paths) => paths.join("; "),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Date(date) => Value::String(date.format(DATE_FORMAT).to_string()),
            FieldValue::Integer(value) => Value::from(*value),
            FieldValue::Decimal(value) => Value::from(*value),
            FieldValue::Photos(paths) => {
                Value::Array(paths.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Decodes a column from its JSON form; `null` and empty values are absent.
    pub fn from_json(kind: FieldKind, value: &Value) -> Option<Self> {
        match (kind, value) {
            (_, Value::Null) => None,
            (FieldKind::Text | FieldKind::LongText, Value::String(text)) => {
                (!text.is_empty()).then(|| FieldValue::Text(text.clone()))
            }
            (FieldKind::Date, Value::String(text)) => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(FieldValue::Date),
            (FieldKind::Integer, Value::Number(number)) => number.as_i64().map(FieldValue::Integer),
            (FieldKind::Decimal, Value::Number(number)) => number.as_f64().map(FieldValue::Decimal),
            (FieldKind::Photos, Value::Array(items)) => {
                let paths: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect();
                (!paths.is_empty()).then_some(FieldValue::Photos(paths))
            }
            _ => None,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Photos(paths) => paths.is_empty(),
            _ => false,
        }
    }
}

/// Present columns of one theme, keyed by catalogue position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeRecord {
    values: BTreeMap<usize, FieldValue>,
}

impl ThemeRecord {
    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldDef, &FieldValue)> + '_ {
        self.values
            .iter()
            .map(|(position, value)| (&FIELDS[*position], value))
    }
}

/// A submission's content grouped into optional themed sub-records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionRecord {
    themes: BTreeMap<Theme, ThemeRecord>,
}

impl SubmissionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, or clears the column when the value is blank.
    pub fn set(&mut self, def: &'static FieldDef, value: FieldValue) {
        let Some(position) = catalogue_position(def.key) else {
            return;
        };

        if value.is_blank() {
            self.clear(def);
            return;
        }

        self.themes
            .entry(def.theme)
            .or_default()
            .values
            .insert(position, value);
    }

    pub fn clear(&mut self, def: &FieldDef) {
        let Some(position) = catalogue_position(def.key) else {
            return;
        };
        if let Some(theme) = self.themes.get_mut(&def.theme) {
            theme.values.remove(&position);
            if theme.values.is_empty() {
                self.themes.remove(&def.theme);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        let position = catalogue_position(key)?;
        self.themes
            .get(&FIELDS[position].theme)?
            .values
            .get(&position)
    }

    pub fn themes(&self) -> impl Iterator<Item = (Theme, &ThemeRecord)> + '_ {
        self.themes.iter().map(|(theme, record)| (*theme, record))
    }

    /// Present columns in catalogue declaration order.
    pub fn present_fields(&self) -> impl Iterator<Item = (&'static FieldDef, &FieldValue)> + '_ {
        FIELDS
            .iter()
            .filter_map(|def| self.get(def.key).map(|value| (def, value)))
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Reads every catalogue column present in a flat JSON row.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut record = SubmissionRecord::new();
        for def in FIELDS {
            let Some(raw) = object.get(def.key) else {
                continue;
            };
            match FieldValue::from_json(def.kind, raw) {
                Some(value) => record.set(def, value),
                None if !raw.is_null() => {
                    warn!(column = def.key, "ignoring column with unexpected JSON shape");
                }
                None => {}
            }
        }
        record
    }
}

fn catalogue_position(key: &str) -> Option<usize> {
    FIELDS.iter().position(|field| field.key == key)
}

/// A persisted row of `newsletter_submissions`.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: i64,
    pub section: String,
    pub created_at: DateTime<Utc>,
    pub record: SubmissionRecord,
}

impl Submission {
    /// Decodes the `to_jsonb(row)` form returned by the store.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(object) = value else {
            return Err(anyhow!("submission row is not a JSON object"));
        };

        let id = object
            .get("id")
            .and_then(Value::as_i64)
            .context("submission row is missing `id`")?;
        let section = object
            .get("section")
            .and_then(Value::as_str)
            .context("submission row is missing `section`")?
            .to_string();
        let created_at = object
            .get("created_at")
            .and_then(Value::as_str)
            .context("submission row is missing `created_at`")?;
        let created_at = DateTime::parse_from_rfc3339(created_at)
            .with_context(|| format!("invalid created_at timestamp `{created_at}`"))?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            section,
            created_at,
            record: SubmissionRecord::from_json_object(&object),
        })
    }
}

impl Serialize for Submission {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("section", &self.section)?;
        map.serialize_entry("created_at", &self.created_at.to_rfc3339())?;
        for (def, value) in self.record.present_fields() {
            map.serialize_entry(def.key, &value.to_json())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::modules::newsletter::schema::field_def;

    fn def(key: &str) -> &'static FieldDef {
        field_def(key).unwrap()
    }

    fn theme(record: &SubmissionRecord, theme: Theme) -> Option<&ThemeRecord> {
        record
            .themes()
            .find(|(candidate, _)| *candidate == theme)
            .map(|(_, theme_record)| theme_record)
    }

    #[test]
    fn blank_values_are_not_stored() {
        let mut record = SubmissionRecord::new();
        record.set(def("mou_org"), FieldValue::Text("   ".into()));
        record.set(def("mou_photos"), FieldValue::Photos(Vec::new()));
        assert!(record.is_empty());
        assert!(theme(&record, Theme::Mou).is_none());
    }

    #[test]
    fn values_are_grouped_by_theme_in_declaration_order() {
        let mut record = SubmissionRecord::new();
        record.set(def("department"), FieldValue::Text("AIML".into()));
        record.set(def("mou_org"), FieldValue::Text("Acme".into()));
        record.set(def("workshop_participants"), FieldValue::Integer(40));

        let mou: Vec<&str> = theme(&record, Theme::Mou)
            .unwrap()
            .fields()
            .map(|(def, _)| def.key)
            .collect();
        assert_eq!(mou, vec!["mou_org", "department"]);
        assert_eq!(record.themes().count(), 2);
        assert_eq!(
            record.get("workshop_participants"),
            Some(&FieldValue::Integer(40))
        );
    }

    #[test]
    fn clearing_last_field_drops_theme() {
        let mut record = SubmissionRecord::new();
        record.set(def("alumni_name"), FieldValue::Text("R. Rao".into()));
        record.clear(def("alumni_name"));
        assert!(theme(&record, Theme::AlumniInteraction).is_none());
    }

    #[test]
    fn submission_decodes_postgres_json_row() {
        let row = json!({
            "id": 7,
            "section": "workshops",
            "created_at": "2024-11-02T10:15:30.123456+00:00",
            "workshop_name": "Rust for Embedded",
            "workshop_start_date": "2024-10-28",
            "workshop_participants": 42,
            "research_cost": 125000.5,
            "workshop_photos": ["a.jpg", "b.png"],
            "mou_org": null,
            "alumni_photos": []
        });

        let submission = Submission::from_json(row).unwrap();
        assert_eq!(submission.id, 7);
        assert_eq!(submission.section, "workshops");
        assert_eq!(
            submission.record.get("workshop_start_date"),
            Some(&FieldValue::Date(
                NaiveDate::from_ymd_opt(2024, 10, 28).unwrap()
            ))
        );
        assert_eq!(
            submission.record.get("workshop_photos"),
            Some(&FieldValue::Photos(vec!["a.jpg".into(), "b.png".into()]))
        );
        assert_eq!(
            submission.record.get("research_cost"),
            Some(&FieldValue::Decimal(125000.5))
        );
        assert!(submission.record.get("mou_org").is_none());
        assert!(submission.record.get("alumni_photos").is_none());
    }

    #[test]
    fn submission_without_id_is_rejected() {
        let err = Submission::from_json(json!({"section": "mou"})).unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn serialized_submission_is_flat() {
        let mut record = SubmissionRecord::new();
        record.set(def("mou_org"), FieldValue::Text("Acme".into()));
        let submission = Submission {
            id: 3,
            section: "mou".into(),
            created_at: Utc::now(),
            record,
        };

        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["mou_org"], json!("Acme"));
        assert!(value.get("mou_date").is_none());
    }
}
