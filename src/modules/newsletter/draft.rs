use std::{collections::HashMap, fmt};

use chrono::{Datelike, NaiveDate};
use futures::future::join_all;
use tracing::{info, warn};

use super::{
    record::{DATE_FORMAT, FieldValue, SubmissionRecord},
    schema::{FIELDS, FieldDef, FieldKind, Section, field_def},
    store::SubmissionStore,
};
use crate::storage::{ObjectStorage, PendingFile, StorageError};

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "pdf"];
pub const MAX_FILES_PER_FIELD: usize = 10;

/// Unsaved value of one form input.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftValue {
    Text(String),
    Files(Vec<PendingFile>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftError {
    UnknownField(String),
    NotAFileField(&'static str),
    NotATextField(&'static str),
    UnsupportedFile {
        field: &'static str,
        file_name: String,
    },
    TooManyFiles(&'static str),
    InvalidValue {
        field: &'static str,
        value: String,
    },
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftError::UnknownField(key) => write!(f, "unknown form field `{key}`"),
            DraftError::NotAFileField(key) => write!(f, "`{}` does not accept files", label(key)),
            DraftError::NotATextField(key) => write!(f, "`{}` only accepts files", label(key)),
            DraftError::UnsupportedFile { field, file_name } => write!(
                f,
                "{file_name} is not an accepted file type for `{}` (allowed: {})",
                label(field),
                ALLOWED_EXTENSIONS.join(", ")
            ),
            DraftError::TooManyFiles(key) => write!(
                f,
                "`{}` accepts at most {MAX_FILES_PER_FIELD} files",
                label(key)
            ),
            DraftError::InvalidValue { field, value } => {
                write!(f, "`{value}` is not a valid value for `{}`", label(field))
            }
        }
    }
}

impl std::error::Error for DraftError {}

fn label(key: &str) -> &'static str {
    field_def(key).map(|def| def.label).unwrap_or("field")
}

/// Form state between renders: the tagged section plus every touched input.
#[derive(Debug, Clone)]
pub struct Draft {
    section: Section,
    values: HashMap<&'static str, DraftValue>,
}

impl Draft {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            values: HashMap::new(),
        }
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn set_section(&mut self, section: Section) {
        self.section = section;
    }

    /// Overwrites exactly one text input; every other key keeps its value.
    pub fn apply_edit(&mut self, key: &str, value: impl Into<String>) -> Result<(), DraftError> {
        let def = field_def(key).ok_or_else(|| DraftError::UnknownField(key.to_string()))?;
        if def.kind == FieldKind::Photos {
            return Err(DraftError::NotATextField(def.key));
        }
        self.values.insert(def.key, DraftValue::Text(value.into()));
        Ok(())
    }

    /// Appends a selected file to a Photos input, in selection order.
    pub fn attach_file(&mut self, key: &str, file: PendingFile) -> Result<(), DraftError> {
        let def = field_def(key).ok_or_else(|| DraftError::UnknownField(key.to_string()))?;
        if def.kind != FieldKind::Photos {
            return Err(DraftError::NotAFileField(def.key));
        }

        let accepted = file
            .extension()
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
        if !accepted {
            return Err(DraftError::UnsupportedFile {
                field: def.key,
                file_name: file.original_name,
            });
        }

        let entry = self
            .values
            .entry(def.key)
            .or_insert_with(|| DraftValue::Files(Vec::new()));
        let DraftValue::Files(files) = entry else {
            return Err(DraftError::NotAFileField(def.key));
        };
        if files.len() >= MAX_FILES_PER_FIELD {
            return Err(DraftError::TooManyFiles(def.key));
        }
        files.push(file);
        Ok(())
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            DraftValue::Text(text) => Some(text.as_str()),
            DraftValue::Files(_) => None,
        }
    }

    pub fn files(&self, key: &str) -> &[PendingFile] {
        match self.values.get(key) {
            Some(DraftValue::Files(files)) => files.as_slice(),
            _ => &[],
        }
    }

    /// Parses every text input by its column kind. Blank inputs are absent and
    /// Photos fields are left for the upload step.
    pub fn to_record(&self) -> Result<SubmissionRecord, DraftError> {
        let mut record = SubmissionRecord::new();
        for def in FIELDS {
            let Some(DraftValue::Text(raw)) = self.values.get(def.key) else {
                continue;
            };
            if let Some(value) = parse_text(def, raw)? {
                record.set(def, value);
            }
        }
        Ok(record)
    }

    /// Files to upload, in catalogue order then selection order.
    pub fn pending_uploads(&self) -> Vec<(&'static FieldDef, &PendingFile)> {
        FIELDS
            .iter()
            .filter(|def| def.kind == FieldKind::Photos)
            .flat_map(|def| self.files(def.key).iter().map(move |file| (def, file)))
            .collect()
    }
}

fn parse_text(def: &'static FieldDef, raw: &str) -> Result<Option<FieldValue>, DraftError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let invalid = || DraftError::InvalidValue {
        field: def.key,
        value: trimmed.to_string(),
    };

    let value = match def.kind {
        FieldKind::Text | FieldKind::LongText => FieldValue::Text(raw.to_string()),
        FieldKind::Date => {
            let date = NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid())?;
            // Postgres renders years before 1 with a " BC" suffix that does not read back.
            if date.year() < 1 {
                return Err(invalid());
            }
            FieldValue::Date(date)
        }
        FieldKind::Integer => FieldValue::Integer(trimmed.parse().map_err(|_| invalid())?),
        FieldKind::Decimal => {
            let number: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !number.is_finite() {
                return Err(invalid());
            }
            FieldValue::Decimal(number)
        }
        FieldKind::Photos => return Ok(None),
    };
    Ok(Some(value))
}

#[derive(Debug)]
pub enum SubmitError {
    Invalid(DraftError),
    Upload(StorageError),
    Insert(anyhow::Error),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Invalid(err) => write!(f, "{err}"),
            SubmitError::Upload(err) => write!(f, "file upload failed: {err}"),
            SubmitError::Insert(_) => write!(f, "the submission could not be saved"),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Invalid(err) => Some(err),
            SubmitError::Upload(err) => Some(err),
            SubmitError::Insert(err) => Some(err.as_ref()),
        }
    }
}

/// Uploads the draft's files concurrently, then inserts one row.
///
/// Nothing is inserted unless every upload succeeded. Objects already stored
/// when a sibling upload fails are left in the bucket.
pub async fn submit_draft<S, O>(store: &S, storage: &O, draft: &Draft) -> Result<i64, SubmitError>
where
    S: SubmissionStore,
    O: ObjectStorage,
{
    let mut record = draft.to_record().map_err(SubmitError::Invalid)?;

    let pending = draft.pending_uploads();
    let results = join_all(pending.iter().map(|(_, file)| storage.upload(file))).await;

    let mut paths: HashMap<&'static str, Vec<String>> = HashMap::new();
    let mut first_failure = None;
    let mut stored = 0_usize;
    for ((def, _), result) in pending.iter().zip(results) {
        match result {
            Ok(path) => {
                stored += 1;
                paths.entry(def.key).or_default().push(path);
            }
            Err(err) => {
                if first_failure.is_none() {
                    first_failure = Some(err);
                }
            }
        }
    }

    if let Some(err) = first_failure {
        warn!(
            stored,
            total = pending.len(),
            error = %err,
            "aborting submission after upload failure; stored objects are orphaned"
        );
        return Err(SubmitError::Upload(err));
    }

    for def in FIELDS.iter().filter(|def| def.kind == FieldKind::Photos) {
        if let Some(list) = paths.remove(def.key) {
            record.set(def, FieldValue::Photos(list));
        }
    }

    let id = store
        .insert(draft.section().key(), &record)
        .await
        .map_err(SubmitError::Insert)?;

    info!(id, section = %draft.section(), files = pending.len(), "newsletter submission saved");
    Ok(id)
}
