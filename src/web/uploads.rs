use std::path::Path;

use axum::extract::Multipart;
use mime::Mime;
use tracing::warn;

use crate::{
    modules::newsletter::{
        draft::{Draft, DraftError},
        schema::Section,
    },
    storage::{PendingFile, content_type_for},
};

/// Result type used by the multipart reader.
pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when the multipart stream itself cannot be read.
#[derive(Debug)]
pub struct UploadError {
    message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UploadError {}

pub const SECTION_FIELD: &str = "section";

/// Draft rebuilt from one posted form, plus the inputs that were refused.
#[derive(Debug)]
pub struct PostedForm {
    pub draft: Draft,
    pub rejected: Vec<String>,
}

/// Reads every part of the newsletter form into a draft.
///
/// Parts without a selected file are skipped. Rejected inputs are collected so
/// the form can be re-rendered with every other value intact; only a broken
/// stream aborts the read.
pub async fn read_submission_form(
    mut multipart: Multipart,
    default_section: Section,
) -> UploadResult<PostedForm> {
    let mut draft = Draft::new(default_section);
    let mut rejected = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::new(format!("failed to read the submitted form: {err}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(|err| {
                UploadError::new(format!("failed to read field `{field_name}`: {err}"))
            })?;

            if field_name == SECTION_FIELD {
                match Section::from_key(value.trim()) {
                    Some(section) => draft.set_section(section),
                    None => warn!(section = %value, "unknown section tag; using default"),
                }
                continue;
            }

            match draft.apply_edit(&field_name, value) {
                Ok(()) => {}
                Err(DraftError::UnknownField(key)) => {
                    warn!(field = %key, "ignoring unknown form field");
                }
                Err(err) => rejected.push(err.to_string()),
            }
            continue;
        };

        let declared_type = field
            .content_type()
            .and_then(|raw| raw.parse::<Mime>().ok());
        let bytes = field.bytes().await.map_err(|err| {
            UploadError::new(format!("failed to read upload for `{field_name}`: {err}"))
        })?;

        // Browsers send an empty part for a file input with nothing selected.
        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }

        let content_type =
            declared_type.unwrap_or_else(|| content_type_for(Path::new(&file_name)));
        let file = PendingFile::new(file_name, content_type, bytes.to_vec());
        if let Err(err) = draft.attach_file(&field_name, file) {
            rejected.push(err.to_string());
        }
    }

    Ok(PostedForm { draft, rejected })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, header},
    };

    use super::*;

    const BOUNDARY: &str = "newsletter-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    async fn multipart(parts: &[Part<'_>]) -> Multipart {
        let mut body: Vec<u8> = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn reads_text_files_and_section() {
        let form = multipart(&[
            Part::Text("section", "workshops"),
            Part::Text("workshop_name", "Rust Bootcamp"),
            Part::File("workshop_photos", "one.JPG", b"abc"),
            Part::File("workshop_photos", "two.png", b"def"),
            Part::File("fdp_photos", "", b""),
        ])
        .await;

        let posted = read_submission_form(form, Section::Mou).await.unwrap();
        assert!(posted.rejected.is_empty());
        assert_eq!(posted.draft.section(), Section::Workshops);
        assert_eq!(posted.draft.text("workshop_name"), Some("Rust Bootcamp"));

        let names: Vec<&str> = posted
            .draft
            .files("workshop_photos")
            .iter()
            .map(|file| file.original_name.as_str())
            .collect();
        assert_eq!(names, vec!["one.JPG", "two.png"]);
        assert!(posted.draft.files("fdp_photos").is_empty());
    }

    #[tokio::test]
    async fn unknown_section_falls_back_to_default() {
        let form = multipart(&[Part::Text("section", "sports")]).await;
        let posted = read_submission_form(form, Section::Research).await.unwrap();
        assert_eq!(posted.draft.section(), Section::Research);
    }

    #[tokio::test]
    async fn rejected_file_keeps_other_values() {
        let form = multipart(&[
            Part::Text("mou_org", "Acme"),
            Part::File("mou_photos", "payload.exe", b"MZ"),
        ])
        .await;

        let posted = read_submission_form(form, Section::Mou).await.unwrap();
        assert_eq!(posted.rejected.len(), 1);
        assert!(posted.rejected[0].contains("payload.exe"));
        assert_eq!(posted.draft.text("mou_org"), Some("Acme"));
        assert!(posted.draft.files("mou_photos").is_empty());
    }
}
