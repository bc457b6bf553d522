use anyhow::{Context, Result, anyhow};
use rust_xlsxwriter::{Format, Workbook};

use super::{
    record::{FieldValue, Submission},
    schema::FIELDS,
};

pub const EXPORT_SHEET_NAME: &str = "Newsletter Form Data";
pub const EXPORT_FILENAME: &str = "newsletter_form_data.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const LEADING_COLUMNS: [&str; 3] = ["id", "section", "created_at"];

/// Excel refuses cells longer than this many characters.
const MAX_CELL_CHARS: usize = 32_767;

/// Header row: the fixed columns, then every catalogue key in declaration order.
pub fn export_header() -> Vec<&'static str> {
    LEADING_COLUMNS
        .into_iter()
        .chain(FIELDS.iter().map(|def| def.key))
        .collect()
}

/// Builds the single-sheet workbook with one row per submission.
pub fn build_workbook(submissions: &[Submission]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(EXPORT_SHEET_NAME)
        .context("failed to name export sheet")?;

    for (idx, title) in export_header().into_iter().enumerate() {
        let col = column(idx)?;
        worksheet
            .write_string_with_format(0, col, title, &header_format)
            .context("failed to write export header")?;
    }

    for (row_idx, submission) in submissions.iter().enumerate() {
        let row: u32 = (row_idx + 1)
            .try_into()
            .map_err(|_| anyhow!("too many submissions for one sheet"))?;

        worksheet
            .write_number(row, 0, submission.id as f64)
            .context("failed to write submission id")?;
        worksheet
            .write_string(row, 1, &submission.section)
            .context("failed to write submission section")?;
        worksheet
            .write_string(row, 2, submission.created_at.to_rfc3339())
            .context("failed to write submission timestamp")?;

        for (field_idx, def) in FIELDS.iter().enumerate() {
            let Some(value) = submission.record.get(def.key) else {
                continue;
            };
            let col = column(field_idx + LEADING_COLUMNS.len())?;
            let written = match value {
                FieldValue::Integer(number) => worksheet.write_number(row, col, *number as f64),
                FieldValue::Decimal(number) => worksheet.write_number(row, col, *number),
                other => worksheet.write_string(row, col, fit_cell(other.display())),
            };
            written.with_context(|| format!("failed to write column `{}`", def.key))?;
        }
    }

    workbook
        .save_to_buffer()
        .context("failed to serialize export workbook")
}

fn fit_cell(text: String) -> String {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

fn column(idx: usize) -> Result<u16> {
    idx.try_into()
        .map_err(|_| anyhow!("export has more columns than a sheet allows"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use calamine::{DataType, Reader, Xlsx};
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::modules::newsletter::{record::SubmissionRecord, schema::field_def};

    fn submission(id: i64, record: SubmissionRecord) -> Submission {
        Submission {
            id,
            section: "workshops".into(),
            created_at: Utc::now(),
            record,
        }
    }

    #[test]
    fn header_lists_fixed_columns_then_catalogue() {
        let header = export_header();
        assert_eq!(&header[..3], &["id", "section", "created_at"]);
        assert_eq!(header.len(), FIELDS.len() + 3);
        assert_eq!(header[3], FIELDS[0].key);
    }

    #[test]
    fn workbook_has_one_row_per_submission() {
        let mut record = SubmissionRecord::new();
        record.set(
            field_def("workshop_name").unwrap(),
            FieldValue::Text("Rust Bootcamp".into()),
        );
        record.set(
            field_def("workshop_participants").unwrap(),
            FieldValue::Integer(42),
        );
        record.set(
            field_def("workshop_start_date").unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 10, 28).unwrap()),
        );
        record.set(
            field_def("workshop_photos").unwrap(),
            FieldValue::Photos(vec!["a.jpg".into(), "b.png".into()]),
        );
        let rows = vec![
            submission(1, record),
            submission(2, SubmissionRecord::new()),
            submission(5, SubmissionRecord::new()),
        ];

        let bytes = build_workbook(&rows).unwrap();
        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            workbook.sheet_names().to_vec(),
            vec![EXPORT_SHEET_NAME.to_string()]
        );

        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.height(), rows.len() + 1);

        let header = export_header();
        let col = |key: &str| header.iter().position(|h| *h == key).unwrap() as u32;

        assert_eq!(range.get_value((1, 0)), Some(&DataType::Float(1.0)));
        assert_eq!(
            range.get_value((1, col("workshop_participants"))),
            Some(&DataType::Float(42.0))
        );
        assert_eq!(
            range.get_value((1, col("workshop_start_date"))),
            Some(&DataType::String("2024-10-28".into()))
        );
        assert_eq!(
            range.get_value((1, col("workshop_photos"))),
            Some(&DataType::String("a.jpg; b.png".into()))
        );
        assert_eq!(range.get_value((3, 0)), Some(&DataType::Float(5.0)));
    }

    #[test]
    fn oversized_text_is_cut_to_cell_limit() {
        let mut record = SubmissionRecord::new();
        record.set(
            field_def("other_initiatives").unwrap(),
            FieldValue::Text("x".repeat(40_000)),
        );
        let rows = vec![submission(1, record), submission(2, SubmissionRecord::new())];

        let bytes = build_workbook(&rows).unwrap();
        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.height(), rows.len() + 1);

        let col = export_header()
            .iter()
            .position(|h| *h == "other_initiatives")
            .unwrap() as u32;
        match range.get_value((1, col)) {
            Some(DataType::String(text)) => assert_eq!(text.chars().count(), MAX_CELL_CHARS),
            other => panic!("unexpected cell {other:?}"),
        }
    }

    #[test]
    fn fit_cell_keeps_short_text_and_char_boundaries() {
        assert_eq!(fit_cell("short".into()), "short");
        let cut = fit_cell("é".repeat(MAX_CELL_CHARS + 5));
        assert_eq!(cut.chars().count(), MAX_CELL_CHARS);
    }

    #[test]
    fn empty_export_has_only_header() {
        let bytes = build_workbook(&[]).unwrap();
        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.height(), 1);
        assert_eq!(range.width(), FIELDS.len() + 3);
    }
}
