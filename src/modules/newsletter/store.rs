use std::future::Future;

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::record::{FieldValue, Submission, SubmissionRecord};

pub const PAGE_SIZE: i64 = 10;

const SELECT_PAGE_SQL: &str =
    "SELECT to_jsonb(t) FROM newsletter_submissions t ORDER BY id LIMIT $1 OFFSET $2";
const COUNT_SQL: &str = "SELECT COUNT(*) FROM newsletter_submissions";
const SELECT_ALL_SQL: &str = "SELECT to_jsonb(t) FROM newsletter_submissions t ORDER BY id";
const DELETE_SQL: &str = "DELETE FROM newsletter_submissions WHERE id = $1";

/// 1-based page number taken from the `page` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: i64,
}

impl PageRequest {
    pub fn new(number: i64) -> Self {
        Self {
            number: number.max(1),
        }
    }

    /// Missing, zero and negative page numbers all mean the first page.
    pub fn from_query(page: Option<i64>) -> Self {
        Self::new(page.unwrap_or(1))
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }
}

pub fn page_count(total: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

/// One page of submissions plus the table-wide row count.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: i64,
    pub rows: Vec<Submission>,
    pub total: i64,
}

impl Page {
    pub fn total_pages(&self) -> i64 {
        page_count(self.total)
    }

    /// Requested page number held within `1..=max(total_pages, 1)`.
    pub fn shown_number(&self) -> i64 {
        self.number.min(self.total_pages().max(1)).max(1)
    }

    pub fn has_prev(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages()
    }

    pub fn prev_page(&self) -> i64 {
        (self.number - 1).min(self.total_pages().max(1)).max(1)
    }

    pub fn next_page(&self) -> i64 {
        (self.number + 1).min(self.total_pages().max(1))
    }
}

/// Persistence seam for newsletter submissions.
pub trait SubmissionStore: Send + Sync {
    /// Inserts one row and returns its generated id.
    fn insert(
        &self,
        section: &str,
        record: &SubmissionRecord,
    ) -> impl Future<Output = Result<i64>> + Send;

    fn fetch_page(&self, request: PageRequest) -> impl Future<Output = Result<Page>> + Send;

    /// Every row ordered by id, for the export.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Submission>>> + Send;

    /// Returns `false` when no row had that id.
    fn delete(&self, id: i64) -> impl Future<Output = Result<bool>> + Send;
}

#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `INSERT` listing only the present columns; absent ones fall back to NULL.
fn build_insert<'a>(section: &str, record: &SubmissionRecord) -> QueryBuilder<'a, Postgres> {
    let present: Vec<_> = record.present_fields().collect();

    let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO newsletter_submissions (section");
    for (def, _) in &present {
        builder.push(", ").push(def.key);
    }
    builder.push(") VALUES (");

    let mut values = builder.separated(", ");
    values.push_bind(section.to_string());
    for (_, value) in present {
        match value.clone() {
            FieldValue::Text(text) => values.push_bind(text),
            FieldValue::Date(date) => values.push_bind(date),
            FieldValue::Integer(number) => values.push_bind(number),
            FieldValue::Decimal(number) => values.push_bind(number),
            FieldValue::Photos(paths) => values.push_bind(paths),
        };
    }
    values.push_unseparated(") RETURNING id");

    builder
}

fn decode_rows(rows: Vec<Value>) -> Result<Vec<Submission>> {
    rows.into_iter().map(Submission::from_json).collect()
}

impl SubmissionStore for PgSubmissionStore {
    async fn insert(&self, section: &str, record: &SubmissionRecord) -> Result<i64> {
        let mut builder = build_insert(section, record);
        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .context("failed to insert newsletter submission")
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<Page> {
        let rows_query = sqlx::query_scalar::<_, Value>(SELECT_PAGE_SQL)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(&self.pool);
        let count_query = sqlx::query_scalar::<_, i64>(COUNT_SQL).fetch_one(&self.pool);

        let (rows, total) = tokio::try_join!(rows_query, count_query)
            .context("failed to fetch newsletter submissions page")?;

        Ok(Page {
            number: request.number(),
            rows: decode_rows(rows)?,
            total,
        })
    }

    async fn fetch_all(&self) -> Result<Vec<Submission>> {
        let rows = sqlx::query_scalar::<_, Value>(SELECT_ALL_SQL)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch newsletter submissions")?;

        decode_rows(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(DELETE_SQL)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete newsletter submission {id}"))?;

        Ok(result.rows_affected() > 0)
    }
}


#[cfg(test)]
mod tests {
    use sqlx::Execute;

    use super::testing::MemoryStore;
    use super::*;
    use crate::modules::newsletter::schema::field_def;

    #[test]
    fn page_request_normalises_bad_numbers() {
        assert_eq!(PageRequest::from_query(None).number(), 1);
        assert_eq!(PageRequest::from_query(Some(0)).number(), 1);
        assert_eq!(PageRequest::from_query(Some(-4)).number(), 1);
        assert_eq!(PageRequest::from_query(Some(3)).offset(), 20);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(10), 1);
        assert_eq!(page_count(11), 2);
        assert_eq!(page_count(25), 3);
    }

    #[test]
    fn next_page_clamps_to_last_page() {
        let page = Page {
            number: 3,
            rows: Vec::new(),
            total: 25,
        };
        assert!(!page.has_next());
        assert_eq!(page.next_page(), 3);
        assert_eq!(page.prev_page(), 2);

        let empty = Page {
            number: 1,
            rows: Vec::new(),
            total: 0,
        };
        assert_eq!(empty.next_page(), 1);
        assert!(!empty.has_prev());
    }

    #[test]
    fn out_of_range_page_links_back_to_last_page() {
        let page = Page {
            number: 4,
            rows: Vec::new(),
            total: 12,
        };
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.shown_number(), 2);
        assert_eq!(page.prev_page(), 2);
        assert_eq!(page.next_page(), 2);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn pages_hold_ten_rows_and_remainder_on_last() {
        let store = MemoryStore::with_rows(25);

        let first = store.fetch_page(PageRequest::new(1)).await.unwrap();
        assert_eq!(first.rows.len(), 10);
        assert_eq!(first.total_pages(), 3);

        let last = store.fetch_page(PageRequest::new(3)).await.unwrap();
        assert_eq!(last.rows.len(), 5);
        assert_eq!(last.rows[0].id, 21);

        let beyond = store.fetch_page(PageRequest::new(9)).await.unwrap();
        assert!(beyond.rows.is_empty());
        assert_eq!(beyond.total, 25);
    }

    #[tokio::test]
    async fn full_last_page_holds_page_size_rows() {
        let store = MemoryStore::with_rows(20);
        let last = store.fetch_page(PageRequest::new(2)).await.unwrap();
        assert_eq!(last.rows.len(), 10);
    }

    #[tokio::test]
    async fn deleted_row_is_gone_on_refetch() {
        let store = MemoryStore::with_rows(12);
        assert!(store.delete(4).await.unwrap());
        assert!(!store.delete(4).await.unwrap());

        let first = store.fetch_page(PageRequest::new(1)).await.unwrap();
        assert_eq!(first.total, 11);
        assert!(first.rows.iter().all(|row| row.id != 4));
    }

    #[test]
    fn insert_lists_only_present_columns() {
        let mut record = SubmissionRecord::new();
        record.set(
            field_def("workshop_name").unwrap(),
            FieldValue::Text("Rust".into()),
        );
        record.set(
            field_def("workshop_photos").unwrap(),
            FieldValue::Photos(vec!["a.jpg".into()]),
        );

        let mut builder = build_insert("workshops", &record);
        let sql = builder.build().sql().to_string();
        assert_eq!(
            sql,
            "INSERT INTO newsletter_submissions (section, workshop_name, workshop_photos) VALUES ($1, $2, $3) RETURNING id"
        );
    }

    #[test]
    fn insert_of_empty_record_sets_only_section() {
        let mut builder = build_insert("summary", &SubmissionRecord::new());
        let sql = builder.build().sql().to_string();
        assert_eq!(
            sql,
            "INSERT INTO newsletter_submissions (section) VALUES ($1) RETURNING id"
        );
    }
}
