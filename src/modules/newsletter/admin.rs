use std::borrow::Cow;

use axum::{
    Json,
    extract::{Form, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{
    export::{EXPORT_FILENAME, XLSX_CONTENT_TYPE, build_workbook},
    record::{FieldValue, Submission},
    schema::{PRIMARY_COLUMNS, Theme, is_primary, photo_fields, primary_fields},
    store::{PAGE_SIZE, Page, PageRequest, SubmissionStore},
};
use crate::{
    storage::ObjectStorage,
    web::{
        ApiMessage, AppState, escape_html,
        gate::{Gate, GateRejection, require_access},
        json_error,
        templates::{HeaderLink, PageLayout, compose_flash_message, render_page},
    },
};

const ADMIN_STYLES: &str = r#"
        .toolbar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .export-link { display: inline-flex; padding: 0.65rem 1.1rem; border-radius: 8px; background: #16a34a; color: #ffffff; font-weight: 600; text-decoration: none; }
        .export-link:hover { background: #15803d; }
        .table-scroll { overflow-x: auto; }
        .submissions th, .submissions td { white-space: nowrap; font-size: 0.9rem; }
        .submissions td.long { white-space: normal; min-width: 220px; }
        .row-actions { display: flex; gap: 0.5rem; }
        .row-actions form { margin: 0; }
        .row-actions button { padding: 0.4rem 0.75rem; font-size: 0.85rem; }
        .row-actions .delete { background: #dc2626; }
        .row-actions .delete:hover { background: #b91c1c; }
        .detail-row td { background: #f8fafc; white-space: normal; }
        .detail-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 1rem; }
        .detail-grid h4 { margin: 0 0 0.5rem; color: #1d4ed8; }
        .detail-grid dl { margin: 0; }
        .detail-grid dt { font-weight: 600; font-size: 0.85rem; color: #475569; }
        .detail-grid dd { margin: 0 0 0.5rem; }
        .attachments a { display: block; color: #2563eb; }
        .pager { display: flex; gap: 1rem; align-items: center; justify-content: center; margin-top: 1.5rem; }
        .pager a { color: #1d4ed8; font-weight: 600; text-decoration: none; }
        .pager span.disabled { color: #94a3b8; }
"#;

const ADMIN_SCRIPT: &str = r#"<script>
document.querySelectorAll('[data-detail-toggle]').forEach((button) => {
    button.addEventListener('click', () => {
        const row = document.getElementById(button.dataset.detailToggle);
        row.hidden = !row.hidden;
        button.textContent = row.hidden ? 'Details' : 'Hide';
    });
});
document.querySelectorAll('form.delete-form').forEach((form) => {
    form.addEventListener('submit', (event) => {
        if (!confirm('Delete this submission? This cannot be undone.')) {
            event.preventDefault();
        }
    });
});
</script>"#;

#[derive(Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteForm {
    pub id: i64,
    #[serde(default)]
    pub page: Option<i64>,
}

#[derive(Serialize)]
pub struct PageResponse<'a> {
    pub rows: &'a [Submission],
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
    pub page_size: i64,
}

impl<'a> From<&'a Page> for PageResponse<'a> {
    fn from(page: &'a Page) -> Self {
        Self {
            rows: &page.rows,
            total: page.total,
            page: page.number,
            total_pages: page.total_pages(),
            page_size: PAGE_SIZE,
        }
    }
}

pub async fn admin_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> Result<Html<String>, GateRejection> {
    let admin = require_access(&state, jar, Gate::Admin).await?;
    let request = PageRequest::from_query(params.page);

    let (page, fetch_error) = match state.submissions().fetch_page(request).await {
        Ok(page) => (page, None),
        Err(err) => {
            error!(?err, page = request.number(), "failed to load submissions page");
            let empty = Page {
                number: request.number(),
                rows: Vec::new(),
                total: 0,
            };
            (empty, Some("fetch_failed"))
        }
    };

    let flash = compose_flash_message(
        params.status.as_deref(),
        fetch_error.or(params.error.as_deref()),
    );

    Ok(Html(render_admin_page(
        admin.label(),
        &page,
        &flash,
        state.storage(),
    )))
}

pub async fn delete_submission(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, GateRejection> {
    let admin = require_access(&state, jar, Gate::Admin).await?;
    let page = PageRequest::from_query(form.page);

    let target = delete_and_redirect(&state.submissions(), form.id, page).await;
    info!(id = form.id, admin = %admin.email, redirect = %target, "admin delete handled");
    Ok(Redirect::to(&target))
}

/// Deletes one row and returns the admin URL to reload, carrying the outcome.
pub async fn delete_and_redirect<S: SubmissionStore>(
    store: &S,
    id: i64,
    page: PageRequest,
) -> String {
    let outcome = match store.delete(id).await {
        Ok(true) => "status=deleted",
        Ok(false) => "error=not_found",
        Err(err) => {
            error!(?err, id, "failed to delete submission");
            "error=delete_failed"
        }
    };
    format!("/admin?page={}&{outcome}", page.number())
}

pub async fn export_submissions(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Err(rejection) = require_access(&state, jar, Gate::Admin).await {
        return rejection.into_response();
    }

    let submissions = match state.submissions().fetch_all().await {
        Ok(rows) => rows,
        Err(err) => {
            error!(?err, "failed to load submissions for export");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Submissions could not be loaded for export.",
            )
            .into_response();
        }
    };

    let bytes = match build_workbook(&submissions) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(?err, "failed to build export workbook");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "The export file could not be generated.",
            )
            .into_response();
        }
    };

    info!(rows = submissions.len(), "exported newsletter submissions");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(XLSX_CONTENT_TYPE),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{EXPORT_FILENAME}\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (headers, bytes).into_response()
}

pub async fn list_submissions_api(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AdminQuery>,
) -> Response {
    if require_access(&state, jar, Gate::Admin).await.is_err() {
        return json_error(StatusCode::UNAUTHORIZED, "Admin sign-in required.").into_response();
    }

    match state
        .submissions()
        .fetch_page(PageRequest::from_query(params.page))
        .await
    {
        Ok(page) => Json(PageResponse::from(&page)).into_response(),
        Err(err) => {
            error!(?err, "failed to load submissions page for API");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::new("Submissions could not be loaded.")),
            )
                .into_response()
        }
    }
}

fn render_admin_page<O: ObjectStorage>(
    signed_in_as: &str,
    page: &Page,
    flash: &str,
    storage: &O,
) -> String {
    let header_cells = std::iter::once("ID".to_string())
        .chain(std::iter::once("Section".to_string()))
        .chain(primary_fields().map(|def| escape_html(def.label)))
        .chain(["Attachments".to_string(), "Actions".to_string()])
        .map(|label| format!("<th>{label}</th>"))
        .collect::<String>();
    let column_count = PRIMARY_COLUMNS.len() + 4;

    let rows = if page.rows.is_empty() {
        format!(
            r#"<tr><td colspan="{column_count}" class="note">No submissions on this page.</td></tr>"#
        )
    } else {
        page.rows
            .iter()
            .map(|submission| render_row(submission, page.number, column_count, storage))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let total_pages = page.total_pages();
    let prev = if page.has_prev() {
        format!(r#"<a href="/admin?page={}">← Previous</a>"#, page.prev_page())
    } else {
        r#"<span class="disabled">← Previous</span>"#.to_string()
    };
    let next = if page.has_next() {
        format!(r#"<a href="/admin?page={}">Next →</a>"#, page.next_page())
    } else {
        r#"<span class="disabled">Next →</span>"#.to_string()
    };

    let body = format!(
        r#"        {flash}
        <section class="panel">
            <div class="toolbar">
                <h2>Submissions ({total})</h2>
                <a class="export-link" href="/admin/export">Export to Excel</a>
            </div>
            <div class="table-scroll">
                <table class="submissions">
                    <thead><tr>{header_cells}</tr></thead>
                    <tbody>
{rows}
                    </tbody>
                </table>
            </div>
            <div class="pager">
                {prev}
                <span>Page {number} of {shown_pages}</span>
                {next}
            </div>
        </section>"#,
        total = page.total,
        number = page.shown_number(),
        shown_pages = total_pages.max(1),
    );

    render_page(PageLayout {
        meta_title: "Newsletter Submissions",
        page_heading: "Newsletter Submissions",
        signed_in_as,
        note_html: Cow::Borrowed("Review, export or remove newsletter entries."),
        header_link: Some(HeaderLink {
            href: "/",
            label: "← Back to form",
        }),
        admin_link: None,
        body_html: Cow::Owned(body),
        extra_style_blocks: vec![Cow::Borrowed(ADMIN_STYLES)],
        body_scripts: vec![Cow::Borrowed(ADMIN_SCRIPT)],
    })
}

fn render_row<O: ObjectStorage>(
    submission: &Submission,
    page_number: i64,
    column_count: usize,
    storage: &O,
) -> String {
    let id = submission.id;
    let record = &submission.record;

    let primary_cells = primary_fields()
        .map(|def| {
            let text = record.get(def.key).map(FieldValue::display).unwrap_or_default();
            let class = if text.len() > 40 { r#" class="long""# } else { "" };
            format!("<td{class}>{}</td>", escape_html(&text))
        })
        .collect::<String>();

    let attachments = photo_fields()
        .filter_map(|def| match record.get(def.key) {
            Some(FieldValue::Photos(paths)) => Some(photo_links(paths, storage)),
            _ => None,
        })
        .collect::<String>();

    let details = render_details(submission, storage);

    format!(
        r#"                        <tr>
                            <td>{id}</td>
                            <td>{section}</td>
                            {primary_cells}
                            <td class="attachments">{attachments}</td>
                            <td>
                                <div class="row-actions">
                                    <button type="button" data-detail-toggle="detail-{id}">Details</button>
                                    <form class="delete-form" method="post" action="/admin/submissions/delete">
                                        <input type="hidden" name="id" value="{id}">
                                        <input type="hidden" name="page" value="{page_number}">
                                        <button type="submit" class="delete">Delete</button>
                                    </form>
                                </div>
                            </td>
                        </tr>
                        <tr class="detail-row" id="detail-{id}" hidden>
                            <td colspan="{column_count}">
                                <p class="note">Submitted {created_at}</p>
                                <div class="detail-grid">{details}</div>
                            </td>
                        </tr>"#,
        section = escape_html(&submission.section),
        created_at = submission.created_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

/// Secondary fields grouped by theme; photo fields render as links.
fn render_details<O: ObjectStorage>(submission: &Submission, storage: &O) -> String {
    let groups = submission
        .record
        .themes()
        .filter_map(|(theme, theme_record)| {
            let entries = theme_record
                .fields()
                .filter(|(def, _)| !is_primary(def.key))
                .map(|(def, value)| {
                    let rendered = match value {
                        FieldValue::Photos(paths) => photo_links(paths, storage),
                        other => escape_html(&other.display()),
                    };
                    format!("<dt>{}</dt><dd>{rendered}</dd>", escape_html(def.label))
                })
                .collect::<String>();
            (!entries.is_empty()).then(|| render_theme_group(theme, &entries))
        })
        .collect::<String>();

    if groups.is_empty() {
        r#"<p class="note">No additional details.</p>"#.to_string()
    } else {
        groups
    }
}

fn render_theme_group(theme: Theme, entries: &str) -> String {
    format!(
        r#"<div><h4>{}</h4><dl>{entries}</dl></div>"#,
        escape_html(theme.label())
    )
}

fn photo_links<O: ObjectStorage>(paths: &[String], storage: &O) -> String {
    paths
        .iter()
        .map(|path| {
            let url = escape_html(&storage.public_url(path));
            let name = escape_html(path.rsplit('/').next().unwrap_or(path));
            format!(r#"<a href="{url}" target="_blank" rel="noopener">{name}</a>"#)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        modules::newsletter::{
            record::SubmissionRecord, schema::field_def, store::testing::MemoryStore,
        },
        storage::testing::MemoryStorage,
    };

    fn submission(id: i64) -> Submission {
        let mut record = SubmissionRecord::new();
        record.set(field_def("mou_org").unwrap(), FieldValue::Text("Acme".into()));
        record.set(
            field_def("designation").unwrap(),
            FieldValue::Text("Professor".into()),
        );
        record.set(
            field_def("mou_photos").unwrap(),
            FieldValue::Photos(vec!["abc.jpg".into()]),
        );
        Submission {
            id,
            section: "mou".into(),
            created_at: Utc::now(),
            record,
        }
    }

    #[tokio::test]
    async fn delete_redirects_back_to_same_page() {
        let store = MemoryStore::with_rows(15);
        let target = delete_and_redirect(&store, 12, PageRequest::new(2)).await;
        assert_eq!(target, "/admin?page=2&status=deleted");
        assert_eq!(store.row_count(), 14);

        let missing = delete_and_redirect(&store, 12, PageRequest::new(2)).await;
        assert_eq!(missing, "/admin?page=2&error=not_found");
    }

    #[tokio::test]
    async fn failed_delete_keeps_rows() {
        let store = MemoryStore {
            fail_delete: true,
            ..MemoryStore::with_rows(3)
        };
        let target = delete_and_redirect(&store, 1, PageRequest::new(1)).await;
        assert_eq!(target, "/admin?page=1&error=delete_failed");
        assert_eq!(store.row_count(), 3);
    }

    #[test]
    fn page_lists_primary_values_details_and_links() {
        let page = Page {
            number: 1,
            rows: vec![submission(7)],
            total: 1,
        };
        let html = render_admin_page("head@bmsit.in", &page, "", &MemoryStorage::default());

        assert!(html.contains("<td>Acme</td>"));
        assert!(html.contains(r#"href="https://files.example/abc.jpg""#));
        assert!(html.contains(r#"id="detail-7""#));
        assert!(html.contains("<dd>Professor</dd>"));
        assert!(html.contains("Page 1 of 1"));
    }

    #[test]
    fn empty_page_shows_placeholder_row() {
        let page = Page {
            number: 4,
            rows: Vec::new(),
            total: 12,
        };
        let html = render_admin_page("head@bmsit.in", &page, "", &MemoryStorage::default());
        assert!(html.contains("No submissions on this page."));
        assert!(html.contains("Page 2 of 2"));
        assert!(html.contains(r#"href="/admin?page=2""#));
        assert!(!html.contains(r#"href="/admin?page=3""#));
    }

    #[test]
    fn api_response_reports_paging() {
        let page = Page {
            number: 2,
            rows: vec![submission(11)],
            total: 11,
        };
        let value = serde_json::to_value(PageResponse::from(&page)).unwrap();
        assert_eq!(value["total_pages"], 2);
        assert_eq!(value["page_size"], 10);
        assert_eq!(value["rows"][0]["mou_org"], "Acme");
    }
}
