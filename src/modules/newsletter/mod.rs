use axum::{
    Router,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, warn};

pub mod admin;
pub mod draft;
pub mod export;
pub mod form_ui;
pub mod record;
pub mod schema;
pub mod store;

use crate::web::{
    AppState,
    gate::{Gate, require_access},
    uploads::read_submission_form,
};

use draft::{Draft, SubmitError, submit_draft};
use form_ui::{FormNotice, FormPage, render_form_page};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(form_page))
        .route("/submissions", post(submit_form))
        .route("/admin", get(admin::admin_page))
        .route("/admin/submissions/delete", post(admin::delete_submission))
        .route("/admin/export", get(admin::export_submissions))
        .route("/api/admin/submissions", get(admin::list_submissions_api))
}

#[derive(Deserialize)]
pub struct FormQuery {
    #[serde(default)]
    pub status: Option<String>,
}

async fn form_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<FormQuery>,
) -> Response {
    let user = match require_access(&state, jar, Gate::Form).await {
        Ok(user) => user,
        Err(rejection) => return rejection.into_response(),
    };

    let draft = Draft::new(state.config().default_section);
    let notice = form_notice(query.status.as_deref());

    Html(render_form_page(FormPage {
        signed_in_as: user.label(),
        show_admin_link: state.config().admin_access.permits(&user.email),
        draft: &draft,
        notice,
    }))
    .into_response()
}

/// Successful submissions land here with `status=submitted` and a fresh draft.
fn form_notice(status: Option<&str>) -> FormNotice<'static> {
    match status {
        Some("submitted") => FormNotice::Saved,
        _ => FormNotice::None,
    }
}

async fn submit_form(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let user = match require_access(&state, jar, Gate::Form).await {
        Ok(user) => user,
        Err(rejection) => return rejection.into_response(),
    };
    let default_section = state.config().default_section;
    let show_admin_link = state.config().admin_access.permits(&user.email);

    let rerender = |status: StatusCode, draft: &Draft, messages: &[String]| {
        let html = render_form_page(FormPage {
            signed_in_as: user.label(),
            show_admin_link,
            draft,
            notice: FormNotice::Failed(messages),
        });
        (status, Html(html)).into_response()
    };

    let posted = match read_submission_form(multipart, default_section).await {
        Ok(posted) => posted,
        Err(err) => {
            warn!(error = %err, email = %user.email, "failed to read newsletter form");
            let messages = [format!(
                "{}. If you attached large files, try fewer or smaller ones.",
                err.message()
            )];
            return rerender(
                StatusCode::BAD_REQUEST,
                &Draft::new(default_section),
                &messages,
            );
        }
    };

    if !posted.rejected.is_empty() {
        return rerender(
            StatusCode::UNPROCESSABLE_ENTITY,
            &posted.draft,
            &posted.rejected,
        );
    }

    match submit_draft(&state.submissions(), state.storage(), &posted.draft).await {
        Ok(_) => Redirect::to("/?status=submitted").into_response(),
        Err(err) => {
            let status = match &err {
                SubmitError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SubmitError::Upload(_) => StatusCode::BAD_GATEWAY,
                SubmitError::Insert(source) => {
                    error!(?source, email = %user.email, "failed to save newsletter submission");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            rerender(status, &posted.draft, &[err.to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::Section;

    #[test]
    fn submitted_status_shows_saved_notice_on_blank_form() {
        let draft = Draft::new(Section::Mou);
        let html = render_form_page(FormPage {
            signed_in_as: "editor@bmsit.in",
            show_admin_link: false,
            draft: &draft,
            notice: form_notice(Some("submitted")),
        });
        assert!(html.contains("The form has been cleared for a new entry."));
        assert!(html.contains(r#"<input type="hidden" name="section" value="mou">"#));
        assert!(html.contains(r#"name="mou_org" value="""#));
    }

    #[test]
    fn other_statuses_show_no_notice() {
        assert!(matches!(form_notice(None), FormNotice::None));
        assert!(matches!(form_notice(Some("deleted")), FormNotice::None));
    }
}
