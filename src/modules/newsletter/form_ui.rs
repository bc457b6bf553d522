use std::borrow::Cow;

use super::{
    draft::{ALLOWED_EXTENSIONS, Draft, MAX_FILES_PER_FIELD},
    schema::{FieldDef, FieldKind, Section, Theme},
};
use crate::web::{
    escape_html,
    templates::{HeaderLink, PageLayout, render_page},
    uploads::SECTION_FIELD,
};

const FORM_STYLES: &str = r#"
        .section-tabs { display: flex; flex-wrap: wrap; gap: 0.5rem; margin-bottom: 1.5rem; }
        .section-tab { background: #e2e8f0; color: #0f172a; padding: 0.6rem 1rem; border-radius: 999px; }
        .section-tab.active { background: #2563eb; color: #ffffff; }
        .section-panel { display: none; }
        .section-panel.active { display: block; }
        details.theme { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; margin-bottom: 1rem; padding: 0.75rem 1.25rem; }
        details.theme summary { cursor: pointer; font-weight: 700; color: #1d4ed8; padding: 0.5rem 0; }
        .field-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); gap: 1rem 1.5rem; margin: 1rem 0; }
        .field input, .field textarea { width: 100%; padding: 0.7rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; font-family: inherit; }
        .field textarea { min-height: 110px; }
        .field.wide { grid-column: 1 / -1; }
        .field input:focus, .field textarea:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        .reattach { color: #b45309; font-size: 0.85rem; margin-top: 0.35rem; }
        .form-actions { display: flex; justify-content: flex-end; margin-top: 1.5rem; }
        .flash ul { margin: 0.5rem 0 0; padding-left: 1.25rem; }
"#;

const FORM_SCRIPT: &str = r#"<script>
(() => {
    const input = document.querySelector('input[name="section"]');
    const tabs = document.querySelectorAll('.section-tab');
    const panels = document.querySelectorAll('.section-panel');
    tabs.forEach((tab) => {
        tab.addEventListener('click', () => {
            const target = tab.dataset.section;
            tabs.forEach((t) => t.classList.toggle('active', t === tab));
            panels.forEach((p) => p.classList.toggle('active', p.dataset.section === target));
            input.value = target;
        });
    });
    const form = document.getElementById('newsletter-form');
    form.addEventListener('submit', () => {
        const button = form.querySelector('button[type="submit"]');
        button.disabled = true;
        button.textContent = 'Submitting...';
    });
})();
</script>"#;

/// Outcome banner shown above the form.
pub enum FormNotice<'a> {
    None,
    Saved,
    Failed(&'a [String]),
}

pub struct FormPage<'a> {
    pub signed_in_as: &'a str,
    pub show_admin_link: bool,
    pub draft: &'a Draft,
    pub notice: FormNotice<'a>,
}

pub fn render_form_page(page: FormPage<'_>) -> String {
    let FormPage {
        signed_in_as,
        show_admin_link,
        draft,
        notice,
    } = page;

    let active = draft.section();

    let tabs = Section::ALL
        .iter()
        .map(|section| {
            format!(
                r#"<button type="button" class="section-tab{active_class}" data-section="{key}">{label}</button>"#,
                active_class = if *section == active { " active" } else { "" },
                key = section.key(),
                label = escape_html(section.label()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let panels = Section::ALL
        .iter()
        .map(|section| render_section_panel(*section, *section == active, draft))
        .collect::<Vec<_>>()
        .join("\n");

    let notice_html = match notice {
        FormNotice::None => String::new(),
        FormNotice::Saved => {
            r#"<div class="flash success">Your newsletter entry has been saved. The form has been cleared for a new entry.</div>"#
                .to_string()
        }
        FormNotice::Failed(messages) => {
            let items = messages
                .iter()
                .map(|message| format!("<li>{}</li>", escape_html(message)))
                .collect::<String>();
            format!(
                r#"<div class="flash error">The entry was not saved. Your values are kept below.<ul>{items}</ul></div>"#
            )
        }
    };

    let body = format!(
        r#"        {notice_html}
        <form id="newsletter-form" method="post" action="/submissions" enctype="multipart/form-data">
            <input type="hidden" name="{SECTION_FIELD}" value="{active_key}">
            <div class="section-tabs">
{tabs}
            </div>
{panels}
            <div class="form-actions">
                <button type="submit">Submit entry</button>
            </div>
        </form>"#,
        active_key = active.key(),
    );

    render_page(PageLayout {
        meta_title: "Department Newsletter",
        page_heading: "Department Newsletter Form",
        signed_in_as,
        note_html: Cow::Borrowed(
            "Fill in whichever sections apply. Every field is optional; empty fields are left out of the entry.",
        ),
        header_link: None,
        admin_link: show_admin_link.then_some(HeaderLink {
            href: "/admin",
            label: "Admin view",
        }),
        body_html: Cow::Owned(body),
        extra_style_blocks: vec![Cow::Borrowed(FORM_STYLES)],
        body_scripts: vec![Cow::Borrowed(FORM_SCRIPT)],
    })
}

fn render_section_panel(section: Section, active: bool, draft: &Draft) -> String {
    let themes = section
        .themes()
        .map(|theme| render_theme(theme, draft))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"            <div class="section-panel{active_class}" data-section="{key}">
{themes}
            </div>"#,
        active_class = if active { " active" } else { "" },
        key = section.key(),
    )
}

fn render_theme(theme: Theme, draft: &Draft) -> String {
    let has_values = theme.fields().any(|def| {
        draft.text(def.key).is_some_and(|v| !v.trim().is_empty())
            || !draft.files(def.key).is_empty()
    });

    let fields = theme
        .fields()
        .map(|def| render_field(def, draft))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"                <details class="theme"{open}>
                    <summary>{label}</summary>
                    <div class="field-grid">
{fields}
                    </div>
                </details>"#,
        open = if has_values { " open" } else { "" },
        label = escape_html(theme.label()),
    )
}

fn render_field(def: &FieldDef, draft: &Draft) -> String {
    let id = format!("field-{}", def.key);
    let value = escape_html(draft.text(def.key).unwrap_or(""));

    let (class, control) = match def.kind {
        FieldKind::Text => (
            "field",
            format!(r#"<input id="{id}" type="text" name="{key}" value="{value}">"#, key = def.key),
        ),
        FieldKind::LongText => (
            "field wide",
            format!(r#"<textarea id="{id}" name="{key}">{value}</textarea>"#, key = def.key),
        ),
        FieldKind::Date => (
            "field",
            format!(r#"<input id="{id}" type="date" name="{key}" value="{value}">"#, key = def.key),
        ),
        FieldKind::Integer => (
            "field",
            format!(
                r#"<input id="{id}" type="number" step="1" name="{key}" value="{value}">"#,
                key = def.key
            ),
        ),
        FieldKind::Decimal => (
            "field",
            format!(
                r#"<input id="{id}" type="number" step="any" name="{key}" value="{value}">"#,
                key = def.key
            ),
        ),
        FieldKind::Photos => {
            let accept = ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(",");
            let selected = draft.files(def.key);
            let reattach = if selected.is_empty() {
                String::new()
            } else {
                let names = selected
                    .iter()
                    .map(|file| escape_html(&file.original_name))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    r#"<p class="reattach">Previously selected: {names}. Please attach these files again.</p>"#
                )
            };
            (
                "field wide",
                format!(
                    r#"<input id="{id}" type="file" name="{key}" accept="{accept}" multiple>
                            <p class="note">Up to {MAX_FILES_PER_FIELD} files.</p>{reattach}"#,
                    key = def.key
                ),
            )
        }
    };

    format!(
        r#"                        <div class="{class}">
                            <label for="{id}">{label}</label>
                            {control}
                        </div>"#,
        label = escape_html(def.label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PendingFile;

    fn page(draft: &Draft, notice: FormNotice<'_>) -> String {
        render_form_page(FormPage {
            signed_in_as: "editor@bmsit.in",
            show_admin_link: false,
            draft,
            notice,
        })
    }

    #[test]
    fn active_section_is_posted_as_hidden_tag() {
        let mut draft = Draft::new(Section::Mou);
        draft.set_section(Section::Research);
        let html = page(&draft, FormNotice::None);
        assert!(html.contains(r#"<input type="hidden" name="section" value="research">"#));
        assert!(html.contains(r#"class="section-panel active" data-section="research""#));
    }

    #[test]
    fn draft_values_are_escaped_and_refilled() {
        let mut draft = Draft::new(Section::Mou);
        draft.apply_edit("mou_org", r#"Acme "Labs""#).unwrap();
        let html = page(&draft, FormNotice::None);
        assert!(html.contains(r#"name="mou_org" value="Acme &quot;Labs&quot;""#));
    }

    #[test]
    fn failed_notice_lists_messages_and_reattach_hint() {
        let mut draft = Draft::new(Section::Mou);
        draft
            .attach_file(
                "mou_photos",
                PendingFile::new("signing.jpg", mime::IMAGE_JPEG, vec![1]),
            )
            .unwrap();
        let messages = vec!["file upload failed".to_string()];
        let html = page(&draft, FormNotice::Failed(&messages));
        assert!(html.contains("<li>file upload failed</li>"));
        assert!(html.contains("Previously selected: signing.jpg"));
    }

    #[test]
    fn every_catalogue_field_has_an_input() {
        let html = page(&Draft::new(Section::Mou), FormNotice::None);
        for def in super::super::schema::FIELDS {
            assert!(html.contains(&format!(r#"name="{}""#, def.key)), "{}", def.key);
        }
    }
}
