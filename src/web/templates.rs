use std::borrow::Cow;

use chrono::{Datelike, Utc};

const PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 2rem 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .header-actions { display: flex; gap: 0.75rem; align-items: center; flex-wrap: wrap; }
        .back-link { display: inline-flex; align-items: center; gap: 0.4rem; color: #1d4ed8; text-decoration: none; font-weight: 600; background: #e0f2fe; padding: 0.5rem 0.95rem; border-radius: 999px; border: 1px solid #bfdbfe; transition: background 0.15s ease, border 0.15s ease; }
        .back-link:hover { background: #bfdbfe; border-color: #93c5fd; }
        .admin-link { display: inline-flex; align-items: center; gap: 0.35rem; color: #0f172a; background: #fee2e2; border: 1px solid #fecaca; padding: 0.45rem 0.9rem; border-radius: 999px; text-decoration: none; font-weight: 600; }
        .admin-link:hover { background: #fecaca; border-color: #fca5a5; }
        .sign-out { margin: 0; }
        .sign-out button { padding: 0.45rem 0.9rem; border-radius: 999px; background: #e2e8f0; color: #0f172a; }
        .sign-out button:hover { background: #cbd5e1; }
        main { padding: 2rem 1.5rem; max-width: 1100px; margin: 0 auto; box-sizing: border-box; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); margin-bottom: 2rem; }
        .panel h2 { margin-top: 0; }
        label { display: block; margin-bottom: 0.5rem; font-weight: 600; color: #0f172a; }
        button { padding: 0.85rem 1.2rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; transition: background 0.15s ease; }
        button:hover { background: #1d4ed8; }
        button:disabled { opacity: 0.6; cursor: not-allowed; }
        table { width: 100%; border-collapse: collapse; margin-top: 1.5rem; background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; overflow: hidden; }
        th, td { padding: 0.75rem 1rem; border-bottom: 1px solid #e2e8f0; text-align: left; vertical-align: top; }
        th { background: #f1f5f9; color: #0f172a; font-weight: 600; }
        .note { color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .flash { padding: 1rem; border-radius: 8px; margin-bottom: 1.5rem; border: 1px solid transparent; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.error { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            header { padding: 1.5rem 1rem; }
            main { padding: 1.5rem 1rem; }
            .header-bar { flex-direction: column; align-items: flex-start; }
            table { font-size: 0.9rem; }
            th, td { padding: 0.5rem; }
        }
"#;

pub struct HeaderLink<'a> {
    pub href: &'a str,
    pub label: &'a str,
}

/// Shell shared by the form and the admin pages.
pub struct PageLayout<'a> {
    pub meta_title: &'a str,
    pub page_heading: &'a str,
    pub signed_in_as: &'a str,
    pub note_html: Cow<'a, str>,
    pub header_link: Option<HeaderLink<'a>>,
    pub admin_link: Option<HeaderLink<'a>>,
    pub body_html: Cow<'a, str>,
    pub extra_style_blocks: Vec<Cow<'a, str>>,
    pub body_scripts: Vec<Cow<'a, str>>,
}

pub fn render_page(layout: PageLayout<'_>) -> String {
    let PageLayout {
        meta_title,
        page_heading,
        signed_in_as,
        note_html,
        header_link,
        admin_link,
        body_html,
        extra_style_blocks,
        body_scripts,
    } = layout;

    let header_link_html = header_link
        .map(|link| {
            format!(
                r#"<a class="back-link" href="{href}">{label}</a>"#,
                href = link.href,
                label = link.label,
            )
        })
        .unwrap_or_default();
    let admin_link_html = admin_link
        .map(|link| {
            format!(
                r#"<a class="admin-link" href="{href}">{label}</a>"#,
                href = link.href,
                label = link.label,
            )
        })
        .unwrap_or_default();

    let styles = std::iter::once(Cow::Borrowed(PAGE_BASE_STYLES))
        .chain(extra_style_blocks)
        .map(|block| block.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let scripts = body_scripts
        .into_iter()
        .map(|script| script.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{meta_title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>{page_heading}</h1>
            <div class="header-actions">
                {header_link_html}
                {admin_link_html}
                <span class="note">Signed in as <strong>{signed_in_as}</strong></span>
                <form class="sign-out" method="post" action="/sign-out"><button type="submit">Sign out</button></form>
            </div>
        </div>
        <p class="note">{note_html}</p>
    </header>
    <main>
{body_html}
        {footer}
    </main>
{scripts}
</body>
</html>"#,
        signed_in_as = escape_html(signed_in_as),
    )
}

const STANDALONE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f1f5f9; color: #0f172a; padding: 1.5rem; box-sizing: border-box; gap: 1.5rem; }
        main { width: 100%; max-width: 480px; display: flex; flex-direction: column; align-items: center; gap: 1.5rem; }
        .panel { background: #ffffff; padding: 2.5rem 2.25rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); width: 100%; border: 1px solid #e2e8f0; box-sizing: border-box; text-align: center; }
        h1 { margin: 0 0 1rem; font-size: 1.8rem; }
        p.description { margin: 0 0 1.75rem; color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .button { display: inline-block; width: 100%; padding: 0.95rem; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; text-decoration: none; box-sizing: border-box; transition: background 0.15s ease; }
        .button:hover { background: #1d4ed8; }
        .flash { padding: 0.85rem 1rem; border-radius: 8px; margin-bottom: 1.25rem; background: #fef2f2; border: 1px solid #fecaca; color: #b91c1c; }
        .flash.info { background: #eff6ff; border-color: #bfdbfe; color: #1d4ed8; }
        .app-footer { margin-top: 2.5rem; text-align: center; font-size: 0.85rem; color: #64748b; }
"#;

fn render_standalone_page(title: &str, body_html: &str) -> String {
    let footer = render_footer();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{STANDALONE_STYLES}
    </style>
</head>
<body>
    <main>
        <section class="panel">
{body_html}
        </section>
        {footer}
    </main>
</body>
</html>"#
    )
}

pub fn render_sign_in_page(error: Option<&str>) -> String {
    let flash = match error {
        Some("signed_out") => r#"<div class="flash info">You have been signed out.</div>"#,
        Some("session_failed") => {
            r#"<div class="flash">Sign-in could not be completed. Please try again.</div>"#
        }
        Some("oauth_unavailable") => {
            r#"<div class="flash">Google sign-in is currently unavailable.</div>"#
        }
        _ => "",
    };

    let body = format!(
        r#"            <h1>Department Newsletter</h1>
            {flash}
            <p class="description">Sign in with your institutional Google account to submit newsletter entries.</p>
            <a class="button" href="/auth/google">Sign in with Google</a>"#
    );
    render_standalone_page("Department Newsletter | Sign in", &body)
}

pub fn render_unauthorized_page() -> String {
    let body = r#"            <h1>Access restricted</h1>
            <p class="description">This form only accepts institutional accounts (for example <strong>@bmsit.in</strong> or <strong>@bmsit.ac.in</strong>). The admin view is limited to the newsletter editors. Please sign in with an allowed account.</p>
            <a class="button" href="/sign-in">Back to sign in</a>"#;
    render_standalone_page("Department Newsletter | Access restricted", body)
}

/// Flash banner for the known `status`/`error` query codes.
pub fn compose_flash_message(status: Option<&str>, error: Option<&str>) -> String {
    if let Some(status) = status {
        let message = match status {
            "submitted" => "Your newsletter entry has been saved.",
            "deleted" => "The submission was deleted.",
            _ => "",
        };

        if !message.is_empty() {
            return format!(r#"<div class="flash success">{message}</div>"#);
        }
    }

    if let Some(error) = error {
        let message = match error {
            "delete_failed" => "The submission could not be deleted. Please try again.",
            "not_found" => "That submission no longer exists.",
            "fetch_failed" => "Submissions could not be loaded. Please refresh the page.",
            _ => "Something went wrong. Please check the server logs.",
        };

        return format!(r#"<div class="flash error">{message}</div>"#);
    }

    String::new()
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {current_year} Department Newsletter. For internal use only.</footer>"#
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
