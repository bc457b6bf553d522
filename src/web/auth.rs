use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration as ChronoDuration, Utc};
use cookie::time::Duration as CookieDuration;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::web::{
    AppState,
    gate::{self, Gate},
    templates::{render_sign_in_page, render_unauthorized_page},
};

pub const SESSION_COOKIE: &str = "newsletter_session";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const SESSION_TTL_DAYS: i64 = 7;
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionUser {
    pub email: String,
    pub display_name: Option<String>,
}

impl SessionUser {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Deserialize)]
pub struct SignInQuery {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn sign_in_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SignInQuery>,
) -> Result<Html<String>, Redirect> {
    if gate::require_access(&state, jar, Gate::Form).await.is_ok() {
        return Err(Redirect::to("/"));
    }

    Ok(Html(render_sign_in_page(query.error.as_deref())))
}

pub async fn start_oauth(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let oauth_state = Uuid::new_v4().simple().to_string();

    let url = match state.oauth().authorize_url(&oauth_state) {
        Ok(url) => url,
        Err(err) => {
            error!(?err, "failed to build OAuth authorize URL");
            return (jar, Redirect::to("/sign-in?error=oauth_unavailable"));
        }
    };

    let mut cookie = Cookie::new(OAUTH_STATE_COOKIE, oauth_state);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::minutes(OAUTH_STATE_TTL_MINUTES));

    (jar.add(cookie), Redirect::to(url.as_str()))
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> (CookieJar, Redirect) {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let jar = jar.remove(removal_cookie(OAUTH_STATE_COOKIE));
    let unauthorized = |jar: CookieJar| (jar, Redirect::to("/unauthorized"));

    if let Some(provider_error) = query.error.as_deref() {
        warn!(error = provider_error, "OAuth provider returned an error");
        return unauthorized(jar);
    }

    let (Some(code), Some(returned_state)) = (query.code.as_deref(), query.state.as_deref())
    else {
        return unauthorized(jar);
    };
    if expected_state.as_deref() != Some(returned_state) {
        warn!("OAuth state mismatch");
        return unauthorized(jar);
    }

    let identity = match state.oauth().exchange_code(code).await {
        Ok(identity) => identity,
        Err(err) => {
            error!(?err, "OAuth code exchange failed");
            return unauthorized(jar);
        }
    };

    let config = state.config();
    let allowed =
        config.form_access.permits(&identity.email) || config.admin_access.permits(&identity.email);
    if !identity.email_verified || !allowed {
        warn!(
            email = %identity.email,
            verified = identity.email_verified,
            "rejected sign-in"
        );
        return unauthorized(jar);
    }

    let token = match create_session(state.pool_ref(), &identity.email, identity.name.as_deref())
        .await
    {
        Ok(token) => token,
        Err(err) => {
            error!(?err, "failed to create session");
            return (jar, Redirect::to("/sign-in?error=session_failed"));
        }
    };

    info!(email = %identity.email, "signed in");

    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(SESSION_TTL_DAYS));

    (jar.add(cookie), Redirect::to("/"))
}

pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        if let Err(err) = delete_session(state.pool_ref(), token).await {
            error!(?err, "failed to remove session during sign-out");
        }
    }

    (
        jar.remove(session_removal_cookie()),
        Redirect::to("/sign-in?error=signed_out"),
    )
}

pub async fn unauthorized_page() -> Html<String> {
    Html(render_unauthorized_page())
}

pub fn session_removal_cookie() -> Cookie<'static> {
    removal_cookie(SESSION_COOKIE)
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut removal = Cookie::new(name, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    removal
}

pub async fn create_session(
    pool: &PgPool,
    email: &str,
    display_name: Option<&str>,
) -> sqlx::Result<Uuid> {
    let token = Uuid::new_v4();
    let expires_at = Utc::now() + ChronoDuration::days(SESSION_TTL_DAYS);

    sqlx::query(
        "INSERT INTO sessions (id, email, display_name, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(token)
    .bind(email)
    .bind(display_name)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(token)
}

pub async fn fetch_session_user(
    pool: &PgPool,
    token: Uuid,
) -> sqlx::Result<Option<SessionUser>> {
    sqlx::query_as::<_, SessionUser>(
        "SELECT email, display_name FROM sessions WHERE id = $1 AND expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, token: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn purge_expired_sessions(pool: &PgPool) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = session_removal_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(0)));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn label_prefers_display_name() {
        let mut user = SessionUser {
            email: "editor@bmsit.in".into(),
            display_name: Some("Editor".into()),
        };
        assert_eq!(user.label(), "Editor");
        user.display_name = None;
        assert_eq!(user.label(), "editor@bmsit.in");
    }
}
