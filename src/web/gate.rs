use std::collections::HashSet;

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};
use uuid::Uuid;

use crate::web::{
    AppState,
    auth::{self, SESSION_COOKIE, SessionUser},
};

/// Allow-list of exact addresses and domain suffixes, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    allowed_exact_addresses: HashSet<String>,
    allowed_domain_suffixes: HashSet<String>,
}

impl AccessPolicy {
    pub fn new<A, D>(addresses: A, suffixes: D) -> Self
    where
        A: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        let allowed_exact_addresses = addresses
            .into_iter()
            .map(|address| address.trim().to_lowercase())
            .filter(|address| !address.is_empty())
            .collect();
        let allowed_domain_suffixes = suffixes
            .into_iter()
            .map(|suffix| normalize_suffix(&suffix))
            .filter(|suffix| suffix.len() > 1)
            .collect();

        Self {
            allowed_exact_addresses,
            allowed_domain_suffixes,
        }
    }

    pub fn permits(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return false;
        }
        self.allowed_exact_addresses.contains(&email)
            || self
                .allowed_domain_suffixes
                .iter()
                .any(|suffix| email.ends_with(suffix.as_str()))
    }
}

/// `bmsit.in` and `@bmsit.in` both match addresses ending in `@bmsit.in`.
fn normalize_suffix(raw: &str) -> String {
    let suffix = raw.trim().to_lowercase();
    if suffix.starts_with('@') {
        suffix
    } else {
        format!("@{suffix}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Unauthenticated,
    Denied,
    Authorized,
}

pub fn classify(email: Option<&str>, policy: &AccessPolicy) -> GateDecision {
    match email {
        None => GateDecision::Unauthenticated,
        Some(email) if policy.permits(email) => GateDecision::Authorized,
        Some(_) => GateDecision::Denied,
    }
}

/// Which protected surface a request is entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Form,
    Admin,
}

impl Gate {
    fn permits(self, state: &AppState, email: &str) -> GateDecision {
        let config = state.config();
        match self {
            Gate::Admin => classify(Some(email), &config.admin_access),
            Gate::Form => {
                if config.admin_access.permits(email) {
                    GateDecision::Authorized
                } else {
                    classify(Some(email), &config.form_access)
                }
            }
        }
    }
}

/// Redirect issued by the gate together with any cookie changes.
pub struct GateRejection {
    jar: CookieJar,
    redirect: Redirect,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        (self.jar, self.redirect).into_response()
    }
}

/// Resolves the session behind the request and checks it against the gate's allow-list.
///
/// Denied sessions are ended on the spot so the visitor can pick another account.
pub async fn require_access(
    state: &AppState,
    jar: CookieJar,
    gate: Gate,
) -> Result<SessionUser, GateRejection> {
    let to_sign_in = |jar: CookieJar| GateRejection {
        jar,
        redirect: Redirect::to("/sign-in"),
    };

    let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    else {
        return Err(to_sign_in(jar));
    };

    let user = match auth::fetch_session_user(state.pool_ref(), token).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(to_sign_in(jar.remove(auth::session_removal_cookie()))),
        Err(err) => {
            error!(?err, "failed to validate session for access gate");
            return Err(to_sign_in(jar));
        }
    };

    match gate.permits(state, &user.email) {
        GateDecision::Authorized => Ok(user),
        GateDecision::Unauthenticated => Err(to_sign_in(jar)),
        GateDecision::Denied => {
            warn!(email = %user.email, ?gate, "signed-in account is not on the allow-list");
            if let Err(err) = auth::delete_session(state.pool_ref(), token).await {
                error!(?err, "failed to remove denied session");
            }
            Err(GateRejection {
                jar: jar.remove(auth::session_removal_cookie()),
                redirect: Redirect::to("/unauthorized"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(addresses: &[&str], suffixes: &[&str]) -> AccessPolicy {
        AccessPolicy::new(
            addresses.iter().map(|s| s.to_string()),
            suffixes.iter().map(|s| s.to_string()),
        )
    }

    #[test]
    fn domain_suffix_authorizes_matching_address() {
        let policy = policy(&[], &["@bmsit.in"]);
        assert_eq!(
            classify(Some("x@bmsit.in"), &policy),
            GateDecision::Authorized
        );
        assert_eq!(
            classify(Some("X@BMSIT.IN"), &policy),
            GateDecision::Authorized
        );
    }

    #[test]
    fn other_domains_are_denied_unless_listed() {
        let open = policy(&[], &["@bmsit.in"]);
        assert_eq!(classify(Some("x@gmail.com"), &open), GateDecision::Denied);

        let listed = policy(&["x@gmail.com"], &["@bmsit.in"]);
        assert_eq!(
            classify(Some("x@gmail.com"), &listed),
            GateDecision::Authorized
        );
    }

    #[test]
    fn missing_identity_is_unauthenticated() {
        let policy = policy(&["a@b.c"], &[]);
        assert_eq!(classify(None, &policy), GateDecision::Unauthenticated);
    }

    #[test]
    fn suffix_without_at_sign_matches_whole_domain_only() {
        let policy = policy(&[], &["bmsit.in"]);
        assert!(policy.permits("faculty@bmsit.in"));
        assert!(!policy.permits("faculty@notbmsit.in"));
    }

    #[test]
    fn empty_policy_permits_nobody() {
        let policy = AccessPolicy::default();
        assert!(!policy.permits("anyone@bmsit.in"));
        assert!(!policy.permits(""));
    }
}
