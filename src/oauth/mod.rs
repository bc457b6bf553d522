use anyhow::{Context, Result, bail};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::config::OAuthSettings;

const SCOPES: &str = "openid email profile";

/// Identity returned by the provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

/// Authorization-code client for the Google identity provider.
#[derive(Clone)]
pub struct OAuthClient {
    http: Client,
    settings: OAuthSettings,
}

impl OAuthClient {
    pub fn new(settings: OAuthSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    pub fn authorize_url(&self, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.settings.authorize_url)
            .with_context(|| format!("invalid authorize URL `{}`", self.settings.authorize_url))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        if !self.settings.hosted_domain.is_empty() {
            url.query_pairs_mut()
                .append_pair("hd", &self.settings.hosted_domain);
        }

        Ok(url)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<OAuthIdentity> {
        let token_response = self
            .http
            .post(&self.settings.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", self.settings.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("token request failed")?;

        let status = token_response.status();
        if !status.is_success() {
            let body = token_response.text().await.unwrap_or_default();
            bail!("token endpoint returned {status}: {body}");
        }
        let token: TokenResponse = token_response
            .json()
            .await
            .context("failed to decode token response")?;

        let info_response = self
            .http
            .get(&self.settings.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("userinfo request failed")?;

        let status = info_response.status();
        if !status.is_success() {
            bail!("userinfo endpoint returned {status}");
        }
        let info: UserInfo = info_response
            .json()
            .await
            .context("failed to decode userinfo response")?;

        let email = info
            .email
            .filter(|email| !email.trim().is_empty())
            .context("provider did not return an email address")?;

        Ok(OAuthIdentity {
            email: email.trim().to_lowercase(),
            email_verified: info.email_verified,
            name: info.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OAuthSettings {
        OAuthSettings {
            client_id: "client-123".into(),
            client_secret: "secret".into(),
            redirect_url: "https://newsletter.example/api/auth/callback".into(),
            hosted_domain: "bmsit.in".into(),
            authorize_url: "https://accounts.example/o/oauth2/auth".into(),
            token_url: "https://accounts.example/token".into(),
            userinfo_url: "https://accounts.example/userinfo".into(),
        }
    }

    #[test]
    fn authorize_url_carries_flow_parameters() {
        let client = OAuthClient::new(settings());
        let url = client.authorize_url("abc").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("state"), Some("abc"));
        assert_eq!(get("hd"), Some("bmsit.in"));
        assert_eq!(get("access_type"), Some("offline"));
        assert_eq!(get("prompt"), Some("consent"));
        assert_eq!(get("scope"), Some("openid email profile"));
        assert_eq!(
            get("redirect_uri"),
            Some("https://newsletter.example/api/auth/callback")
        );
    }

    #[test]
    fn hosted_domain_is_optional() {
        let mut settings = settings();
        settings.hosted_domain.clear();
        let url = OAuthClient::new(settings).authorize_url("s").unwrap();
        assert!(!url.query_pairs().any(|(k, _)| k == "hd"));
    }

    #[test]
    fn userinfo_defaults_to_unverified() {
        let info: UserInfo = serde_json::from_str(r#"{"email":"a@bmsit.in"}"#).unwrap();
        assert!(!info.email_verified);
        assert!(info.name.is_none());
    }
}
