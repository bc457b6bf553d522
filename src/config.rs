use std::{env, path::PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::{modules::newsletter::schema::Section, web::AccessPolicy};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FORM_DOMAINS: &str = "@bmsit.in,@bmsit.ac.in";
const DEFAULT_HOSTED_DOMAIN: &str = "bmsit.in,bmsit.ac.in";
const DEFAULT_LOCAL_STORAGE: &str = "storage/newsletter-photos";
const LOCAL_PUBLIC_PREFIX: &str = "/storage/";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Settings loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub public_base_url: String,
    pub oauth: OAuthSettings,
    pub form_access: AccessPolicy,
    pub admin_access: AccessPolicy,
    pub storage: StorageSettings,
    pub default_section: Section,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub hosted_domain: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug, Clone)]
pub enum StorageSettings {
    Remote {
        api_url: String,
        bucket: String,
        service_key: String,
        public_base_url: String,
    },
    Local {
        root: PathBuf,
        public_base_url: String,
    },
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup (the process
    /// environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &str| var(key).with_context(|| format!("{key} env var is missing"));

        let database_url = required("DATABASE_URL")?;

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a port number, got `{raw}`"))?,
            None => DEFAULT_PORT,
        };

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let oauth = OAuthSettings {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_url: format!("{public_base_url}/api/auth/callback"),
            hosted_domain: var("OAUTH_HOSTED_DOMAIN")
                .unwrap_or_else(|| DEFAULT_HOSTED_DOMAIN.to_string()),
            authorize_url: var("OAUTH_AUTHORIZE_URL")
                .unwrap_or_else(|| GOOGLE_AUTHORIZE_URL.to_string()),
            token_url: var("OAUTH_TOKEN_URL").unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
            userinfo_url: var("OAUTH_USERINFO_URL")
                .unwrap_or_else(|| GOOGLE_USERINFO_URL.to_string()),
        };

        let form_access = AccessPolicy::new(
            split_list(var("FORM_ALLOWED_EMAILS").as_deref().unwrap_or("")),
            split_list(
                var("FORM_ALLOWED_DOMAINS")
                    .as_deref()
                    .unwrap_or(DEFAULT_FORM_DOMAINS),
            ),
        );
        let admin_access = AccessPolicy::new(
            split_list(var("ADMIN_ALLOWED_EMAILS").as_deref().unwrap_or("")),
            split_list(var("ADMIN_ALLOWED_DOMAINS").as_deref().unwrap_or("")),
        );

        let storage = match var("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "remote" => {
                let api_url = required("STORAGE_API_URL")?
                    .trim_end_matches('/')
                    .to_string();
                let bucket = var("STORAGE_BUCKET").unwrap_or_else(|| "newsletter-photos".into());
                let public_base_url = var("STORAGE_PUBLIC_BASE_URL")
                    .unwrap_or_else(|| format!("{api_url}/object/public/{bucket}/"));
                StorageSettings::Remote {
                    service_key: required("STORAGE_SERVICE_KEY")?,
                    public_base_url: with_trailing_slash(public_base_url),
                    api_url,
                    bucket,
                }
            }
            "local" => StorageSettings::Local {
                root: PathBuf::from(
                    var("STORAGE_LOCAL_DIR").unwrap_or_else(|| DEFAULT_LOCAL_STORAGE.into()),
                ),
                public_base_url: with_trailing_slash(
                    var("STORAGE_PUBLIC_BASE_URL").unwrap_or_else(|| LOCAL_PUBLIC_PREFIX.into()),
                ),
            },
            other => bail!("STORAGE_BACKEND must be `remote` or `local`, got `{other}`"),
        };

        let default_section = match var("DEFAULT_SECTION") {
            Some(raw) => Section::from_key(&raw)
                .ok_or_else(|| anyhow!("DEFAULT_SECTION `{raw}` is not a form section"))?,
            None => Section::Mou,
        };

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MAX_UPLOAD_BYTES must be a byte count, got `{raw}`"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            database_url,
            port,
            public_base_url,
            oauth,
            form_access,
            admin_access,
            storage,
            default_section,
            max_upload_bytes,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/newsletter"),
        ("GOOGLE_CLIENT_ID", "client"),
        ("GOOGLE_CLIENT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = load(BASE).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.oauth.redirect_url,
            "http://localhost:8080/api/auth/callback"
        );
        assert_eq!(config.default_section, Section::Mou);
        assert!(config.form_access.permits("someone@bmsit.in"));
        assert!(config.form_access.permits("someone@bmsit.ac.in"));
        assert!(!config.admin_access.permits("someone@bmsit.in"));
        assert!(matches!(config.storage, StorageSettings::Local { .. }));
    }

    #[test]
    fn admin_list_and_remote_storage_are_read() {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(&[
            ("ADMIN_ALLOWED_EMAILS", "head@bmsit.in, Editor@Gmail.com"),
            ("STORAGE_BACKEND", "remote"),
            ("STORAGE_API_URL", "https://project.example/storage/v1/"),
            ("STORAGE_SERVICE_KEY", "key"),
        ]);
        let config = load(&pairs).unwrap();

        assert!(config.admin_access.permits("editor@gmail.com"));
        assert!(config.admin_access.permits("head@bmsit.in"));
        assert!(!config.admin_access.permits("other@bmsit.in"));

        match config.storage {
            StorageSettings::Remote {
                api_url,
                public_base_url,
                bucket,
                ..
            } => {
                assert_eq!(api_url, "https://project.example/storage/v1");
                assert_eq!(bucket, "newsletter-photos");
                assert_eq!(
                    public_base_url,
                    "https://project.example/storage/v1/object/public/newsletter-photos/"
                );
            }
            StorageSettings::Local { .. } => panic!("expected remote storage"),
        }
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = load(&BASE[1..]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("DEFAULT_SECTION", "sports"));
        assert!(load(&pairs).is_err());
    }
}
