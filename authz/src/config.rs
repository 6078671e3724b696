//! Gate configuration.
//!
//! `RawAuthConfig` mirrors the YAML document operators write. It is validated
//! and normalized once into an `AuthConfig`, which is immutable for the life
//! of the process and shared as `Arc<AuthConfig>`.
//!
//! ```yaml
//! reseller_prefix: AUTH
//! auth_prefix: /auth/
//! token_life: 86400
//! allow_overrides: true
//! ext_authentication_url: https://idp.example.com/cgi-bin/swift-auth
//! allowed_sync_hosts: 127.0.0.1, 10.0.0.5
//! cache_timeout_ms: 250
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AuthzError, Result};

const DEFAULT_RESELLER_PREFIX: &str = "AUTH";
const DEFAULT_AUTH_PREFIX: &str = "/auth/";
const DEFAULT_TOKEN_LIFE: u64 = 86400;
const DEFAULT_SYNC_HOST: &str = "127.0.0.1";

/// A boolean setting that also accepts the truthy strings operators tend to
/// write (`t`, `yes`, `on`, ...). Unquoted `1`/`0` arrive as integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Flag {
    pub fn is_true(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(n) => *n != 0,
            Flag::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on" | "t" | "y"
            ),
        }
    }
}

/// A host list written either as a YAML sequence or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostList {
    List(Vec<String>),
    Csv(String),
}

impl HostList {
    fn into_hosts(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            HostList::List(list) => list,
            HostList::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect()
    }
}

/// Settings as written in the configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAuthConfig {
    pub reseller_prefix: Option<String>,
    pub auth_prefix: Option<String>,
    pub token_life: Option<u64>,
    pub allow_overrides: Option<Flag>,
    pub ext_authentication_url: Option<String>,
    pub allowed_sync_hosts: Option<HostList>,
    pub cache_timeout_ms: Option<u64>,
}

/// Validated, normalized gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthConfig {
    reseller_prefix: String,
    auth_prefix: String,
    token_life: Duration,
    allow_overrides: bool,
    ext_authentication_url: String,
    allowed_sync_hosts: Vec<String>,
    cache_timeout: Option<Duration>,
}

impl AuthConfig {
    /// Validates raw settings, applying defaults and normalization.
    pub fn from_raw(raw: RawAuthConfig) -> Result<Self> {
        let ext_authentication_url = raw
            .ext_authentication_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(AuthzError::MissingSetting("ext_authentication_url"))?;

        let reseller_prefix = normalize_reseller_prefix(
            raw.reseller_prefix
                .as_deref()
                .unwrap_or(DEFAULT_RESELLER_PREFIX),
        )?;

        let auth_prefix =
            normalize_auth_prefix(raw.auth_prefix.as_deref().unwrap_or(DEFAULT_AUTH_PREFIX));

        let token_life = raw.token_life.unwrap_or(DEFAULT_TOKEN_LIFE);
        if token_life == 0 {
            return Err(AuthzError::InvalidSetting {
                name: "token_life",
                reason: "must be greater than zero".into(),
            });
        }

        let allowed_sync_hosts = raw
            .allowed_sync_hosts
            .map(HostList::into_hosts)
            .unwrap_or_else(|| vec![DEFAULT_SYNC_HOST.to_string()]);

        Ok(Self {
            reseller_prefix,
            auth_prefix,
            token_life: Duration::from_secs(token_life),
            allow_overrides: raw.allow_overrides.map_or(true, |f| f.is_true()),
            ext_authentication_url,
            allowed_sync_hosts,
            cache_timeout: raw.cache_timeout_ms.map(Duration::from_millis),
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawAuthConfig = serde_yaml::from_str(content)?;
        Self::from_raw(raw)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Account namespace prefix, always ending in `_`.
    pub fn reseller_prefix(&self) -> &str {
        &self.reseller_prefix
    }

    /// Path prefix of the token-issuance sub-API, always `/.../`.
    pub fn auth_prefix(&self) -> &str {
        &self.auth_prefix
    }

    pub fn token_life(&self) -> Duration {
        self.token_life
    }

    pub fn allow_overrides(&self) -> bool {
        self.allow_overrides
    }

    pub fn ext_authentication_url(&self) -> &str {
        &self.ext_authentication_url
    }

    pub fn allowed_sync_hosts(&self) -> &[String] {
        &self.allowed_sync_hosts
    }

    pub fn is_sync_host(&self, addr: &str) -> bool {
        self.allowed_sync_hosts.iter().any(|h| h == addr)
    }

    pub fn cache_timeout(&self) -> Option<Duration> {
        self.cache_timeout
    }

    /// Group granting access to every account under the reseller prefix.
    pub fn reseller_admin_group(&self) -> String {
        format!("{}reseller_admin", self.reseller_prefix).to_lowercase()
    }

    /// Whether a token belongs to this auth domain.
    pub fn owns_token(&self, token: &str) -> bool {
        token.starts_with(&self.reseller_prefix)
    }
}

fn normalize_reseller_prefix(raw: &str) -> Result<String> {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return Err(AuthzError::InvalidSetting {
            name: "reseller_prefix",
            reason: "must not be empty".into(),
        });
    }
    if !prefix.ends_with('_') {
        prefix.push('_');
    }
    Ok(prefix)
}

fn normalize_auth_prefix(raw: &str) -> String {
    if raw.trim_matches('/').is_empty() {
        warn!(
            "Rewriting invalid auth prefix {:?} to {:?} (non-empty auth prefix path is required)",
            raw, DEFAULT_AUTH_PREFIX
        );
        return DEFAULT_AUTH_PREFIX.to_string();
    }
    let mut prefix = raw.to_string();
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RawAuthConfig {
        RawAuthConfig {
            ext_authentication_url: Some("https://idp.example.com/auth".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::from_raw(minimal()).unwrap();
        assert_eq!(config.reseller_prefix(), "AUTH_");
        assert_eq!(config.auth_prefix(), "/auth/");
        assert_eq!(config.token_life(), Duration::from_secs(86400));
        assert!(config.allow_overrides());
        assert_eq!(config.allowed_sync_hosts(), ["127.0.0.1".to_string()]);
        assert!(config.cache_timeout().is_none());
        assert_eq!(config.reseller_admin_group(), "auth_reseller_admin");
    }

    #[test]
    fn test_missing_ext_authentication_url() {
        let err = AuthConfig::from_raw(RawAuthConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AuthzError::MissingSetting("ext_authentication_url")
        ));

        let raw = RawAuthConfig {
            ext_authentication_url: Some("   ".into()),
            ..Default::default()
        };
        assert!(AuthConfig::from_raw(raw).is_err());
    }

    #[test]
    fn test_reseller_prefix_normalization() {
        let raw = RawAuthConfig {
            reseller_prefix: Some(" KERB ".into()),
            ..minimal()
        };
        assert_eq!(AuthConfig::from_raw(raw).unwrap().reseller_prefix(), "KERB_");

        let raw = RawAuthConfig {
            reseller_prefix: Some("KERB_".into()),
            ..minimal()
        };
        assert_eq!(AuthConfig::from_raw(raw).unwrap().reseller_prefix(), "KERB_");

        let raw = RawAuthConfig {
            reseller_prefix: Some("  ".into()),
            ..minimal()
        };
        assert!(matches!(
            AuthConfig::from_raw(raw),
            Err(AuthzError::InvalidSetting { name: "reseller_prefix", .. })
        ));
    }

    #[test]
    fn test_auth_prefix_normalization() {
        for (input, expected) in [
            ("", "/auth/"),
            ("/", "/auth/"),
            ("///", "/auth/"),
            ("login", "/login/"),
            ("/login", "/login/"),
            ("login/", "/login/"),
            ("/a/b/", "/a/b/"),
        ] {
            let raw = RawAuthConfig {
                auth_prefix: Some(input.into()),
                ..minimal()
            };
            assert_eq!(
                AuthConfig::from_raw(raw).unwrap().auth_prefix(),
                expected,
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
reseller_prefix: KERB
auth_prefix: /kauth
token_life: 3600
allow_overrides: "f"
ext_authentication_url: https://idp.example.com/cgi-bin/swift-auth
allowed_sync_hosts: " 10.0.0.1, ,10.0.0.2 "
cache_timeout_ms: 250
"#;
        let config = AuthConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.reseller_prefix(), "KERB_");
        assert_eq!(config.auth_prefix(), "/kauth/");
        assert_eq!(config.token_life(), Duration::from_secs(3600));
        assert!(!config.allow_overrides());
        assert_eq!(
            config.allowed_sync_hosts(),
            ["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );
        assert!(config.is_sync_host("10.0.0.2"));
        assert!(!config.is_sync_host("127.0.0.1"));
        assert_eq!(config.cache_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_from_yaml_host_list_and_bool() {
        let yaml = r#"
ext_authentication_url: https://idp.example.com/
allow_overrides: false
allowed_sync_hosts:
  - 192.168.1.10
  - " 192.168.1.11 "
"#;
        let config = AuthConfig::from_yaml(yaml).unwrap();
        assert!(!config.allow_overrides());
        assert_eq!(config.allowed_sync_hosts().len(), 2);
        assert!(config.is_sync_host("192.168.1.11"));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_and_invalid() {
        assert!(matches!(
            AuthConfig::from_yaml("ext_authentication_url: x\nbogus: 1\n"),
            Err(AuthzError::ConfigParse(_))
        ));
        assert!(matches!(
            AuthConfig::from_yaml("ext_authentication_url: x\ntoken_life: 0\n"),
            Err(AuthzError::InvalidSetting { name: "token_life", .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.yaml");
        std::fs::write(&path, "ext_authentication_url: https://idp.example.com/\n").unwrap();
        let config = AuthConfig::from_file(&path).unwrap();
        assert_eq!(config.ext_authentication_url(), "https://idp.example.com/");

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(
            AuthConfig::from_file(&missing),
            Err(AuthzError::Io(_))
        ));
    }

    #[test]
    fn test_flag_values() {
        for truthy in ["t", "TRUE", "yes", "On", "1", "y"] {
            assert!(Flag::Text(truthy.into()).is_true());
        }
        for falsy in ["f", "false", "no", "0", ""] {
            assert!(!Flag::Text(falsy.into()).is_true());
        }
        assert!(Flag::Int(1).is_true());
        assert!(!Flag::Int(0).is_true());
    }

    #[test]
    fn test_from_yaml_numeric_flag() {
        let on = AuthConfig::from_yaml("ext_authentication_url: x\nallow_overrides: 1\n").unwrap();
        assert!(on.allow_overrides());
        let off = AuthConfig::from_yaml("ext_authentication_url: x\nallow_overrides: 0\n").unwrap();
        assert!(!off.allow_overrides());
    }

    #[test]
    fn test_owns_token() {
        let config = AuthConfig::from_raw(minimal()).unwrap();
        assert!(config.owns_token("AUTH_tk123"));
        assert!(!config.owns_token("auth_tk123"));
        assert!(!config.owns_token("OTHER_tk123"));
    }
}
