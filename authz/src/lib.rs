//! Authorization engine for a Kerberos-fronted object storage gate.
//!
//! The gate resolves a caller's groups from the shared identity cache; this
//! crate decides what those groups may do to a given account, container or
//! object. Decisions are pure functions of an immutable [`AuthConfig`] and a
//! per-request [`RequestContext`], so one [`AuthzEngine`] is shared across
//! all request tasks without locking.
//!
//! # Policy Overview
//!
//! Rules are evaluated in a fixed order and the first applicable one wins:
//!
//! 1. **Path validity**: unparseable paths are `NotFound`
//! 2. **Prefix ownership**: accounts outside the reseller prefix are denied
//! 3. **Reseller admin**: owner access to every non-internal account
//! 4. **Account admin**: owner access to the caller's own account, except
//!    account-level `PUT`/`DELETE`
//! 5. **Sync key**: container sync requests from allow-listed hosts
//! 6. **OPTIONS**: always allowed
//! 7. **Referrer ACL**: objects, or listings when `.rlistings` is granted;
//!    any other referrer match is denied
//! 8. **Group ACL**: any caller group named in the container ACL
//! 9. Otherwise denied
//!
//! A denial is `Forbidden` for an identified caller and a redirect to the
//! external identity provider for an anonymous one.

pub mod acl;
pub mod config;
pub mod error;
pub mod path;
pub mod types;

use std::sync::Arc;

use acl::{referrer_allowed, Acl};
use path::ParsedPath;
use tracing::{debug, info};

pub use config::AuthConfig;
pub use error::{AuthzError, MalformedPath, Result};
pub use types::{Decision, Identity, RequestContext};

/// The core authorization engine.
///
/// # Example
///
/// ```rust
/// use authz::{AuthConfig, AuthzEngine, Decision, Identity, RequestContext};
///
/// let config = AuthConfig::from_yaml("ext_authentication_url: https://idp.example.com/").unwrap();
/// let engine = AuthzEngine::new(config);
///
/// let ctx = RequestContext::new("GET", "/v1/AUTH_bob/photos")
///     .with_identity(Identity::from_remote_user("AUTH_bob,auth_bob"));
/// assert_eq!(engine.authorize(&ctx), Decision::allow_owner());
/// ```
#[derive(Debug, Clone)]
pub struct AuthzEngine {
    config: Arc<AuthConfig>,
}

impl AuthzEngine {
    pub fn new(config: impl Into<Arc<AuthConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Decides whether the request described by `ctx` may proceed.
    pub fn authorize(&self, ctx: &RequestContext) -> Decision {
        let path = match ParsedPath::parse(&ctx.path) {
            Ok(path) => path,
            Err(e) => {
                debug!("Authorization path rejected: {}", e);
                return Decision::NotFound;
            }
        };
        let account = path.account.as_str();
        let prefix = self.config.reseller_prefix();
        let identity = ctx.identity.as_ref();

        if account.is_empty() || !account.starts_with(prefix) {
            debug!(
                "Account name: {} doesn't start with reseller_prefix: {}",
                account, prefix
            );
            return self.denied_response(identity);
        }

        let reseller_admin = self.config.reseller_admin_group();
        if identity.is_some_and(|id| id.has_group_lowercase(&reseller_admin))
            && account != prefix
            && !account[prefix.len()..].starts_with('.')
        {
            debug!(account, "Reseller admin authorizing");
            return Decision::allow_owner();
        }

        let account_level_write =
            matches!(ctx.method.as_str(), "DELETE" | "PUT") && path.container.is_none();
        // Account admin groups are matched exactly as the identity provider
        // reported them.
        let account_admin = account.to_lowercase();
        if identity.is_some_and(|id| id.has_group(&account_admin)) && !account_level_write {
            debug!(
                "User {} has admin authorizing",
                identity.map_or("-", Identity::user)
            );
            return Decision::allow_owner();
        }

        if self.sync_key_allowed(ctx) {
            debug!(account, "Allow request with container sync-key");
            return Decision::allow();
        }

        if ctx.method == "OPTIONS" {
            debug!("Allow OPTIONS request");
            return Decision::allow();
        }

        let acl = Acl::parse(ctx.acl.as_deref());

        if referrer_allowed(ctx.referer.as_deref(), &acl.referrers) {
            if path.object.is_some() || acl.allows_listings() {
                debug!(
                    "Allow authorizing {} via referer ACL",
                    ctx.referer.as_deref().unwrap_or("-")
                );
                return Decision::allow();
            }
            // A referrer grant covers objects only; it never falls through
            // to the group ACL for listings.
            return self.denied_response(identity);
        }

        let Some(identity) = identity else {
            return self.denied_response(None);
        };

        if let Some(group) = identity.groups().iter().find(|g| acl.has_group(g)) {
            debug!(
                "User {} allowed in ACL: {} authorizing",
                identity.user(),
                group
            );
            return Decision::allow();
        }

        self.denied_response(Some(identity))
    }

    /// The denial for a caller: `Forbidden` when identified, otherwise a
    /// redirect to the external identity provider.
    pub fn denied_response(&self, identity: Option<&Identity>) -> Decision {
        match identity {
            Some(identity) => {
                info!("Forbidden: user {}", identity.user());
                Decision::Forbidden
            }
            None => Decision::RedirectExternal,
        }
    }

    fn sync_key_allowed(&self, ctx: &RequestContext) -> bool {
        let Some(resource_key) = ctx.resource_sync_key.as_deref() else {
            return false;
        };
        if resource_key.is_empty() || ctx.sync_key_header.as_deref() != Some(resource_key) {
            return false;
        }
        if !ctx.has_timestamp {
            return false;
        }
        [ctx.remote_addr.as_deref(), ctx.forwarded_client.as_deref()]
            .into_iter()
            .flatten()
            .any(|addr| self.config.is_sync_host(addr))
    }
}
