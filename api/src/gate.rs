//! Per-request gating: override, token issuance routing, token resolution
//! and the anonymous fallback.
//!
//! [`RequestGate::handle`] never touches the request itself. It returns a
//! [`GateOutcome`] which the middleware applies in one step, so a failure
//! half way through leaves no partial state on the request.

use std::sync::Arc;

use authz::{path::split_path, AuthConfig, AuthzEngine, Decision, Identity};
use axum::http::{Extensions, Request};
use identity_cache::{IdentityCache, TokenStore};
use tracing::debug;

use crate::error::GateResult;
use crate::headers::{decoded_path, extract_token};
use crate::hook::{AclCleaner, AuthorizationHook, AuthorizeOverride, RemoteUser, ResellerRequest};

/// Versions accepted by the token issuance sub-API.
const AUTH_VERSIONS: [&str; 3] = ["v1", "v1.0", "auth"];

/// The parts of an inbound request the gate looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateRequest {
    pub method: String,
    /// Percent-decoded path.
    pub path: String,
    pub token: Option<String>,
    /// An earlier layer asked to skip authorization.
    pub authorize_override: bool,
    /// An earlier layer already installed an authorization hook.
    pub hook_installed: bool,
}

impl GateRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_override(mut self, authorize_override: bool) -> Self {
        self.authorize_override = authorize_override;
        self
    }

    pub fn with_hook_installed(mut self, installed: bool) -> Self {
        self.hook_installed = installed;
        self
    }

    pub fn from_http<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().as_str().to_string(),
            path: decoded_path(request.uri()),
            token: extract_token(request.headers()),
            authorize_override: request.extensions().get::<AuthorizeOverride>().is_some(),
            hook_installed: request.extensions().get::<AuthorizationHook>().is_some(),
        }
    }
}

/// What the downstream service receives for an admitted request.
#[derive(Debug, Clone)]
pub struct Admission {
    /// `None` when an earlier layer's hook must be kept.
    pub hook: Option<AuthorizationHook>,
    pub identity: Option<Identity>,
    pub reseller_request: bool,
    pub acl_cleaner: Option<AclCleaner>,
}

impl Admission {
    /// Writes the admission into the request extensions.
    pub fn install(self, extensions: &mut Extensions) {
        if let Some(hook) = self.hook {
            extensions.insert(hook);
        }
        if let Some(identity) = self.identity {
            extensions.insert(RemoteUser(identity));
        }
        if self.reseller_request {
            extensions.insert(ResellerRequest);
        }
        if let Some(cleaner) = self.acl_cleaner {
            extensions.insert(cleaner);
        }
    }
}

#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// Answer the request now.
    Respond(Decision),
    /// Hand the request downstream with an authorization hook.
    Proceed(Admission),
    /// Override honored: pass through untouched.
    Bypass,
}

/// Top-level request classifier.
#[derive(Debug, Clone)]
pub struct RequestGate {
    config: Arc<AuthConfig>,
    engine: AuthzEngine,
    cache: IdentityCache,
}

impl RequestGate {
    pub fn new(config: impl Into<Arc<AuthConfig>>, cache: IdentityCache) -> Self {
        let config = config.into();
        Self {
            engine: AuthzEngine::new(config.clone()),
            config,
            cache,
        }
    }

    /// Builds the gate and its identity cache over `store`.
    pub fn with_store(config: impl Into<Arc<AuthConfig>>, store: Option<Arc<dyn TokenStore>>) -> Self {
        let config = config.into();
        let cache = IdentityCache::new(config.reseller_prefix(), store)
            .with_lookup_timeout(config.cache_timeout());
        Self::new(config, cache)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn engine(&self) -> &AuthzEngine {
        &self.engine
    }

    pub async fn handle(&self, request: &GateRequest) -> GateResult<GateOutcome> {
        if request.authorize_override && self.config.allow_overrides() {
            debug!("Authorization override honored for {}", request.path);
            return Ok(GateOutcome::Bypass);
        }

        if request.path.starts_with(self.config.auth_prefix()) {
            return Ok(GateOutcome::Respond(self.handle_auth_request(request)));
        }

        if let Some(token) = request
            .token
            .as_deref()
            .filter(|token| self.config.owns_token(token))
        {
            return self.handle_token(request, token).await;
        }

        // Anonymous access to an account namespace this gate may own.
        if let Err(e) = split_path(&request.path, 1, 2, true) {
            debug!("Anonymous request rejected: {}", e);
            return Ok(GateOutcome::Respond(Decision::NotFound));
        }
        let hook = (!request.hook_installed).then(|| AuthorizationHook::DenyAll {
            engine: self.engine.clone(),
        });
        Ok(GateOutcome::Proceed(Admission {
            hook,
            identity: None,
            reseller_request: false,
            acl_cleaner: None,
        }))
    }

    async fn handle_token(&self, request: &GateRequest, token: &str) -> GateResult<GateOutcome> {
        let Some(identity) = self.cache.resolve(token).await?.and_then(Identity::new) else {
            debug!("Token unresolvable or expired, redirecting");
            return Ok(GateOutcome::Respond(Decision::RedirectExternal));
        };

        debug!(
            user = identity.user(),
            method = %request.method,
            path = %request.path,
            "Authenticated request"
        );
        let reseller_request = identity.has_group_lowercase(&self.config.reseller_admin_group());
        Ok(GateOutcome::Proceed(Admission {
            hook: Some(AuthorizationHook::Engine {
                engine: self.engine.clone(),
                identity: identity.clone(),
            }),
            identity: Some(identity),
            reseller_request,
            acl_cleaner: Some(AclCleaner),
        }))
    }

    /// Token issuance requests. Every valid shape is handed to the external
    /// identity provider.
    fn handle_auth_request(&self, request: &GateRequest) -> Decision {
        // Keep the leading slash of the remainder.
        let rest = &request.path[self.config.auth_prefix().len() - 1..];

        let segments = match split_path(rest, 1, 4, true) {
            Ok(segments) => segments,
            Err(e) => {
                debug!("Auth request rejected: {}", e);
                return Decision::NotFound;
            }
        };
        let version = segments[0].as_deref().unwrap_or_default();
        if !AUTH_VERSIONS.contains(&version) || request.method != "GET" {
            return Decision::BadRequest;
        }

        let segments = match split_path(rest, 1, 3, true) {
            Ok(segments) => segments,
            Err(_) => return Decision::NotFound,
        };
        let first = segments[0].as_deref();
        let third = segments[2].as_deref();
        if (first == Some("v1") && third == Some("auth")) || matches!(first, Some("auth" | "v1.0")) {
            Decision::RedirectExternal
        } else {
            Decision::BadRequest
        }
    }
}
