//! The deferred authorization hook and the request extensions the gate hands
//! to the downstream storage service.
//!
//! The gate cannot authorize a data-plane request by itself: the container
//! ACL and sync key live in the storage layer. Instead it installs an
//! [`AuthorizationHook`] in the request extensions. Once the storage service
//! has loaded the target's metadata it calls [`enforce_authorization`], which
//! removes the hook and runs it exactly once.

use std::net::SocketAddr;

use authz::{acl::clean_acl, AuthzEngine, Decision, Identity, RequestContext};
use axum::{extract::ConnectInfo, http::Request};
use tracing::debug;

use crate::headers::{decoded_path, forwarded_client, header_str, CONTAINER_SYNC_KEY, TIMESTAMP};

/// Authorization deferred until the target resource is known.
#[derive(Debug, Clone)]
pub enum AuthorizationHook {
    /// Full policy evaluation for a caller resolved from the identity cache.
    Engine {
        engine: AuthzEngine,
        identity: Identity,
    },
    /// Deny-by-default for requests carrying no token this gate owns.
    DenyAll { engine: AuthzEngine },
}

impl AuthorizationHook {
    /// Consumes the hook and decides the access described by `ctx`.
    pub fn authorize(self, ctx: RequestContext) -> Decision {
        match self {
            AuthorizationHook::Engine { engine, identity } => {
                engine.authorize(&ctx.with_identity(Some(identity)))
            }
            AuthorizationHook::DenyAll { engine } => engine.denied_response(ctx.identity.as_ref()),
        }
    }
}

/// Validates `X-Container-Read`/`X-Container-Write` values before the
/// storage layer persists them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AclCleaner;

impl AclCleaner {
    pub fn clean(&self, header: &str, value: &str) -> authz::Result<String> {
        clean_acl(header, value)
    }
}

/// The resolved caller, installed for authenticated requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser(pub Identity);

/// Marks a request made by a reseller admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResellerRequest;

/// Marks a request authorized with administrative privilege on its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwiftOwner;

/// Set by an earlier layer to skip the gate entirely. Only honored when
/// `allow_overrides` is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizeOverride;

/// Storage-layer metadata of the resource being accessed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// Raw ACL descriptor of the container.
    pub acl: Option<String>,
    /// Container sync key.
    pub sync_key: Option<String>,
}

impl ResourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }

    pub fn with_sync_key(mut self, key: impl Into<String>) -> Self {
        self.sync_key = Some(key.into());
        self
    }
}

/// Builds the authorization context for `request` against `resource`.
pub fn context_from_request<B>(request: &Request<B>, resource: ResourceMetadata) -> RequestContext {
    let headers = request.headers();
    let mut ctx = RequestContext::new(request.method().as_str(), decoded_path(request.uri()))
        .with_identity(request.extensions().get::<RemoteUser>().map(|u| u.0.clone()))
        .with_timestamp(headers.contains_key(TIMESTAMP));

    ctx.referer = header_str(headers, "referer").map(str::to_string);
    ctx.sync_key_header = header_str(headers, CONTAINER_SYNC_KEY).map(str::to_string);
    ctx.remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    ctx.forwarded_client = forwarded_client(headers);
    ctx.acl = resource.acl;
    ctx.resource_sync_key = resource.sync_key;
    ctx
}

/// Runs the hook the gate installed on `request`, if any.
///
/// A request without a hook was let through by an override and is allowed.
/// An owner decision marks the request with [`SwiftOwner`].
pub fn enforce_authorization<B>(request: &mut Request<B>, resource: ResourceMetadata) -> Decision {
    let Some(hook) = request.extensions_mut().remove::<AuthorizationHook>() else {
        debug!("No authorization hook installed, allowing");
        return Decision::allow();
    };

    let ctx = context_from_request(request, resource);
    let decision = hook.authorize(ctx);
    if decision.is_owner() {
        request.extensions_mut().insert(SwiftOwner);
    }
    decision
}
