//! Core authorization types: the caller identity, the per-request context the
//! engine evaluates, and the decision it returns.
//!
//! # Security Considerations
//!
//! - An `Identity` is only ever built from a cache entry written by the
//!   external authentication service. Never construct one from request
//!   headers.
//! - `RequestContext` carries two kinds of data. Some fields come from the
//!   client: the referer, sync-key header, timestamp presence and forwarded
//!   addresses. Others come from the storage layer: the ACL and the resource
//!   sync key. Only the latter are trusted.
//! - `Decision::Allow { owner: true }` grants administrative privilege on the
//!   target account. Downstream code must not widen it.

use serde::{Deserialize, Serialize};

/// The authenticated caller.
///
/// The first group is the principal's unique identifier; the remaining
/// entries are group memberships, lowercase by convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    groups: Vec<String>,
}

impl Identity {
    /// Creates an identity from an ordered group list.
    ///
    /// Returns `None` for an empty list: a record without a principal is not
    /// an identity.
    pub fn new(groups: Vec<String>) -> Option<Self> {
        if groups.is_empty() || groups[0].is_empty() {
            return None;
        }
        Some(Self { groups })
    }

    /// Parses a comma-joined group string, as stored in the identity cache.
    pub fn from_remote_user(remote_user: &str) -> Option<Self> {
        Self::new(remote_user.split(',').map(str::to_string).collect())
    }

    /// The principal's unique identifier.
    pub fn user(&self) -> &str {
        &self.groups[0]
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Membership test against a lowercase group name, ignoring the case the
    /// identity provider reported the group in.
    pub fn has_group_lowercase(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g.to_lowercase() == group)
    }

    /// The comma-joined form handed to downstream services.
    pub fn remote_user(&self) -> String {
        self.groups.join(",")
    }
}

/// Read-only view of one resource access, assembled by the transport layer.
///
/// Built with `RequestContext::new` and the `with_*` methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Percent-decoded request path, e.g. `/v1/AUTH_bob/photos/cat.png`.
    pub path: String,
    /// HTTP method, upper case.
    pub method: String,
    pub identity: Option<Identity>,
    pub referer: Option<String>,
    /// Value of the `X-Container-Sync-Key` request header.
    pub sync_key_header: Option<String>,
    /// Sync key stored on the target container by the storage layer.
    pub resource_sync_key: Option<String>,
    /// Whether an `X-Timestamp` header was sent.
    pub has_timestamp: bool,
    /// Peer address of the connection.
    pub remote_addr: Option<String>,
    /// Client address reported by `X-Cluster-Client-IP`/`X-Forwarded-For`.
    pub forwarded_client: Option<String>,
    /// Raw ACL descriptor stored on the target resource.
    pub acl: Option<String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_sync_key_header(mut self, key: impl Into<String>) -> Self {
        self.sync_key_header = Some(key.into());
        self
    }

    pub fn with_resource_sync_key(mut self, key: impl Into<String>) -> Self {
        self.resource_sync_key = Some(key.into());
        self
    }

    pub fn with_timestamp(mut self, present: bool) -> Self {
        self.has_timestamp = present;
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_forwarded_client(mut self, addr: impl Into<String>) -> Self {
        self.forwarded_client = Some(addr.into());
        self
    }

    pub fn with_acl(mut self, acl: impl Into<String>) -> Self {
        self.acl = Some(acl.into());
        self
    }
}

/// Outcome of gating or authorizing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The request may proceed. `owner` marks administrative privilege on
    /// the target account.
    Allow { owner: bool },
    Forbidden,
    /// Send the caller to the external identity provider.
    RedirectExternal,
    NotFound,
    BadRequest,
}

impl Decision {
    pub fn allow() -> Self {
        Decision::Allow { owner: false }
    }

    pub fn allow_owner() -> Self {
        Decision::Allow { owner: true }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Decision::Allow { owner: true })
    }

    /// HTTP status the transport layer emits, or `None` for pass-through.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Decision::Allow { .. } => None,
            Decision::Forbidden => Some(403),
            Decision::RedirectExternal => Some(303),
            Decision::NotFound => Some(404),
            Decision::BadRequest => Some(400),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow { owner: true } => write!(f, "allow (owner)"),
            Decision::Allow { owner: false } => write!(f, "allow"),
            Decision::Forbidden => write!(f, "forbidden"),
            Decision::RedirectExternal => write!(f, "redirect to external authentication"),
            Decision::NotFound => write!(f, "not found"),
            Decision::BadRequest => write!(f, "bad request"),
        }
    }
}
