//! Error types for the authorization system.
//!
//! # Security Note
//! Expected authorization outcomes (expired identities, missing ACLs, empty
//! group lists) are never errors. They are ordinary `Decision` values. The
//! types here cover configuration faults, ACL header validation and malformed
//! request paths only.

use thiserror::Error;

/// Errors that can occur while configuring the engine or validating ACLs.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A mandatory configuration setting was not provided.
    ///
    /// The engine cannot start without it.
    #[error("Missing configuration setting: {0}")]
    MissingSetting(&'static str),

    /// A configuration setting was present but unusable.
    #[error("Invalid configuration setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    /// The configuration document could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// The configuration file could not be read.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An ACL header value was rejected by `clean_acl`.
    #[error("Invalid ACL: {0}")]
    InvalidAcl(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// A request path that does not satisfy the segment-count rules of the caller.
///
/// Which HTTP status this maps to depends on the stage that detected it, so
/// it is kept separate from `AuthzError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid path: {path}")]
pub struct MalformedPath {
    pub path: String,
}

impl MalformedPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}
