//! Container ACL descriptors.
//!
//! A descriptor is a comma-separated list. Entries carrying the `.r:`
//! designator are referrer rules; everything else is a group name. A referrer
//! rule may be negated with a leading `-` and its pattern is `*`, `*.domain`
//! (stored as `.domain` once cleaned) or an exact host:
//!
//! ```text
//! .r:*,.r:-evil.example.com,.rlistings,AUTH_bob
//! ```

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{AuthzError, Result};

/// Designator that marks a referrer entry in a stored descriptor.
pub const REFERRER_DESIGNATOR: &str = ".r:";

/// Group that lets referrer-allowed callers list a container.
pub const LISTINGS_GROUP: &str = ".rlistings";

/// One referrer entry of an ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerRule {
    pub pattern: String,
    pub negated: bool,
}

impl ReferrerRule {
    pub fn new(pattern: impl Into<String>, negated: bool) -> Self {
        Self {
            pattern: pattern.into(),
            negated,
        }
    }

    /// Parses the part after `.r:`, e.g. `-evil.example.com`.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(pattern) => Self::new(pattern, true),
            None => Self::new(raw, false),
        }
    }

    /// Whether this rule applies to a request with the given referer.
    ///
    /// `host` is the lowercased host of `referer`, when it has one.
    fn matches(&self, referer: &str, host: Option<&str>) -> bool {
        if self.pattern == "*" {
            return !referer.is_empty();
        }
        let Some(host) = host else {
            return false;
        };
        let domain = self
            .pattern
            .strip_prefix("*.")
            .or_else(|| self.pattern.strip_prefix('.'));
        match domain {
            Some(domain) if !domain.is_empty() => {
                host == domain
                    || host
                        .strip_suffix(domain)
                        .is_some_and(|sub| sub.ends_with('.'))
            }
            Some(_) => false,
            None => host == self.pattern,
        }
    }
}

/// A parsed ACL descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acl {
    /// Referrer rules, in descriptor order.
    pub referrers: Vec<ReferrerRule>,
    pub groups: BTreeSet<String>,
}

impl Acl {
    /// Parses a stored descriptor. An absent descriptor is an empty ACL.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut acl = Acl::default();
        let Some(raw) = raw else {
            return acl;
        };

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.strip_prefix(REFERRER_DESIGNATOR) {
                Some(rule) => acl.referrers.push(ReferrerRule::parse(rule)),
                None => {
                    acl.groups.insert(entry.to_string());
                }
            }
        }
        acl
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Whether referrer-allowed callers may list the container.
    pub fn allows_listings(&self) -> bool {
        self.has_group(LISTINGS_GROUP)
    }

    pub fn is_empty(&self) -> bool {
        self.referrers.is_empty() && self.groups.is_empty()
    }
}

/// Evaluates referrer rules against a `Referer` header value.
///
/// Every rule is checked in order and the last one that matches decides.
/// With no matching rule, or no rules at all, access is refused.
pub fn referrer_allowed(referer: Option<&str>, rules: &[ReferrerRule]) -> bool {
    let referer = referer.unwrap_or_default();
    let host = referer_host(referer);

    let mut allowed = false;
    for rule in rules {
        if rule.matches(referer, host.as_deref()) {
            allowed = !rule.negated;
        }
    }
    allowed
}

fn referer_host(referer: &str) -> Option<String> {
    if referer.is_empty() {
        return None;
    }
    let parsed = match referer.strip_prefix("//") {
        // Scheme-relative: the authority still names the host.
        Some(rest) => url::Url::parse(&format!("http://{rest}")),
        None => url::Url::parse(referer),
    };
    parsed
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Validates and normalizes an ACL header value before it is stored.
///
/// Referrer designators (`.r`, `.ref`, `.referer`, `.referrer`) are rewritten
/// to `.r:`, a leading `*` on a domain pattern is dropped and empty entries
/// are removed. `name` is the header name; referrers are refused in write
/// ACLs.
pub fn clean_acl(name: &str, value: &str) -> Result<String> {
    let name = name.to_ascii_lowercase();
    let mut values = Vec::new();

    for raw in value.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        let Some((first, second)) = raw.split_once(':') else {
            values.push(raw.to_string());
            continue;
        };
        let first = first.trim();
        if !first.starts_with('.') {
            values.push(raw.to_string());
            continue;
        }
        if !matches!(first, ".r" | ".ref" | ".referer" | ".referrer") {
            return Err(AuthzError::InvalidAcl(format!(
                "Unknown designator {first:?} in ACL: {raw:?}"
            )));
        }
        if name.contains("write") {
            return Err(AuthzError::InvalidAcl(format!(
                "Referrers not allowed in write ACL: {raw:?}"
            )));
        }

        let mut host = second.trim();
        let negated = match host.strip_prefix('-') {
            Some(rest) => {
                host = rest.trim();
                true
            }
            None => false,
        };
        if host != "*" {
            if let Some(rest) = host.strip_prefix('*') {
                host = rest.trim();
            }
        }
        if host.is_empty() || host == "." {
            return Err(AuthzError::InvalidAcl(format!(
                "No host/domain value after referrer designation in ACL: {raw:?}"
            )));
        }
        values.push(format!(
            "{REFERRER_DESIGNATOR}{}{host}",
            if negated { "-" } else { "" }
        ));
    }

    let cleaned = values.join(",");
    debug!(header = %name, acl = %cleaned, "Cleaned ACL header");
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(items: &[(&str, bool)]) -> Vec<ReferrerRule> {
        items
            .iter()
            .map(|(p, n)| ReferrerRule::new(*p, *n))
            .collect()
    }

    #[test]
    fn test_parse_absent_and_empty() {
        assert!(Acl::parse(None).is_empty());
        assert!(Acl::parse(Some("")).is_empty());
        assert!(Acl::parse(Some(" , ,")).is_empty());
    }

    #[test]
    fn test_parse_mixed_descriptor() {
        let acl = Acl::parse(Some(".r:*,.r:-evil.example.com,.rlistings,AUTH_bob,admins"));
        assert_eq!(
            acl.referrers,
            rules(&[("*", false), ("evil.example.com", true)])
        );
        assert!(acl.has_group("AUTH_bob"));
        assert!(acl.has_group("admins"));
        assert!(acl.allows_listings());
        assert!(!acl.has_group(".r:*"));
    }

    #[test]
    fn test_last_matching_rule_wins() {
        let acl_rules = rules(&[("*.example.com", false), ("evil.example.com", true)]);
        assert!(!referrer_allowed(Some("http://evil.example.com/x"), &acl_rules));
        assert!(referrer_allowed(Some("http://a.example.com/x"), &acl_rules));

        let reversed = rules(&[("evil.example.com", true), ("*.example.com", false)]);
        assert!(referrer_allowed(Some("http://evil.example.com/x"), &reversed));
    }

    #[test]
    fn test_wildcard_requires_referer() {
        let acl_rules = rules(&[("*", false)]);
        assert!(referrer_allowed(Some("http://anything.test/"), &acl_rules));
        assert!(referrer_allowed(Some("not a url"), &acl_rules));
        assert!(!referrer_allowed(Some(""), &acl_rules));
        assert!(!referrer_allowed(None, &acl_rules));
    }

    #[test]
    fn test_domain_patterns() {
        let star = rules(&[("*.example.com", false)]);
        let dotted = rules(&[(".example.com", false)]);
        for acl_rules in [&star, &dotted] {
            assert!(referrer_allowed(Some("http://example.com/"), acl_rules));
            assert!(referrer_allowed(Some("https://a.b.example.com/p"), acl_rules));
            assert!(!referrer_allowed(Some("http://badexample.com/"), acl_rules));
            assert!(!referrer_allowed(Some("http://example.org/"), acl_rules));
        }
    }

    #[test]
    fn test_exact_pattern_and_host_case() {
        let acl_rules = rules(&[("www.example.com", false)]);
        assert!(referrer_allowed(Some("http://WWW.Example.COM/"), &acl_rules));
        assert!(!referrer_allowed(Some("http://a.www.example.com/"), &acl_rules));
    }

    #[test]
    fn test_scheme_relative_referer_has_host() {
        let acl_rules = rules(&[("*.example.com", false)]);
        assert!(referrer_allowed(Some("//www.example.com/x"), &acl_rules));
        assert!(!referrer_allowed(Some("//www.example.org/x"), &acl_rules));
        assert!(!referrer_allowed(Some("/relative/path"), &acl_rules));
    }

    #[test]
    fn test_no_rules_denies() {
        assert!(!referrer_allowed(Some("http://example.com/"), &[]));
        assert!(!referrer_allowed(None, &[]));
    }

    #[test]
    fn test_negated_wildcard() {
        let acl_rules = rules(&[("example.com", false), ("*", true)]);
        assert!(!referrer_allowed(Some("http://example.com/"), &acl_rules));
    }

    #[test]
    fn test_clean_acl_normalizes_referrers() {
        assert_eq!(
            clean_acl("X-Container-Read", ".r:*").unwrap(),
            ".r:*"
        );
        assert_eq!(
            clean_acl("X-Container-Read", ".referrer: *.example.com ,  AUTH_bob,,").unwrap(),
            ".r:.example.com,AUTH_bob"
        );
        assert_eq!(
            clean_acl("X-Container-Read", ".ref:-evil.example.com").unwrap(),
            ".r:-evil.example.com"
        );
        assert_eq!(
            clean_acl("X-Container-Read", "AUTH_bob:alice, .rlistings").unwrap(),
            "AUTH_bob:alice,.rlistings"
        );
    }

    #[test]
    fn test_clean_acl_rejects() {
        assert!(matches!(
            clean_acl("X-Container-Write", ".r:*"),
            Err(AuthzError::InvalidAcl(_))
        ));
        assert!(clean_acl("X-Container-Read", ".r:").is_err());
        assert!(clean_acl("X-Container-Read", ".r:-").is_err());
        assert!(clean_acl("X-Container-Read", ".r:*.").is_err());
        assert!(clean_acl("X-Container-Read", ".unknown:thing").is_err());
    }

    #[test]
    fn test_cleaned_acl_round_trips_through_parse() {
        let cleaned = clean_acl("X-Container-Read", ".r:*.example.com,.r:-bad.example.com").unwrap();
        let acl = Acl::parse(Some(&cleaned));
        assert!(referrer_allowed(Some("http://ok.example.com/"), &acl.referrers));
        assert!(!referrer_allowed(Some("http://bad.example.com/"), &acl.referrers));
    }
}
