//! Request path splitting for `/v1/<account>/<container>/<object...>` paths.
//!
//! `split_path` keeps the exact segment-count rules object-storage clients
//! rely on and reports violations as a `MalformedPath` value instead of
//! unwinding.

use crate::error::MalformedPath;

/// Splits `path` into between `minsegs` and `maxsegs` segments.
///
/// The path must start with `/`. The first `minsegs` segments must be
/// non-empty. The returned vector always has `maxsegs` entries: segments
/// that were not present are `None`, segments that were present but empty
/// (e.g. a trailing slash) are `Some("")`.
///
/// With `rest_with_last`, the final segment absorbs everything after it,
/// slashes included. Without it, at most one trailing slash is tolerated.
pub fn split_path(
    path: &str,
    minsegs: usize,
    maxsegs: usize,
    rest_with_last: bool,
) -> Result<Vec<Option<String>>, MalformedPath> {
    debug_assert!(minsegs <= maxsegs, "minsegs > maxsegs: {minsegs} > {maxsegs}");
    let min = minsegs + 1;
    let max = maxsegs + 1;

    let segs: Vec<&str> = if rest_with_last {
        path.splitn(max, '/').collect()
    } else {
        path.splitn(max + 1, '/').collect()
    };
    let count = segs.len();

    let too_many = if rest_with_last {
        count > max
    } else {
        count > max + 1 || (count == max + 1 && !segs[max].is_empty())
    };
    let missing_required = segs.iter().take(min).skip(1).any(|s| s.is_empty());

    if !segs[0].is_empty() || count < min || too_many || missing_required {
        return Err(MalformedPath::new(path));
    }

    let mut out: Vec<Option<String>> = segs
        .iter()
        .skip(1)
        .take(max - 1)
        .map(|s| Some((*s).to_string()))
        .collect();
    out.resize(max - 1, None);
    Ok(out)
}

/// A data-plane path: `/<version>/<account>[/<container>[/<object>]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub version: String,
    /// May be empty when the path is `/<version>/`.
    pub account: String,
    pub container: Option<String>,
    /// Everything after the container, slashes included.
    pub object: Option<String>,
}

impl ParsedPath {
    /// Parses a path into one to four segments, the last absorbing the rest.
    pub fn parse(path: &str) -> Result<Self, MalformedPath> {
        let mut segs = split_path(path, 1, 4, true)?.into_iter();
        let mut next = || segs.next().flatten();

        let version = next().unwrap_or_default();
        let account = next().unwrap_or_default();
        let container = next().filter(|s| !s.is_empty());
        let object = next().filter(|s| !s.is_empty());

        Ok(Self {
            version,
            account,
            container,
            object,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(items: &[Option<&str>]) -> Vec<Option<String>> {
        items.iter().map(|s| s.map(str::to_string)).collect()
    }

    #[test]
    fn test_split_path_exact() {
        assert_eq!(split_path("/a", 1, 1, false).unwrap(), segs(&[Some("a")]));
        assert_eq!(
            split_path("/a/c", 2, 2, false).unwrap(),
            segs(&[Some("a"), Some("c")])
        );
        assert_eq!(
            split_path("/a/c", 1, 3, false).unwrap(),
            segs(&[Some("a"), Some("c"), None])
        );
    }

    #[test]
    fn test_split_path_rejects() {
        assert!(split_path("", 1, 1, false).is_err());
        assert!(split_path("a", 1, 1, false).is_err());
        assert!(split_path("/", 1, 1, false).is_err());
        assert!(split_path("//", 1, 1, false).is_err());
        assert!(split_path("/a/c", 1, 1, false).is_err());
        assert!(split_path("/a/c/o", 1, 2, false).is_err());
        assert!(split_path("/a//o", 2, 3, false).is_err());
    }

    #[test]
    fn test_split_path_trailing_slash() {
        assert_eq!(split_path("/a/", 1, 1, false).unwrap(), segs(&[Some("a")]));
        assert_eq!(
            split_path("/a/", 2, 3, false).unwrap_err(),
            MalformedPath::new("/a/")
        );
        assert_eq!(
            split_path("/a/c/", 2, 2, false).unwrap(),
            segs(&[Some("a"), Some("c")])
        );
    }

    #[test]
    fn test_split_path_rest_with_last() {
        assert_eq!(
            split_path("/a/c/o/r", 2, 3, true).unwrap(),
            segs(&[Some("a"), Some("c"), Some("o/r")])
        );
        assert_eq!(
            split_path("/a/c", 2, 3, true).unwrap(),
            segs(&[Some("a"), Some("c"), None])
        );
        assert_eq!(
            split_path("/a/c/", 2, 3, true).unwrap(),
            segs(&[Some("a"), Some("c"), Some("")])
        );
        assert!(split_path("/", 1, 3, true).is_err());
    }

    #[test]
    fn test_parsed_path_full() {
        let parsed = ParsedPath::parse("/v1/AUTH_bob/photos/2024/cat.png").unwrap();
        assert_eq!(parsed.version, "v1");
        assert_eq!(parsed.account, "AUTH_bob");
        assert_eq!(parsed.container.as_deref(), Some("photos"));
        assert_eq!(parsed.object.as_deref(), Some("2024/cat.png"));
    }

    #[test]
    fn test_parsed_path_account_only() {
        let parsed = ParsedPath::parse("/v1/AUTH_bob").unwrap();
        assert_eq!(parsed.account, "AUTH_bob");
        assert!(parsed.container.is_none());
        assert!(parsed.object.is_none());

        let parsed = ParsedPath::parse("/v1/AUTH_bob/").unwrap();
        assert!(parsed.container.is_none());
    }

    #[test]
    fn test_parsed_path_empty_account() {
        let parsed = ParsedPath::parse("/v1/").unwrap();
        assert_eq!(parsed.version, "v1");
        assert!(parsed.account.is_empty());
    }

    #[test]
    fn test_parsed_path_malformed() {
        assert!(ParsedPath::parse("").is_err());
        assert!(ParsedPath::parse("/").is_err());
        assert!(ParsedPath::parse("v1/AUTH_bob").is_err());
    }
}
