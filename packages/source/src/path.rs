//! Key composition with optional prefix and suffix.

use crate::error::{Error, Result};

/// Combine a prefix, a key and a suffix into an effective path.
///
/// - Both affixes empty: the key is returned unchanged.
/// - A `/` shared across the prefix/key boundary is written once.
/// - The suffix is appended only when the key does not already end with it.
///
/// # Examples
///
/// ```rust
/// use loadstone_source::compose;
///
/// assert_eq!(compose("/srv/", "/a/b", ".txt").unwrap(), "/srv/a/b.txt");
/// assert_eq!(compose("", "a/b.txt", ".txt").unwrap(), "a/b.txt");
/// ```
pub fn compose(prefix: &str, path: &str, suffix: &str) -> Result<String> {
    if path.is_empty() {
        return Err(Error::invalid_argument("path is empty"));
    }

    if prefix.is_empty() && suffix.is_empty() {
        return Ok(path.to_string());
    }

    let mut out = String::with_capacity(prefix.len() + path.len() + suffix.len());
    out.push_str(prefix);

    match path.strip_prefix('/') {
        Some(rest) if prefix.ends_with('/') => out.push_str(rest),
        _ => out.push_str(path),
    }

    if !suffix.is_empty() && !path.ends_with(suffix) {
        out.push_str(suffix);
    }

    Ok(out)
}

/// A prefix/suffix pair applied to keys before they reach a source.
///
/// Values are trimmed on input and default to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affixes {
    prefix: String,
    suffix: String,
}

impl Affixes {
    /// Create affixes from raw (untrimmed) strings.
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            prefix: prefix.trim().to_string(),
            suffix: suffix.trim().to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.trim().to_string();
    }

    pub fn set_suffix(&mut self, suffix: &str) {
        self.suffix = suffix.trim().to_string();
    }

    /// True when neither a prefix nor a suffix is configured.
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    /// Apply the affixes to a key.
    pub fn apply(&self, key: &str) -> Result<String> {
        compose(&self.prefix, key, &self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn no_affixes_is_identity() {
        assert_eq!(compose("", "/a/b", "").unwrap(), "/a/b");
        assert_eq!(compose("", "a//b", "").unwrap(), "a//b");
    }

    #[test]
    fn collapses_separator_at_boundary() {
        assert_eq!(compose("root/", "/a", "").unwrap(), "root/a");
        assert_eq!(compose("root/", "a", "").unwrap(), "root/a");
        assert_eq!(compose("root", "/a", "").unwrap(), "root/a");
        assert_eq!(compose("root", "a", "").unwrap(), "roota");
    }

    #[test]
    fn suffix_added_once() {
        assert_eq!(compose("", "page", ".tpl").unwrap(), "page.tpl");
        assert_eq!(compose("", "page.tpl", ".tpl").unwrap(), "page.tpl");
        assert_eq!(compose("t/", "/page.tpl", ".tpl").unwrap(), "t/page.tpl");
    }

    #[test]
    fn empty_path_rejected() {
        let err = compose("a/", "", ".x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn affixes_trim_input() {
        let mut affixes = Affixes::new("  conf/ ", "\t.json\n");
        assert_eq!(affixes.prefix(), "conf/");
        assert_eq!(affixes.suffix(), ".json");
        assert_eq!(affixes.apply("app").unwrap(), "conf/app.json");

        affixes.set_prefix("");
        affixes.set_suffix("   ");
        assert!(affixes.is_empty());
        assert_eq!(affixes.apply("app").unwrap(), "app");
    }

    proptest! {
        #[test]
        fn suffix_composition_is_idempotent(
            path in "[a-z/]{1,12}",
            suffix in "(\\.[a-z]{1,4})?",
        ) {
            let once = compose("", &path, &suffix).unwrap();
            let twice = compose("", &once, &suffix).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn never_doubles_boundary_separator(
            prefix in "[a-z]{1,6}/",
            path in "/[a-z]{1,6}",
        ) {
            let composed = compose(&prefix, &path, "").unwrap();
            prop_assert!(!composed.contains("//"));
            prop_assert!(composed.starts_with(&prefix));
        }
    }
}
