//! Name identity and case-folding rules.
//!
//! All name comparisons in a snapshot go through one [`NameMatcher`] so the
//! active dialect's case-folding rule is applied exactly once, in one place.

use serde::{Deserialize, Serialize};

use crate::vendor::VendorId;

/// Case-folding comparator for object names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMatcher {
    case_sensitive: bool,
}

impl NameMatcher {
    /// Matcher for the given vendor's identifier rules.
    pub fn for_vendor(vendor: &VendorId) -> Self {
        Self {
            case_sensitive: vendor.case_sensitive_names(),
        }
    }

    /// Case-sensitive matcher (for dialects that preserve identifier case).
    pub fn case_sensitive() -> Self {
        Self {
            case_sensitive: true,
        }
    }

    /// Case-insensitive matcher.
    pub fn case_insensitive() -> Self {
        Self {
            case_sensitive: false,
        }
    }

    /// Compare two names under the dialect's rule.
    pub fn eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    /// Fold a name into its canonical lookup key.
    pub fn fold(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        }
    }

    /// Compare two optional names (absent sorts before present).
    pub fn eq_opt(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.eq(a, b),
            _ => false,
        }
    }
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::case_insensitive()
    }
}

/// Deterministic ordering key for a name.
///
/// Folds case first so ordering is stable across vendors that report the
/// same schema with different identifier casing, then breaks ties on the
/// raw spelling.
pub fn order_key(name: &str) -> (String, String) {
    (name.to_ascii_lowercase(), name.to_string())
}

/// Compare two names deterministically (case-folded, raw tie-break).
pub fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    order_key(a).cmp(&order_key(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_case_insensitive_eq() {
        let m = NameMatcher::case_insensitive();
        assert!(m.eq("Users", "USERS"));
        assert!(m.eq("users", "users"));
        assert!(!m.eq("users", "orders"));
    }

    #[test]
    fn test_case_sensitive_eq() {
        let m = NameMatcher::case_sensitive();
        assert!(!m.eq("Users", "USERS"));
        assert!(m.eq("Users", "Users"));
    }

    #[test]
    fn test_fold() {
        assert_eq!(NameMatcher::case_insensitive().fold("MyTable"), "mytable");
        assert_eq!(NameMatcher::case_sensitive().fold("MyTable"), "MyTable");
    }

    #[test]
    fn test_eq_opt() {
        let m = NameMatcher::case_insensitive();
        assert!(m.eq_opt(None, None));
        assert!(m.eq_opt(Some("A"), Some("a")));
        assert!(!m.eq_opt(Some("a"), None));
    }

    #[test]
    fn test_compare_names_deterministic() {
        assert_eq!(compare_names("alpha", "BETA"), Ordering::Less);
        // Same folded key: raw spelling breaks the tie, stably.
        assert_eq!(compare_names("Users", "users"), Ordering::Less);
        assert_eq!(compare_names("users", "Users"), Ordering::Greater);
        assert_eq!(compare_names("users", "users"), Ordering::Equal);
    }
}
