//! Scan-root bookkeeping.
//!
//! Roots are compared after normalization (unified separators, one trailing
//! separator stripped, lower-cased) but stored exactly as the user typed them.
//! The maintained set never holds two equal roots, nor a root nested inside
//! another root.

use serde::{Deserialize, Serialize};

/// Result of checking a candidate root against the current set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathValidation {
    pub is_valid: bool,
    pub is_duplicate: bool,
    /// Existing roots the candidate would be nested inside.
    pub contained_by: Vec<String>,
    /// Existing roots nested inside the candidate; adding it replaces them.
    pub contains: Vec<String>,
    pub warnings: Vec<String>,
}

/// Comparison form of a path. Never stored.
pub fn normalize_for_compare(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let trimmed = match unified.strip_suffix('/') {
        Some(rest) if !is_root(&unified) => rest.to_string(),
        _ => unified,
    };
    trimmed.to_lowercase()
}

/// `/` on unix-like systems, `c:/` style drive roots on windows.
fn is_root(unified: &str) -> bool {
    if unified == "/" {
        return true;
    }
    let bytes = unified.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// True when `child` lies strictly below `parent`. Both must be normalized.
fn is_strict_subpath(child: &str, parent: &str) -> bool {
    if child == parent {
        return false;
    }
    if parent.ends_with('/') {
        return child.starts_with(parent);
    }
    child
        .strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Checks `candidate` against `existing` without mutating anything.
pub fn validate(candidate: &str, existing: &[String]) -> PathValidation {
    let mut validation = PathValidation::default();
    // A blank path would prefix every root.
    if candidate.trim().is_empty() {
        validation.warnings.push("Scan root must not be empty".to_string());
        return validation;
    }
    let normalized = normalize_for_compare(candidate);

    for root in existing {
        let root_normalized = normalize_for_compare(root);
        if root_normalized == normalized {
            validation.is_duplicate = true;
        } else if is_strict_subpath(&normalized, &root_normalized) {
            validation.contained_by.push(root.clone());
        } else if is_strict_subpath(&root_normalized, &normalized) {
            validation.contains.push(root.clone());
        }
    }

    if validation.is_duplicate {
        validation
            .warnings
            .push(format!("{candidate} is already a scan root"));
    }
    for root in &validation.contained_by {
        validation
            .warnings
            .push(format!("{candidate} is inside existing scan root {root}"));
    }
    for root in &validation.contains {
        validation
            .warnings
            .push(format!("{root} is inside {candidate} and will be replaced"));
    }

    validation.is_valid = !validation.is_duplicate && validation.contained_by.is_empty();
    validation
}

/// Returns the root set after adding `candidate`, or `None` when it is rejected.
///
/// Roots nested inside the candidate are dropped.
pub fn add(candidate: &str, existing: &[String]) -> Option<Vec<String>> {
    let validation = validate(candidate, existing);
    if !validation.is_valid {
        return None;
    }
    let mut roots: Vec<String> = existing
        .iter()
        .filter(|root| !validation.contains.contains(root))
        .cloned()
        .collect();
    roots.push(candidate.to_string());
    Some(roots)
}

/// Ordered, invariant-preserving set of scan roots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSet {
    roots: Vec<String>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set by adding each root in turn; rejected roots are skipped.
    pub fn from_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for root in roots {
            set.add(root.as_ref());
        }
        set
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn validate(&self, candidate: &str) -> PathValidation {
        validate(candidate, &self.roots)
    }

    /// Adds `candidate` when valid. The set is untouched otherwise.
    pub fn add(&mut self, candidate: &str) -> PathValidation {
        let validation = self.validate(candidate);
        if validation.is_valid {
            self.roots
                .retain(|root| !validation.contains.contains(root));
            self.roots.push(candidate.to_string());
        }
        validation
    }

    /// Removes the root equal to `path` after normalization.
    pub fn remove(&mut self, path: &str) -> bool {
        let normalized = normalize_for_compare(path);
        let before = self.roots.len();
        self.roots
            .retain(|root| normalize_for_compare(root) != normalized);
        self.roots.len() != before
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }
}
