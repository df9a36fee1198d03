//! Maven-style version ordering and update bounds.
//!
//! Versions are split into numeric and qualifier items on `.`, `-`, `_` and on
//! digit/letter transitions. Numbers compare numerically, qualifiers by their
//! well-known rank (`alpha < beta < milestone < rc < snapshot < release < sp`),
//! and a number always sorts above a qualifier at the same position. Trailing
//! zeros and release qualifiers are insignificant, so `1.0` equals `1` and
//! `1.0-final`.

use std::cmp::Ordering;
use std::fmt;

use crate::policy::UpdateNumber;

/// Failure to derive an update bound from a version string.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    /// A component that must be numeric is not.
    #[error("Failed to parse {component} version of '{version}': '{value}' is not a number")]
    NonNumeric {
        /// The full version string.
        version: String,
        /// `major` or `minor`.
        component: &'static str,
        /// The offending text.
        value: String,
    },

    /// The version has no major component at all.
    #[error("Version '{version}' has no major component")]
    MissingMajor {
        /// The full version string.
        version: String,
    },

    /// The next major or minor number does not fit in a `u64`.
    #[error("Cannot bump the {component} version of '{version}': too large")]
    Overflow {
        /// The full version string.
        version: String,
        /// `major` or `minor`.
        component: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Digits with leading zeros stripped, compared by length then text so
    /// arbitrarily long numbers still order correctly.
    Number(String),
    Qualifier(String),
}

const RELEASE_RANK: usize = 5;

fn qualifier_rank(q: &str) -> usize {
    match q {
        "alpha" | "a" => 0,
        "beta" | "b" => 1,
        "milestone" | "m" => 2,
        "rc" | "cr" => 3,
        "snapshot" => 4,
        "" | "ga" | "final" | "release" => RELEASE_RANK,
        "sp" => 6,
        _ => 7,
    }
}

fn is_release_qualifier(q: &str) -> bool {
    qualifier_rank(q) == RELEASE_RANK
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    qualifier_rank(a)
        .cmp(&qualifier_rank(b))
        .then_with(|| a.cmp(b))
}

fn compare_items(a: Option<&Item>, b: Option<&Item>) -> Ordering {
    match (a, b) {
        (Some(Item::Number(x)), Some(Item::Number(y))) => compare_numbers(x, y),
        (Some(Item::Number(_)), Some(Item::Qualifier(_))) => Ordering::Greater,
        (Some(Item::Qualifier(_)), Some(Item::Number(_))) => Ordering::Less,
        (Some(Item::Qualifier(x)), Some(Item::Qualifier(y))) => compare_qualifiers(x, y),
        (None, Some(Item::Number(n))) => {
            if n.is_empty() {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        (None, Some(Item::Qualifier(q))) => RELEASE_RANK.cmp(&qualifier_rank(q)),
        (Some(_), None) => compare_items(b, a).reverse(),
        (None, None) => Ordering::Equal,
    }
}

fn flush(current: &mut String, digits: bool, items: &mut Vec<Item>) {
    if current.is_empty() {
        return;
    }
    if digits {
        items.push(Item::Number(current.trim_start_matches('0').to_string()));
    } else {
        items.push(Item::Qualifier(current.to_ascii_lowercase()));
    }
    current.clear();
}

fn tokenize(version: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut digits = false;

    for ch in version.chars() {
        if matches!(ch, '.' | '-' | '_') {
            flush(&mut current, digits, &mut items);
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != digits {
            flush(&mut current, digits, &mut items);
        }
        digits = is_digit;
        current.push(ch);
    }
    flush(&mut current, digits, &mut items);

    // Trailing zeros and release qualifiers carry no ordering information.
    while let Some(last) = items.last() {
        let insignificant = match last {
            Item::Number(n) => n.is_empty(),
            Item::Qualifier(q) => is_release_qualifier(q),
        };
        if !insignificant {
            break;
        }
        items.pop();
    }
    items
}

/// A version string with Maven ordering semantics.
///
/// ```
/// use appc_schema::MavenVersion;
///
/// let v = MavenVersion::new;
/// assert!(v("1.2.3") < v("1.10"));
/// assert!(v("2.0-alpha1") < v("2.0"));
/// assert!(v("1.9.9") < v("2.alpha"));
/// assert_eq!(v("1.0"), v("1"));
/// ```
#[derive(Debug, Clone)]
pub struct MavenVersion {
    raw: String,
    items: Vec<Item>,
}

impl MavenVersion {
    /// Parse a version. Every string is a valid version; unparseable text
    /// simply becomes qualifiers.
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            items: tokenize(raw),
        }
    }

    /// The version text as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.items.len().max(other.items.len());
        for i in 0..len {
            let ord = compare_items(self.items.get(i), other.items.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The numeric component at `index`, or `None` when the version is too short.
fn numeric_component(
    version: &str,
    index: usize,
    component: &'static str,
) -> Result<Option<u64>, VersionError> {
    let Some(value) = version.split(['.', '-']).nth(index).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|_| VersionError::NonNumeric {
            version: version.to_string(),
            component,
            value: value.to_string(),
        })
}

fn bump(version: &str, value: u64, component: &'static str) -> Result<u64, VersionError> {
    value.checked_add(1).ok_or_else(|| VersionError::Overflow {
        version: version.to_string(),
        component,
    })
}

/// Exclusive upper bound an update of `version` may reach under `number`.
///
/// `Major` is unbounded. `Minor` stays below the next major's first alpha,
/// `Micro` below the next minor's first alpha.
///
/// # Errors
///
/// Returns [`VersionError`] if the major (or, for `Micro`, minor) component
/// is not numeric, or the major is absent. A missing minor counts as `0`.
///
/// ```
/// use appc_schema::{update_bound, UpdateNumber};
///
/// assert_eq!(update_bound("1.2.3", UpdateNumber::Major).unwrap(), None);
/// assert_eq!(update_bound("1.2.3", UpdateNumber::Minor).unwrap().as_deref(), Some("2.alpha"));
/// assert_eq!(update_bound("1.2.3", UpdateNumber::Micro).unwrap().as_deref(), Some("1.3.alpha"));
/// assert!(update_bound("x.2.3", UpdateNumber::Minor).is_err());
/// ```
pub fn update_bound(version: &str, number: UpdateNumber) -> Result<Option<String>, VersionError> {
    if number == UpdateNumber::Major {
        return Ok(None);
    }
    let major = numeric_component(version, 0, "major")?.ok_or_else(|| {
        VersionError::MissingMajor {
            version: version.to_string(),
        }
    })?;
    if number == UpdateNumber::Minor {
        return Ok(Some(format!("{}.alpha", bump(version, major, "major")?)));
    }
    let minor = numeric_component(version, 1, "minor")?.unwrap_or(0);
    Ok(Some(format!("{major}.{}.alpha", bump(version, minor, "minor")?)))
}
