//! Classification of archive entry names.

use std::collections::{BTreeMap, HashSet};

use glob::{MatchOptions, Pattern};

use crate::error::{AppCreatorError, Result};

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const META_INF: &str = "META-INF/";
const SERVICES_DIR: &str = "META-INF/services/";
const SIGNATURE_SUFFIXES: [&str; 4] = [".SF", ".DSA", ".RSA", ".EC"];

/// Entries never copied into a runner jar.
pub const IGNORED_ENTRIES: &[&str] = &[
    "META-INF/INDEX.LIST",
    "META-INF/MANIFEST.MF",
    "module-info.class",
    "META-INF/LICENSE",
    "META-INF/LICENSE.txt",
    "META-INF/LICENSE.md",
    "META-INF/LGPL-3.0.txt",
    "META-INF/ASL-2.0.txt",
    "META-INF/NOTICE",
    "META-INF/NOTICE.txt",
    "META-INF/NOTICE.md",
    "META-INF/README",
    "META-INF/README.txt",
    "META-INF/README.md",
    "META-INF/DEPENDENCIES",
    "META-INF/DEPENDENCIES.txt",
    "META-INF/beans.xml",
    "META-INF/io.netty.versions.properties",
    "META-INF/quarkus-config-roots.list",
    "META-INF/quarkus-javadoc.properties",
    "META-INF/quarkus-extension.properties",
    "META-INF/quarkus-extension.json",
    "META-INF/quarkus-extension.yaml",
    "META-INF/quarkus-deployment-dependency.graph",
    "META-INF/jandex.idx",
    "META-INF/panache-archive.marker",
    "META-INF/build.metadata",
    "LICENSE",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// The built-in ignored set plus user-configured patterns.
#[derive(Debug, Clone)]
pub struct IgnoredEntries {
    exact: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl IgnoredEntries {
    /// Union the built-in set with `user` entries, which may be glob patterns.
    ///
    /// # Errors
    ///
    /// [`AppCreatorError::Config`] for an invalid pattern.
    pub fn new(user: &[String]) -> Result<Self> {
        let mut exact: HashSet<String> = IGNORED_ENTRIES.iter().map(|s| (*s).to_string()).collect();
        let mut patterns = Vec::new();
        for entry in user {
            let entry = entry.trim_start_matches('/');
            if entry.contains(['*', '?', '[']) {
                let pattern = Pattern::new(entry).map_err(|e| {
                    AppCreatorError::Config(format!("Invalid ignored entry '{entry}': {e}"))
                })?;
                patterns.push(pattern);
            } else {
                exact.insert(entry.to_string());
            }
        }
        Ok(Self { exact, patterns })
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.exact.contains(name) || self.patterns.iter().any(|p| p.matches_with(name, MATCH_OPTIONS))
    }
}

/// Whether `name` is a jar signature file directly under `META-INF/`.
///
/// ```
/// use appc_core::runner::entries::is_signature_file;
///
/// assert!(is_signature_file("META-INF/FOO.SF"));
/// assert!(!is_signature_file("META-INF/sub/FOO.SF"));
/// assert!(!is_signature_file("FOO.RSA"));
/// ```
pub fn is_signature_file(name: &str) -> bool {
    name.strip_prefix(META_INF).is_some_and(|file| {
        !file.contains('/') && SIGNATURE_SUFFIXES.iter().any(|suffix| file.ends_with(suffix))
    })
}

/// Whether `name` is a service-provider file that must be concatenated
/// rather than copied.
pub fn is_service_file(name: &str) -> bool {
    name.len() > SERVICES_DIR.len() && name.starts_with(SERVICES_DIR)
}

/// Service-provider file contents collected from every source, in the order
/// they were found.
#[derive(Debug, Default)]
pub struct ServiceProviders {
    files: BTreeMap<String, Vec<Vec<u8>>>,
}

impl ServiceProviders {
    pub fn append(&mut self, name: &str, content: Vec<u8>) {
        self.files.entry(name.to_string()).or_default().push(content);
    }

    /// Each aggregated file: all collected contents, each followed by a newline.
    pub fn merged(self) -> impl Iterator<Item = (String, Vec<u8>)> {
        self.files.into_iter().map(|(name, blobs)| {
            let mut merged = Vec::with_capacity(blobs.iter().map(|b| b.len() + 1).sum());
            for blob in blobs {
                merged.extend_from_slice(&blob);
                merged.push(b'\n');
            }
            (name, merged)
        })
    }
}
