//! JAR manifest reading, writing and synthesis.

use crate::reporter::Reporter;

pub const MANIFEST_VERSION: &str = "Manifest-Version";
pub const CLASS_PATH: &str = "Class-Path";
pub const MAIN_CLASS: &str = "Main-Class";
pub const MULTI_RELEASE: &str = "Multi-Release";
pub const IMPLEMENTATION_TITLE: &str = "Implementation-Title";
pub const IMPLEMENTATION_VERSION: &str = "Implementation-Version";

/// Longest line a manifest may contain, in bytes, excluding the line break.
const MAX_LINE: usize = 72;

/// A JAR manifest: main attributes plus per-entry sections, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Vec<(String, String)>,
    sections: Vec<Vec<(String, String)>>,
}

impl Manifest {
    /// Parse manifest bytes. Malformed lines are skipped.
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let mut manifest = Self::default();
        let mut current: Vec<(String, String)> = Vec::new();
        let mut in_main = true;

        let mut finish_block = |block: &mut Vec<(String, String)>, in_main: &mut bool| {
            if block.is_empty() {
                return;
            }
            if *in_main {
                manifest.main = std::mem::take(block);
                *in_main = false;
            } else {
                manifest.sections.push(std::mem::take(block));
            }
        };

        for line in text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)) {
            if line.is_empty() {
                finish_block(&mut current, &mut in_main);
            } else if let Some(continuation) = line.strip_prefix(' ') {
                if let Some((_, value)) = current.last_mut() {
                    value.push_str(continuation);
                }
            } else if let Some((name, value)) = line.split_once(':') {
                current.push((name.trim().to_string(), value.trim_start().to_string()));
            }
        }
        finish_block(&mut current, &mut in_main);
        manifest
    }

    /// Main attribute `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.main
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a main attribute, returning the previous value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        match self.main.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, old)) => Some(std::mem::replace(old, value)),
            None => {
                self.main.push((name.to_string(), value));
                None
            }
        }
    }

    /// Serialise with `Manifest-Version` first and 72-byte line wrapping.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        let version = self.get(MANIFEST_VERSION).unwrap_or("1.0");
        write_attribute(&mut out, MANIFEST_VERSION, version);
        for (name, value) in &self.main {
            if !name.eq_ignore_ascii_case(MANIFEST_VERSION) {
                write_attribute(&mut out, name, value);
            }
        }
        out.push_str("\r\n");
        for section in &self.sections {
            for (name, value) in section {
                write_attribute(&mut out, name, value);
            }
            out.push_str("\r\n");
        }
        out.into_bytes()
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    let line = format!("{name}: {value}");
    let mut limit = MAX_LINE;
    let mut rest = line.as_str();
    let mut first = true;
    while !rest.is_empty() {
        let mut cut = rest.len().min(limit);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if !first {
            out.push(' ');
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n");
        rest = &rest[cut..];
        first = false;
        limit = MAX_LINE - 1;
    }
}

/// What the runner jar's manifest must say.
#[derive(Debug, Clone)]
pub struct ManifestSettings<'a> {
    pub main_class: &'a str,
    /// Space-separated `lib/` entries; empty for an uber jar.
    pub class_path: &'a str,
    pub multi_release: bool,
    /// `(title, version)` to add unless already present.
    pub implementation: Option<(&'a str, &'a str)>,
}

/// Build the runner manifest on top of whatever manifest the merged sources
/// provided. Overwriting a `Class-Path` or a different `Main-Class` is
/// reported as a warning.
pub fn synthesize(existing: Option<&[u8]>, settings: &ManifestSettings<'_>, reporter: &dyn Reporter) -> Manifest {
    let mut manifest = existing.map(Manifest::parse).unwrap_or_default();
    manifest.set(MANIFEST_VERSION, "1.0");

    if let Some(old) = manifest.set(CLASS_PATH, settings.class_path) {
        reporter.warning(&format!(
            "A Class-Path entry was already defined in your MANIFEST.MF or using the [maven-jar-plugin]; it has been overwritten (was '{old}')"
        ));
    }

    if let Some(old) = manifest.set(MAIN_CLASS, settings.main_class) {
        if old != settings.main_class {
            reporter.warning(&format!(
                "A Main-Class entry was already defined in your MANIFEST.MF or using the [maven-jar-plugin]; '{old}' has been replaced by '{}'",
                settings.main_class
            ));
        }
    }

    if settings.multi_release {
        tracing::debug!("Marking the runner jar as a multi-release jar");
        manifest.set(MULTI_RELEASE, "true");
    }

    if let Some((title, version)) = settings.implementation {
        if manifest.get(IMPLEMENTATION_TITLE).is_none() {
            manifest.set(IMPLEMENTATION_TITLE, title);
        }
        if manifest.get(IMPLEMENTATION_VERSION).is_none() {
            manifest.set(IMPLEMENTATION_VERSION, version);
        }
    }
    manifest
}
