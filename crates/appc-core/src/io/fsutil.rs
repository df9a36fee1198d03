//! Small filesystem helpers shared by the phases.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};

use sha2::{Digest, Sha256};

/// Archive-style name of a relative path: segments joined with `/`.
///
/// Returns `None` for paths that are absolute or step outside their root.
///
/// ```
/// use appc_core::io::fsutil::entry_name;
/// use std::path::Path;
///
/// assert_eq!(entry_name(Path::new("org/acme/Greeting.class")).as_deref(), Some("org/acme/Greeting.class"));
/// assert_eq!(entry_name(Path::new("")).as_deref(), Some(""));
/// assert_eq!(entry_name(Path::new("../escape")), None);
/// ```
pub fn entry_name(relative: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(segments.join("/"))
}

/// Create `dir`, or remove everything inside it if it already exists.
pub fn create_or_empty_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    } else {
        fs::create_dir_all(dir)
    }
}

/// Grant read access to everyone.
pub fn make_world_readable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o444);
        fs::set_permissions(path, perms)
    }
    #[cfg(not(unix))]
    {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_readonly(false);
        fs::set_permissions(path, perms)
    }
}

/// Hex SHA-256 of a file's content.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
