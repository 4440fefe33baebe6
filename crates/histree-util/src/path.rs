//! Path utilities.
//!
//! This module provides utilities for working with file paths.

use std::path::{Component, Path, PathBuf};

/// Get the histree data directory.
///
/// This follows XDG conventions:
/// - `$XDG_DATA_HOME/histree` if set
/// - `~/.local/share/histree` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("histree"))
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Turn a path into a normalized absolute path.
///
/// Relative paths are resolved against the current working directory.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Make a path relative to a base directory.
///
/// Returns `None` if the path is not within the base directory.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Join a relative path onto a base, preventing path traversal.
///
/// Returns `None` if `path` is absolute or the result would leave `base`.
pub fn safe_join(base: &Path, path: &Path) -> Option<PathBuf> {
    if path.is_absolute() || path.has_root() {
        return None;
    }

    let base = normalize(base);
    let joined = normalize(&base.join(path));

    if joined.starts_with(&base) && joined != base {
        Some(joined)
    } else {
        None
    }
}

/// Render a relative path with `/` separators for storage in manifests.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir() {
        if let Some(dir) = data_dir() {
            assert!(dir.ends_with("histree"));
        }
    }

    #[test]
    fn test_normalize() {
        let path = Path::new("/home/user/./project/../project/src");
        let normalized = normalize(path);
        assert_eq!(normalized, PathBuf::from("/home/user/project/src"));
    }

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        let abs = absolute(Path::new("/tmp/a/../b")).unwrap();
        assert_eq!(abs, PathBuf::from("/tmp/b"));
    }

    #[test]
    fn test_absolute_resolves_relative_paths() {
        let abs = absolute(Path::new("some/dir")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("some/dir"));
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/home/user/project");
        let path = Path::new("/home/user/project/src/main.rs");
        let relative = relative_to(path, base);
        assert_eq!(relative, Some(PathBuf::from("src/main.rs")));
    }

    #[test]
    fn test_safe_join() {
        let base = PathBuf::from("/home/user/project");

        let result = safe_join(&base, Path::new("src/main.rs"));
        assert_eq!(result, Some(PathBuf::from("/home/user/project/src/main.rs")));

        assert!(safe_join(&base, Path::new("../../../etc/passwd")).is_none());
        assert!(safe_join(&base, Path::new("/etc/passwd")).is_none());
        assert!(safe_join(&base, Path::new("src/..")).is_none());
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("src/lib/mod.rs")), "src/lib/mod.rs");
        assert_eq!(to_slash(Path::new("./a.txt")), "a.txt");
    }
}
