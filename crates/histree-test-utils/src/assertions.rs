//! Assertion helpers for comparing whole directory trees.

use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Read every regular file under `root` into a map keyed by `/`-separated
/// relative path.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .expect("walked path is under root")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let content = std::fs::read(e.path())
                .unwrap_or_else(|err| panic!("Failed to read {}: {}", e.path().display(), err));
            (relative, content)
        })
        .collect()
}

/// Assert that `root` contains exactly the given files with exactly the
/// given contents.
pub fn assert_tree(root: &Path, expected: &[(&str, &str)]) {
    let actual: BTreeMap<String, String> = read_tree(root)
        .into_iter()
        .map(|(path, bytes)| (path, String::from_utf8_lossy(&bytes).into_owned()))
        .collect();
    let expected: BTreeMap<String, String> = expected
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect();

    assert_eq!(
        actual,
        expected,
        "Tree under {} does not match.\nExpected: {:#?}\nActual: {:#?}",
        root.display(),
        expected,
        actual
    );
}

/// Assert that a file's content equals expected text exactly.
pub fn assert_file_equals(path: &Path, expected: &str) {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));

    assert_eq!(
        content,
        expected,
        "File {} content does not match expected.\nExpected:\n{}\nActual:\n{}",
        path.display(),
        expected,
        content
    );
}

/// POSIX permission bits of a file (Unix only).
#[cfg(unix)]
pub fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .unwrap_or_else(|e| panic!("Failed to stat {}: {}", path.display(), e))
        .permissions()
        .mode()
        & 0o7777
}
