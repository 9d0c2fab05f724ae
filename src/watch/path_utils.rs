// src/watch/path_utils.rs

use std::path::Path;

/// Source-relative form of `path`, with forward slashes.
///
/// notify may report paths under a different absolute prefix than the one we
/// watched (symlinked temp dirs on macOS), so a failed `strip_prefix` is
/// retried on canonical paths. A deleted file cannot be canonicalized; its
/// parent is used instead.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_forward_slashes(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(to_forward_slashes)
}

fn to_forward_slashes(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
