//! Workspace path resolution.
//!
//! File actions name paths relative to the workspace root. Absolute paths
//! and any `..` component are refused before the filesystem is touched.

use std::path::{Component, Path, PathBuf};

use devloop_core::ExecutorError;

pub fn resolve_in_workspace(root: &Path, path: &str) -> Result<PathBuf, ExecutorError> {
    let relative = Path::new(path.trim());
    if relative.as_os_str().is_empty() {
        return Err(ExecutorError::PathOutsideWorkspace("empty path".into()));
    }

    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExecutorError::PathOutsideWorkspace(path.into()));
            }
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_the_root() {
        let root = Path::new("/ws");
        assert_eq!(resolve_in_workspace(root, "src/main.rs").unwrap(), PathBuf::from("/ws/src/main.rs"));
        assert_eq!(resolve_in_workspace(root, "./a.txt").unwrap(), PathBuf::from("/ws/a.txt"));
    }

    #[test]
    fn traversal_is_rejected() {
        let root = Path::new("/ws");
        assert!(matches!(
            resolve_in_workspace(root, "../etc/passwd"),
            Err(ExecutorError::PathOutsideWorkspace(_))
        ));
        assert!(resolve_in_workspace(root, "src/../../x").is_err());
    }

    #[test]
    fn absolute_paths_are_rejected() {
        assert!(resolve_in_workspace(Path::new("/ws"), "/etc/passwd").is_err());
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(resolve_in_workspace(Path::new("/ws"), "  ").is_err());
    }
}
