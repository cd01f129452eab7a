// src/path/mod.rs

//! Path helpers: resolving user-supplied watch paths, the hidden-entry
//! naming rule, and target transformers used by tasks.

pub mod resolver;
pub mod transform;

use std::path::{Component, Path, PathBuf};

pub use resolver::{split_search_roots, PathResolver, SEARCH_PATH_ENV};
pub use transform::{ext_transformer, identity, rel_base, rel_dir, Transformer};

/// An entry is hidden when its final path component starts with `.`.
///
/// This is a naming convention, not a platform attribute, so it behaves the
/// same everywhere.
pub fn is_hidden(path: &Path) -> bool {
    match path.file_name() {
        Some(name) => name.to_string_lossy().starts_with('.'),
        None => false,
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding normal component. The filesystem is never consulted.
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_checks_only_the_last_component() {
        assert!(is_hidden(Path::new("/repo/.git")));
        assert!(is_hidden(Path::new(".cache")));
        assert!(!is_hidden(Path::new("/home/.config/app")));
        assert!(!is_hidden(Path::new("/")));
    }

    #[test]
    fn clean_folds_dot_components() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("../a/..")), PathBuf::from(".."));
        assert_eq!(clean(Path::new("./")), PathBuf::from("."));
    }
}
