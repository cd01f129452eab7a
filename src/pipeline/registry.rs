// src/pipeline/registry.rs

//! Watch-set bookkeeping shared between the pipeline API and its
//! recursive-directory tracker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::OutputSink;
use crate::fs::FileSystem;
use crate::path::{is_hidden, PathResolver};
use crate::types::{Event, EventSlice, Op};
use crate::watch::Watcher;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered, deduplicated list of watched directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    paths: Vec<PathBuf>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and changes nothing) if the path is already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// A recursively watched root and its hidden-directory policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursiveRoot {
    pub path: PathBuf,
    pub ignore_hidden: bool,
}

/// Pick the recursive root that owns a newly appeared directory.
///
/// Roots are checked in registration order and the first root that both
/// accepts the directory's hidden status and contains it wins. With nested
/// roots the outcome therefore depends on registration order.
pub fn owning_root<'a>(dir: &Path, roots: &'a [RecursiveRoot]) -> Option<&'a RecursiveRoot> {
    let hidden = is_hidden(dir);
    roots
        .iter()
        .filter(|root| !(hidden && root.ignore_hidden))
        .find(|root| dir.strip_prefix(&root.path).is_ok())
}

pub(crate) struct WatchRegistry {
    fs: Arc<dyn FileSystem>,
    resolver: PathResolver,
    verbose: bool,
    out: OutputSink,
    err: OutputSink,
    watches: Mutex<WatchSet>,
    roots: Mutex<Vec<RecursiveRoot>>,
    watcher: Mutex<Box<dyn Watcher>>,
    live: AtomicBool,
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watches", &*lock(&self.watches))
            .field("roots", &*lock(&self.roots))
            .field("live", &self.live.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl WatchRegistry {
    pub(crate) fn new(
        fs: Arc<dyn FileSystem>,
        resolver: PathResolver,
        watcher: Box<dyn Watcher>,
        verbose: bool,
        out: OutputSink,
        err: OutputSink,
    ) -> Self {
        Self {
            fs,
            resolver,
            verbose,
            out,
            err,
            watches: Mutex::new(WatchSet::new()),
            roots: Mutex::new(Vec::new()),
            watcher: Mutex::new(watcher),
            live: AtomicBool::new(false),
        }
    }

    pub(crate) fn watches(&self) -> Vec<PathBuf> {
        lock(&self.watches).as_slice().to_vec()
    }

    pub(crate) fn recursive_roots(&self) -> Vec<RecursiveRoot> {
        lock(&self.roots).clone()
    }

    pub(crate) fn recurses_natively(&self) -> bool {
        lock(&self.watcher).is_recursive()
    }

    pub(crate) fn watch(&self, raw: &Path) -> Result<PathBuf> {
        let dir = match self.resolver.resolve(raw) {
            Ok(dir) => dir,
            Err(err) => {
                if self.verbose {
                    self.err.write_line(format!("> {err}"));
                }
                return Err(err);
            }
        };

        if !lock(&self.watches).insert(dir.clone()) {
            return Ok(dir);
        }
        debug!(path = ?dir, "added to watch set");

        if self.live.load(Ordering::SeqCst) {
            lock(&self.watcher).add(&dir)?;
        }
        Ok(dir)
    }

    pub(crate) fn watch_recursive(&self, raw: &Path, ignore_hidden: bool) -> Result<PathBuf> {
        let root = self.resolver.resolve(raw)?;
        {
            let mut roots = lock(&self.roots);
            match roots.iter_mut().find(|r| r.path == root) {
                Some(existing) => existing.ignore_hidden = ignore_hidden,
                None => roots.push(RecursiveRoot {
                    path: root.clone(),
                    ignore_hidden,
                }),
            }
        }

        if self.recurses_natively() {
            // The watcher already covers the whole subtree.
            self.watch(&root)?;
            return Ok(root);
        }

        self.walk(&root, ignore_hidden);
        Ok(root)
    }

    /// Depth-first walk registering every directory under `root`. The root
    /// itself is always watched; hidden subdirectories are pruned when
    /// `ignore_hidden` is set. Unreadable directories are skipped.
    fn walk(&self, root: &Path, ignore_hidden: bool) {
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            if dir != root && ignore_hidden && is_hidden(&dir) {
                debug!(path = ?dir, "skipping hidden directory");
                continue;
            }
            if let Err(err) = self.watch(&dir) {
                warn!(path = ?dir, error = %err, "failed to watch directory");
                self.err.write_line(&err);
            }
            match self.fs.sub_dirs(&dir) {
                Ok(children) => stack.extend(children.into_iter().rev()),
                Err(err) => debug!(path = ?dir, error = %err, "cannot list directory"),
            }
        }
    }

    /// React to an event from the recursive-directory channel. Returns the
    /// root that was re-walked, if any.
    pub(crate) fn rewatch_if_new_directory(&self, event: &Event) -> Option<PathBuf> {
        if event.op != Op::CREATE && event.op != Op::RENAME {
            return None;
        }
        if !self.fs.is_dir(&event.path) {
            return None;
        }

        let roots = self.recursive_roots();
        let root = owning_root(&event.path, &roots)?;
        match self.watch_recursive(&root.path, root.ignore_hidden) {
            Ok(_) => {
                info!(path = ?event.path, root = ?root.path, "detected new directory");
                if self.verbose {
                    self.out
                        .write_line(format!("> Detected new watch {}", event.path.display()));
                }
            }
            Err(err) => {
                warn!(path = ?event.path, error = %err, "failed to extend recursive watch");
                self.err.write_line(&err);
            }
        }
        Some(root.path.clone())
    }

    pub(crate) fn start_watcher(
        &self,
        latency: Duration,
    ) -> Result<mpsc::Receiver<EventSlice>> {
        let paths = self.watches();
        let mut watcher = lock(&self.watcher);
        if self.verbose {
            watcher.set_verbose(self.out.clone());
        }
        let batches = watcher.start(latency, &paths)?;
        self.live.store(true, Ordering::SeqCst);
        Ok(batches)
    }

    pub(crate) fn stop_watcher(&self) -> Result<()> {
        self.live.store(false, Ordering::SeqCst);
        lock(&self.watcher).stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::types::WatcherKind;
    use crate::watch::new_watcher;

    fn registry(fs: &MockFileSystem) -> WatchRegistry {
        let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
        WatchRegistry::new(
            Arc::clone(&fs),
            PathResolver::new(Vec::new()).with_file_system(fs),
            new_watcher(WatcherKind::Portable),
            false,
            OutputSink::memory(),
            OutputSink::memory(),
        )
    }

    fn root(path: &str, ignore_hidden: bool) -> RecursiveRoot {
        RecursiveRoot {
            path: PathBuf::from(path),
            ignore_hidden,
        }
    }

    #[test]
    fn watch_set_deduplicates() {
        let mut set = WatchSet::new();
        assert!(set.insert(PathBuf::from("/a")));
        assert!(!set.insert(PathBuf::from("/a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn first_matching_root_wins() {
        let roots = vec![root("/proj", true), root("/proj/web", false)];
        let found = owning_root(Path::new("/proj/web/new"), &roots).unwrap();
        assert_eq!(found.path, PathBuf::from("/proj"));
    }

    #[test]
    fn hidden_dirs_skip_roots_that_ignore_them() {
        let roots = vec![root("/proj", true), root("/proj/web", false)];
        let found = owning_root(Path::new("/proj/web/.cache"), &roots).unwrap();
        assert_eq!(found.path, PathBuf::from("/proj/web"));
        assert!(owning_root(Path::new("/proj/.git"), &roots[..1]).is_none());
    }

    #[test]
    fn unrelated_dirs_have_no_root() {
        let roots = vec![root("/proj", false)];
        assert!(owning_root(Path::new("/elsewhere/x"), &roots).is_none());
    }

    #[test]
    fn only_created_or_renamed_directories_trigger_a_walk() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj/assets");
        let reg = registry(&fs);
        reg.watch_recursive(Path::new("/proj/assets"), true).unwrap();

        fs.add_dir("/proj/assets/late");
        let write = Event::new("/proj/assets/late", Op::WRITE);
        assert_eq!(reg.rewatch_if_new_directory(&write), None);
        let combined = Event::new("/proj/assets/late", Op::CREATE | Op::WRITE);
        assert_eq!(reg.rewatch_if_new_directory(&combined), None);
        assert!(!reg.watches().contains(&PathBuf::from("/proj/assets/late")));

        let renamed = Event::new("/proj/assets/late", Op::RENAME);
        assert_eq!(
            reg.rewatch_if_new_directory(&renamed),
            Some(PathBuf::from("/proj/assets"))
        );
        assert!(reg.watches().contains(&PathBuf::from("/proj/assets/late")));
    }

    #[test]
    fn files_and_unowned_directories_are_ignored() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj/assets");
        fs.add_dir("/proj/other/new");
        fs.add_file("/proj/assets/a.css");
        let reg = registry(&fs);
        reg.watch_recursive(Path::new("/proj/assets"), true).unwrap();

        let file = Event::new("/proj/assets/a.css", Op::CREATE);
        assert_eq!(reg.rewatch_if_new_directory(&file), None);
        let outside = Event::new("/proj/other/new", Op::CREATE);
        assert_eq!(reg.rewatch_if_new_directory(&outside), None);
        assert_eq!(reg.watches(), vec![PathBuf::from("/proj/assets")]);
    }
}
