// src/exec/file_ops.rs

//! Filesystem tasks: each one sets `target = transform(source)` before
//! acting. All I/O goes through `tokio::fs`, so the blocking calls run on
//! the blocking pool rather than on the async workers.

use std::fmt;
use std::io;

use anyhow::{Context, Result};
use tokio::fs;

use crate::path::Transformer;
use crate::workflow::{TaskFuture, TaskInfo, Tasker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOp {
    Cat,
    Copy,
    Move,
    Remove,
    Mkdir,
}

#[derive(Clone)]
pub struct FileTask {
    op: FileOp,
    transform: Transformer,
}

impl fmt::Debug for FileTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTask").field("op", &self.op).finish_non_exhaustive()
    }
}

/// Read the target into the buffer and echo it to the output sink.
pub fn cat_task(transform: Transformer) -> FileTask {
    FileTask { op: FileOp::Cat, transform }
}

/// Copy the source to the target.
pub fn copy_task(transform: Transformer) -> FileTask {
    FileTask { op: FileOp::Copy, transform }
}

/// Rename the source to the target.
pub fn move_task(transform: Transformer) -> FileTask {
    FileTask { op: FileOp::Move, transform }
}

/// Delete the target file.
pub fn remove_task(transform: Transformer) -> FileTask {
    FileTask { op: FileOp::Remove, transform }
}

/// Create the directory `transform(source)`. The target is reset to the
/// source so the next task keeps working on the original file. An existing
/// directory is not an error.
pub fn mkdir_task(transform: Transformer) -> FileTask {
    FileTask { op: FileOp::Mkdir, transform }
}

impl FileTask {
    async fn apply(&self, info: &mut TaskInfo) -> Result<()> {
        info.target = (self.transform)(&info.source);
        match self.op {
            FileOp::Cat => {
                info.buffer = fs::read(&info.target)
                    .await
                    .with_context(|| format!("reading {:?}", info.target))?;
                info.stdout.write_all(&info.buffer);
            }
            FileOp::Copy => {
                fs::copy(&info.source, &info.target)
                    .await
                    .with_context(|| format!("copying {:?} to {:?}", info.source, info.target))?;
                if info.verbose {
                    info.stdout.write_line(format!(
                        ">>> Copy {} to {}",
                        info.source.display(),
                        info.target.display()
                    ));
                }
            }
            FileOp::Move => {
                fs::rename(&info.source, &info.target)
                    .await
                    .with_context(|| format!("renaming {:?} to {:?}", info.source, info.target))?;
                if info.verbose {
                    info.stdout.write_line(format!(
                        ">>> Renaming {} to {}",
                        info.source.display(),
                        info.target.display()
                    ));
                }
            }
            FileOp::Remove => {
                fs::remove_file(&info.target)
                    .await
                    .with_context(|| format!("removing {:?}", info.target))?;
                if info.verbose {
                    info.stdout.write_line(format!(">>> Remove {}", info.target.display()));
                }
            }
            FileOp::Mkdir => {
                let dir = std::mem::replace(&mut info.target, info.source.clone());
                match fs::create_dir(&dir).await {
                    Ok(()) => {
                        if info.verbose {
                            info.stdout.write_line(format!(">>> mkdir {}", dir.display()));
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                    Err(err) => {
                        return Err(err).with_context(|| format!("creating directory {:?}", dir));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Tasker for FileTask {
    fn run<'a>(&'a self, info: &'a mut TaskInfo) -> TaskFuture<'a> {
        Box::pin(self.apply(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{ext_transformer, identity};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    #[tokio::test]
    async fn copy_then_cat() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "hello").unwrap();

        let mut info = TaskInfo::detached(&src);
        copy_task(ext_transformer("bak")).run(&mut info).await.unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.bak")).unwrap(), "hello");

        info.source = info.target.clone();
        cat_task(identity()).run(&mut info).await.unwrap();
        assert_eq!(info.buffer_str(), "hello");
        assert_eq!(info.stdout.contents(), "hello");
    }

    #[tokio::test]
    async fn move_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "x").unwrap();

        let mut info = TaskInfo::detached(&src);
        move_task(ext_transformer("moved")).run(&mut info).await.unwrap();
        let moved = dir.path().join("a.moved");
        assert!(!src.exists());
        assert!(moved.exists());

        let mut info = TaskInfo::detached(&moved);
        remove_task(identity()).run(&mut info).await.unwrap();
        assert!(!moved.exists());
        assert!(remove_task(identity()).run(&mut info).await.is_err());
    }

    #[tokio::test]
    async fn mkdir_keeps_source_and_tolerates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("page.md");
        let out = dir.path().join("out");
        let out_for_transform = out.clone();
        let task = mkdir_task(Arc::new(move |_: &Path| out_for_transform.clone()));

        let mut info = TaskInfo::detached(&src);
        task.run(&mut info).await.unwrap();
        assert!(out.is_dir());
        assert_eq!(info.target, src);

        task.run(&mut info).await.unwrap();
    }
}
