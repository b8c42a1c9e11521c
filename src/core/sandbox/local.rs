//! Sandbox backed by a directory on the local filesystem.

use std::path::{Component, Path, PathBuf};

use super::SandboxError;

/// Directory names never listed.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git", ".next", "target"];

/// Directory-backed workspace. Every path is relative to `root`.
#[derive(Debug, Clone)]
pub struct LocalSandbox {
    root: PathBuf,
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }
    normalized
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// rest. `None` when a component is a symlink that cannot be followed.
fn canonicalize_existing(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(real) = existing.canonicalize() {
            return Some(rest.iter().rev().fold(real, |acc, name| acc.join(name)));
        }
        if existing.symlink_metadata().is_ok() {
            return None;
        }
        rest.push(existing.file_name()?);
        existing = existing.parent()?;
    }
}

impl LocalSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the workspace directory if missing.
    pub fn ensure(&self) -> Result<(), SandboxError> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Map a workspace-relative path to an absolute one inside the root.
    ///
    /// Symlinks are followed as far as the path exists, so a link inside
    /// the workspace cannot point a read or write outside it.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let outside = || SandboxError::OutsideWorkspace(relative.to_string());

        let root = normalize_path(&self.root);
        let full = normalize_path(&root.join(relative.trim_start_matches('/')));
        if !full.starts_with(&root) || full == root {
            return Err(outside());
        }

        // A missing root has nothing linked under it yet
        if let Ok(real_root) = root.canonicalize() {
            match canonicalize_existing(&full) {
                Some(real) if real.starts_with(&real_root) && real != real_root => {}
                _ => return Err(outside()),
            }
        }

        Ok(full)
    }

    /// Every file under the root, as sorted `/`-separated relative paths.
    pub fn list_files(&self) -> Result<Vec<String>, SandboxError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let walker = ignore::WalkBuilder::new(&self.root)
            .standard_filters(false)
            .filter_entry(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !IGNORED_DIRS.contains(&name))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect();
                files.push(parts.join("/"));
            }
        }

        files.sort();
        Ok(files)
    }

    pub async fn read_file(&self, relative: &str) -> Result<String, SandboxError> {
        let path = self.resolve(relative)?;
        if !path.is_file() {
            return Err(SandboxError::NotFound(relative.to_string()));
        }
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    /// Write a file, creating parent directories as needed.
    pub async fn write_file(&self, relative: &str, content: &str) -> Result<(), SandboxError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote sandbox file");
        Ok(())
    }
}
