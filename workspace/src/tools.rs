//! Filesystem tools (C9) exposed to executors. Every path argument goes
//! through [`crate::sandbox::resolve_path`] before touching disk.

use std::path::Path;

use chrono::{DateTime, Utc};
use orchestrator_core::error::{Result, TaskError};

use crate::sandbox::resolve_path;

/// One entry in a non-recursive [`FilesystemTools::list_directory`] listing.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Outcome of reading one path as part of [`FilesystemTools::read_multiple_files`];
/// a read failure on one path does not abort the rest of the batch.
#[derive(Debug, Clone)]
pub struct FileRead {
    pub path: String,
    pub content: std::result::Result<String, String>,
}

/// A node in the recursive tree returned by [`FilesystemTools::directory_tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<TreeEntry>,
}

/// Metadata returned by [`FilesystemTools::get_file_info`].
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub is_dir: bool,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// One find/replace edit applied to a file by [`FilesystemTools::edit_file`].
#[derive(Debug, Clone)]
pub struct EditOperation {
    pub find: String,
    pub replace: String,
}

/// Outcome of applying a sequence of [`EditOperation`]s.
#[derive(Debug, Clone)]
pub struct EditResult {
    /// Number of operations whose `find` text was located and replaced.
    pub applied: usize,
    /// Number of operations whose `find` text was not present and were
    /// skipped rather than failing the whole edit.
    pub skipped: usize,
    pub dry_run: bool,
    /// The file content after all edits, whether or not it was written.
    pub preview: String,
}

/// The sandboxed filesystem operations available to an executor.
pub struct FilesystemTools<'a> {
    workspace_root: &'a Path,
}

impl<'a> FilesystemTools<'a> {
    pub fn new(workspace_root: &'a Path) -> Self {
        Self { workspace_root }
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        let resolved = resolve_path(self.workspace_root, path).await?;
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| TaskError::ExecutionError(format!("failed to read '{path}': {e}")))
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let resolved = resolve_path(self.workspace_root, path).await?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskError::ExecutionError(format!("failed to create parent dirs for '{path}': {e}")))?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| TaskError::ExecutionError(format!("failed to write '{path}': {e}")))
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let resolved = resolve_path(self.workspace_root, path).await?;
        tokio::fs::remove_file(&resolved)
            .await
            .map_err(|e| TaskError::ExecutionError(format!("failed to delete '{path}': {e}")))
    }

    /// The base directory every other operation is restricted to.
    pub fn list_allowed_directory(&self) -> String {
        self.workspace_root.display().to_string()
    }

    /// Read every path in `paths`; a failure on one path is recorded against
    /// that entry rather than aborting the batch.
    pub async fn read_multiple_files(&self, paths: &[&str]) -> Vec<FileRead> {
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let content = self.read_file(path).await.map_err(|e| e.to_string());
            out.push(FileRead { path: path.to_string(), content });
        }
        out
    }

    /// Create `path` and any missing parent directories. Idempotent if the
    /// directory already exists.
    pub async fn create_directory(&self, path: &str) -> Result<()> {
        let resolved = resolve_path(self.workspace_root, path).await?;
        tokio::fs::create_dir_all(&resolved)
            .await
            .map_err(|e| TaskError::ExecutionError(format!("failed to create directory '{path}': {e}")))
    }

    /// Non-recursive listing of `path`'s direct children.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        let resolved = resolve_path(self.workspace_root, path).await?;
        let mut entries = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| TaskError::ExecutionError(format!("failed to list '{path}': {e}")))?;
        let mut out = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TaskError::ExecutionError(e.to_string()))?
        {
            let is_dir = entry.file_type().await.map_err(|e| TaskError::ExecutionError(e.to_string()))?.is_dir();
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Recursively walk `path`, returning the full subtree rooted at it.
    pub async fn directory_tree(&self, path: &str) -> Result<Vec<TreeEntry>> {
        let resolved = resolve_path(self.workspace_root, path).await?;
        Self::build_tree(&resolved).await
    }

    fn build_tree<'b>(dir: &'b Path) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<TreeEntry>>> + Send + 'b>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(dir)
                .await
                .map_err(|e| TaskError::ExecutionError(format!("failed to read '{}': {e}", dir.display())))?;
            let mut out = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| TaskError::ExecutionError(e.to_string()))?
            {
                let is_dir = entry.file_type().await.map_err(|e| TaskError::ExecutionError(e.to_string()))?.is_dir();
                let children = if is_dir { Self::build_tree(&entry.path()).await? } else { Vec::new() };
                out.push(TreeEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_dir,
                    children,
                });
            }
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        })
    }

    /// Move or rename `source` to `destination`. Fails if `destination`
    /// already exists.
    pub async fn move_file(&self, source: &str, destination: &str) -> Result<()> {
        let resolved_source = resolve_path(self.workspace_root, source).await?;
        let resolved_dest = resolve_path(self.workspace_root, destination).await?;
        if tokio::fs::metadata(&resolved_dest).await.is_ok() {
            return Err(TaskError::ExecutionError(format!("destination '{destination}' already exists")));
        }
        if let Some(parent) = resolved_dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskError::ExecutionError(format!("failed to create parent dirs for '{destination}': {e}")))?;
        }
        tokio::fs::rename(&resolved_source, &resolved_dest)
            .await
            .map_err(|e| TaskError::ExecutionError(format!("failed to move '{source}' to '{destination}': {e}")))
    }

    /// Recursively search under `path` for entries whose name matches the
    /// glob `pattern`, returning paths relative to `path`.
    pub async fn search_files(&self, path: &str, pattern: &str, case_sensitive: bool) -> Result<Vec<String>> {
        let root = resolve_path(self.workspace_root, path).await?;
        let compare_pattern = if case_sensitive { pattern.to_string() } else { pattern.to_lowercase() };
        let effective_pattern = glob::Pattern::new(&compare_pattern)
            .map_err(|e| TaskError::Validation(format!("invalid search pattern '{pattern}': {e}")))?;

        let mut matches = Vec::new();
        Self::search_tree(&root, &root, &effective_pattern, case_sensitive, &mut matches).await?;
        matches.sort();
        Ok(matches)
    }

    fn search_tree<'b>(
        root: &'b Path,
        dir: &'b Path,
        pattern: &'b glob::Pattern,
        case_sensitive: bool,
        matches: &'b mut Vec<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'b>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(dir)
                .await
                .map_err(|e| TaskError::ExecutionError(format!("failed to read '{}': {e}", dir.display())))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| TaskError::ExecutionError(e.to_string()))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let candidate = if case_sensitive { name.clone() } else { name.to_lowercase() };
                if pattern.matches(&candidate) {
                    if let Ok(relative) = entry.path().strip_prefix(root) {
                        matches.push(relative.display().to_string());
                    }
                }
                let is_dir = entry.file_type().await.map_err(|e| TaskError::ExecutionError(e.to_string()))?.is_dir();
                if is_dir {
                    Self::search_tree(root, &entry.path(), pattern, case_sensitive, matches).await?;
                }
            }
            Ok(())
        })
    }

    /// Metadata about a single file or directory.
    pub async fn get_file_info(&self, path: &str) -> Result<FileInfo> {
        let resolved = resolve_path(self.workspace_root, path).await?;
        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|e| TaskError::ExecutionError(format!("failed to stat '{path}': {e}")))?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(FileInfo {
            is_dir: metadata.is_dir(),
            size_bytes: metadata.len(),
            modified,
        })
    }

    /// Apply `operations` to the file at `path` in order. Each operation's
    /// `find` text is replaced once; an operation whose `find` text is not
    /// present is skipped rather than aborting the whole edit — later
    /// operations still run against whatever the prior ones produced. When
    /// `dry_run` is true the file is never written; the caller inspects
    /// `EditResult::preview` to decide whether to commit.
    pub async fn edit_file(&self, path: &str, operations: &[EditOperation], dry_run: bool) -> Result<EditResult> {
        let original = self.read_file(path).await?;
        let mut content = original;
        let mut applied = 0;
        let mut skipped = 0;

        for op in operations {
            if content.contains(&op.find) {
                content = content.replacen(&op.find, &op.replace, 1);
                applied += 1;
            } else {
                skipped += 1;
            }
        }

        if !dry_run {
            self.write_file(path, &content).await?;
        }

        Ok(EditResult {
            applied,
            skipped,
            dry_run,
            preview: content,
        })
    }
}
