//! Filesystem sandbox security contract (C9):
//! `expand_user → join base → canonicalize → verify descendant`.

use std::path::{Component, Path, PathBuf};

use orchestrator_core::error::{Result, TaskError};

/// Resolve a tool-supplied path against a workspace root, refusing to
/// return anything outside that root.
///
/// `user_path` may be relative, may start with `~` (meaning the workspace
/// root itself — there is no real home directory in a sandboxed workspace),
/// or may look absolute (`/etc/passwd`); an absolute-looking path is always
/// treated as relative to the workspace root, never to the host filesystem.
pub async fn resolve_path(workspace_root: &Path, user_path: &str) -> Result<PathBuf> {
    let expanded = expand_user(workspace_root, user_path);
    let normalized = normalize_lexical(&expanded);

    if !normalized.starts_with(workspace_root) {
        return Err(TaskError::SandboxViolation(format!(
            "path '{user_path}' escapes the workspace root"
        )));
    }

    let canonical_root = tokio::fs::canonicalize(workspace_root).await.map_err(io_err)?;
    let existing_ancestor = longest_existing_ancestor(&normalized).await;
    let canonical_ancestor = tokio::fs::canonicalize(&existing_ancestor).await.map_err(io_err)?;

    if !canonical_ancestor.starts_with(&canonical_root) {
        return Err(TaskError::SandboxViolation(format!(
            "path '{user_path}' resolves outside the workspace root via a symlink"
        )));
    }

    let suffix = normalized
        .strip_prefix(&existing_ancestor)
        .unwrap_or_else(|_| Path::new(""));
    Ok(canonical_ancestor.join(suffix))
}

fn expand_user(workspace_root: &Path, user_path: &str) -> PathBuf {
    if user_path == "~" {
        return workspace_root.to_path_buf();
    }
    if let Some(rest) = user_path.strip_prefix("~/") {
        return workspace_root.join(rest);
    }
    workspace_root.join(user_path.trim_start_matches(['/', '\\']))
}

/// Resolve `.`/`..` components without touching the filesystem. This is
/// the first line of defense: it rejects `../../etc/passwd`-style escapes
/// before any `canonicalize` call even runs.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

async fn longest_existing_ancestor(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    loop {
        if tokio::fs::metadata(&candidate).await.is_ok() {
            return candidate;
        }
        if !candidate.pop() {
            return PathBuf::from("/");
        }
    }
}

fn io_err(e: std::io::Error) -> TaskError {
    TaskError::Internal(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn workspace() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[tokio::test]
    async fn resolves_simple_relative_path() {
        let ws = workspace().await;
        let resolved = resolve_path(ws.path(), "generated_files/report.md").await.unwrap();
        assert!(resolved.starts_with(tokio::fs::canonicalize(ws.path()).await.unwrap()));
        assert!(resolved.ends_with("generated_files/report.md"));
    }

    #[tokio::test]
    async fn tilde_means_workspace_root() {
        let ws = workspace().await;
        let resolved = resolve_path(ws.path(), "~/notes.md").await.unwrap();
        assert!(resolved.ends_with("notes.md"));
    }

    #[tokio::test]
    async fn rejects_dot_dot_escape() {
        let ws = workspace().await;
        let err = resolve_path(ws.path(), "../../../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, TaskError::SandboxViolation(_)));
    }

    #[tokio::test]
    async fn absolute_looking_path_is_treated_as_relative() {
        let ws = workspace().await;
        let resolved = resolve_path(ws.path(), "/etc/passwd").await.unwrap();
        assert!(resolved.starts_with(tokio::fs::canonicalize(ws.path()).await.unwrap()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn rejects_symlink_escape() {
        let ws = workspace().await;
        let outside = tempfile::tempdir().unwrap();
        let link = ws.path().join("escape");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let err = resolve_path(ws.path(), "escape/payload.txt").await.unwrap_err();
        assert!(matches!(err, TaskError::SandboxViolation(_)));
    }
}
