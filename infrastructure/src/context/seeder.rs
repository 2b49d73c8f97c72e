//! Local project context seeder
//!
//! [`LocalContextSeeder`] collects up to four sections:
//!
//! 1. `Git branch` - output of `git rev-parse --abbrev-ref HEAD`
//! 2. `Git status` - `git status --short`, cut at 200 lines with a note
//! 3. `Directory layout` - entries two levels deep, hidden entries and
//!    `target`/`node_modules` skipped, capped at 200 entries
//! 4. `README.md` - the first 100 lines
//!
//! Each piece is independent. When one fails (no git, no README, unreadable
//! directory) it is omitted and the rest are still returned.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use toolpod_application::ContextSeeder;
use toolpod_domain::ContextBlob;
use tracing::{debug, warn};

const MAX_STATUS_LINES: usize = 200;
const MAX_LAYOUT_ENTRIES: usize = 200;
const MAX_README_LINES: usize = 100;
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// Context seeder that reads the local working tree.
///
/// # Thread Safety
///
/// `LocalContextSeeder` holds only a path and is `Send + Sync`.
///
/// # Examples
///
/// ```
/// use toolpod_infrastructure::LocalContextSeeder;
///
/// let seeder = LocalContextSeeder::new("/path/to/project");
/// assert!(seeder.root().ends_with("project"));
/// ```
#[derive(Debug, Clone)]
pub struct LocalContextSeeder {
    root: PathBuf,
}

impl LocalContextSeeder {
    /// Creates a seeder for the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs a git subcommand in the project root.
    ///
    /// # Returns
    ///
    /// `Some(stdout)` when git exits successfully, `None` when git is
    /// missing, the directory is not a repository, or the command fails.
    async fn git(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            Ok(out) => {
                debug!(?args, status = ?out.status.code(), "git command failed");
                None
            }
            Err(e) => {
                debug!(?args, error = %e, "git not available");
                None
            }
        }
    }

    async fn branch(&self) -> Option<String> {
        let out = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = out.trim();
        (!branch.is_empty()).then(|| branch.to_string())
    }

    /// Short status, cut at [`MAX_STATUS_LINES`].
    async fn status(&self) -> Option<String> {
        let out = self.git(&["status", "--short"]).await?;
        if out.trim().is_empty() {
            return Some("(clean)".to_string());
        }
        let lines: Vec<&str> = out.lines().collect();
        if lines.len() <= MAX_STATUS_LINES {
            return Some(lines.join("\n"));
        }
        Some(format!(
            "{}\n... ({} more lines; run `git status` for the full list)",
            lines[..MAX_STATUS_LINES].join("\n"),
            lines.len() - MAX_STATUS_LINES
        ))
    }

    /// Directory listing two levels deep.
    ///
    /// Entries are sorted per directory, directories suffixed with `/`.
    /// Stops at [`MAX_LAYOUT_ENTRIES`] and appends a note.
    fn layout(&self) -> Option<String> {
        let mut entries = Vec::new();
        let mut truncated = false;
        if let Err(e) = walk(&self.root, &self.root, 0, &mut entries, &mut truncated) {
            warn!(root = %self.root.display(), error = %e, "Failed to list project directory");
            return None;
        }
        if entries.is_empty() {
            return None;
        }
        let mut out = entries.join("\n");
        if truncated {
            out.push_str(&format!("\n... (listing truncated at {} entries)", MAX_LAYOUT_ENTRIES));
        }
        Some(out)
    }

    /// First [`MAX_README_LINES`] lines of `README.md`.
    fn readme(&self) -> Option<String> {
        let path = self.root.join("README.md");
        let content = fs::read_to_string(&path).ok()?;
        if content.trim().is_empty() {
            return None;
        }
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= MAX_README_LINES {
            return Some(content);
        }
        Some(format!(
            "{}\n... ({} more lines)",
            lines[..MAX_README_LINES].join("\n"),
            lines.len() - MAX_README_LINES
        ))
    }
}

fn walk(
    root: &Path,
    dir: &Path,
    depth: usize,
    out: &mut Vec<String>,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut children: Vec<_> = fs::read_dir(dir)?.flatten().collect();
    children.sort_by_key(|e| e.file_name());

    for entry in children {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let is_dir = path.is_dir();
        if is_dir && SKIPPED_DIRS.contains(&name.as_str()) {
            continue;
        }
        if out.len() >= MAX_LAYOUT_ENTRIES {
            *truncated = true;
            return Ok(());
        }
        let rel = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        if is_dir {
            out.push(format!("{}/", rel));
            if depth == 0 {
                // Unreadable subdirectories are skipped
                let _ = walk(root, &path, depth + 1, out, truncated);
            }
        } else {
            out.push(rel);
        }
    }
    Ok(())
}

#[async_trait]
impl ContextSeeder for LocalContextSeeder {
    async fn collect(&self) -> ContextBlob {
        let mut blob = ContextBlob::new();

        if let Some(branch) = self.branch().await {
            blob = blob.with_section("Git branch", branch);
        }
        if let Some(status) = self.status().await {
            blob = blob.with_section("Git status", status);
        }
        if let Some(layout) = self.layout() {
            blob = blob.with_section("Directory layout", layout);
        }
        if let Some(readme) = self.readme() {
            blob = blob.with_section("README.md", readme);
        }

        debug!(
            root = %self.root.display(),
            sections = blob.sections.len(),
            "Collected project context"
        );
        blob
    }
}
