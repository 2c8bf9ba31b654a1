//! Project discovery and paths.
//!
//! The database lives in a `.track/` marker directory at the main
//! repository root, so every linked git worktree shares one database:
//! from a worktree, `git rev-parse --git-common-dir` points back at the
//! main checkout. Outside git the current directory is the project root.
//!
//! No ambient singletons: callers resolve a path here and pass the opened
//! store handle into every engine call.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the marker directory created at the project root.
pub const TRACK_DIR: &str = ".track";

/// Name of the SQLite database file inside [`TRACK_DIR`].
pub const DB_FILE: &str = "track.db";

fn git_output(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The main repository root shared by all worktrees.
///
/// From a linked worktree (where `.git` is a file, not a directory) the
/// common dir's parent is the main checkout; otherwise the current
/// directory stands.
#[must_use]
pub fn project_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let git_path = cwd.join(".git");
    if !git_path.exists() || git_path.is_file() {
        if let Some(common_dir) = git_output(&["rev-parse", "--git-common-dir"]) {
            if common_dir != ".git" {
                let resolved = cwd.join(&common_dir);
                if let Some(parent) = resolved.parent() {
                    return parent.to_path_buf();
                }
            }
        }
    }

    cwd
}

/// Path to the `.track/` directory at the project root.
#[must_use]
pub fn track_dir() -> PathBuf {
    project_root().join(TRACK_DIR)
}

/// Path to the SQLite database file.
#[must_use]
pub fn db_path() -> PathBuf {
    track_dir().join(DB_FILE)
}

/// Whether a track project exists here.
#[must_use]
pub fn project_exists() -> bool {
    track_dir().is_dir()
}

/// Current worktree name, `None` in the main checkout or outside git.
///
/// The name is the basename of the worktree's toplevel directory.
#[must_use]
pub fn current_worktree() -> Option<String> {
    let toplevel = PathBuf::from(git_output(&["rev-parse", "--show-toplevel"])?);
    let common_dir = git_output(&["rev-parse", "--git-common-dir"])?;

    let cwd = std::env::current_dir().ok()?;
    let main_root = cwd.join(common_dir).parent()?.to_path_buf();

    if toplevel == main_root {
        return None;
    }
    toplevel
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

fn package_json_name(dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let pkg: serde_json::Value = serde_json::from_str(&content).ok()?;
    pkg.get("name")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
}

/// Scan a TOML-ish file for `name = "..."` inside the given section.
///
/// A full TOML parser is overkill for one key; this mirrors the lenient
/// lookup the original tool shipped.
fn toml_section_name(dir: &Path, file: &str, section: &str) -> Option<String> {
    let content = std::fs::read_to_string(dir.join(file)).ok()?;

    let mut in_section = false;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_section = line == section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some(rest) = line.strip_prefix("name") {
            let rest = rest.trim_start();
            if let Some(value) = rest.strip_prefix('=') {
                let value = value.trim().trim_matches(['"', '\'']).trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Detect the project name for `init`.
///
/// Priority: `package.json` name, `pyproject.toml` `[project]` name,
/// `Cargo.toml` `[package]` name, then the directory basename.
#[must_use]
pub fn detect_project_name(dir: &Path) -> String {
    package_json_name(dir)
        .or_else(|| toml_section_name(dir, "pyproject.toml", "[project]"))
        .or_else(|| toml_section_name(dir, "Cargo.toml", "[package]"))
        .or_else(|| {
            dir.file_name().map(|name| name.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "project".to_string())
}
