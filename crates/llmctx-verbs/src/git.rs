//! Repository metadata through the `git` binary.
//!
//! No git library exists in this stack; the binary is the contract.
//! Every probe is best-effort: a missing binary or a non-zero exit
//! simply yields no entry.

use serde_json::{Map, Value};
use std::path::Path;
use std::process::Command;

/// Collect branch, last commit, remotes and the dirty flag for a
/// repository root. Returns `None` when `root` has no `.git` marker.
pub fn collect_git_info(root: &Path) -> Option<Map<String, Value>> {
    if !root.join(".git").exists() {
        return None;
    }
    let mut info = Map::new();

    if let Some(branch) = git_output(root, &["branch", "--show-current"]) {
        if !branch.is_empty() {
            info.insert("branch".into(), Value::String(branch));
        }
    }

    if let Some(line) = git_output(root, &["log", "-1", "--format=%H%x1f%an%x1f%aI%x1f%s"]) {
        let mut fields = line.split('\u{1f}');
        if let (Some(hash), Some(author), Some(date), Some(subject)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        {
            info.insert("last_commit".into(), Value::String(hash.to_string()));
            info.insert("commit_author".into(), Value::String(author.to_string()));
            info.insert("commit_date".into(), Value::String(date.to_string()));
            info.insert("commit_message".into(), Value::String(subject.to_string()));
        }
    }

    if let Some(remotes) = git_output(root, &["remote", "-v"]) {
        let mut seen = Vec::new();
        for line in remotes.lines() {
            let mut parts = line.split_whitespace();
            if let (Some(name), Some(url)) = (parts.next(), parts.next()) {
                let entry = format!("{name} {url}");
                if !seen.contains(&entry) {
                    seen.push(entry);
                }
            }
        }
        if !seen.is_empty() {
            info.insert(
                "remotes".into(),
                Value::Array(seen.into_iter().map(Value::String).collect()),
            );
        }
    }

    if let Some(status) = git_output(root, &["status", "--porcelain"]) {
        info.insert("dirty".into(), Value::Bool(!status.trim().is_empty()));
    }

    Some(info)
}

fn git_output(root: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_repo_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_git_info(dir.path()).is_none());
    }

    #[test]
    fn test_bare_git_marker_yields_best_effort_info() {
        // A fake .git directory: probes fail, but the result is still a
        // map (possibly empty) rather than an error.
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let info = collect_git_info(dir.path()).unwrap();
        assert!(info.get("branch").is_none() || info["branch"].is_string());
    }
}
