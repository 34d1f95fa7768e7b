//! Directory / repository structure loader.
//!
//! Produces a [`StructureRecord`]: a bounded, filtered file list plus a
//! stat tree and repo/dir info. Binary files never enter the file list
//! (known-binary extension, >10 MiB, or a NUL byte in the first 1 KiB).

use crate::git::collect_git_info;
use chrono::{DateTime, Utc};
use llmctx_core::{
    Artifact, CommandMap, FileNode, LlmctxError, Payload, Result, StructureKind, StructureRecord,
};
use llmctx_engine::{Loaded, Runtime};
use log::debug;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Size bound above which a file is treated as binary.
const BINARY_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// Extensions never collected into the file list.
const BINARY_EXTENSIONS: &[&str] = &[
    "exe", "dll", "so", "dylib", "bin", "o", "a", "obj", "pyc", "class", "jar", "war", "zip",
    "tar", "gz", "bz2", "xz", "7z", "rar", "pdf", "docx", "pptx", "xlsx", "png", "jpg", "jpeg",
    "gif", "bmp", "webp", "ico", "heic", "mp3", "mp4", "avi", "mov", "woff", "woff2", "ttf",
    "eot", "db", "sqlite", "parquet",
];

/// Ignore entries for `ignore:standard` (the default).
const STANDARD_IGNORES: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    ".idea",
    ".vscode",
    "dist",
    "build",
    ".DS_Store",
];

/// Ignore entries for `ignore:minimal`.
const MINIMAL_IGNORES: &[&str] = &[".git"];

/// Structure loader for directories, git repositories and glob
/// patterns.
pub fn load_structure(_rt: &Runtime, mut att: Artifact) -> Result<Loaded> {
    let record = if att.path().contains(['*', '?']) {
        collect_glob(att.path(), &att.commands)?
    } else {
        collect_directory(Path::new(att.path()), &att.commands)?
    };

    att.set_meta("file_count", record.files.len());
    att.set_meta("is_git_repo", record.kind == StructureKind::GitRepository);
    att.set_meta("directory_path", record.root.to_string_lossy().into_owned());
    debug!(
        "structure '{}': {} file(s), kind {}",
        att.path(),
        record.files.len(),
        record.kind.label()
    );
    att.set_payload(Payload::Structure(record));
    Ok(Loaded::One(att))
}

fn collect_directory(root: &Path, commands: &CommandMap) -> Result<StructureRecord> {
    if !root.is_dir() {
        return Err(LlmctxError::load(
            "directory_structure",
            &root.to_string_lossy(),
            "not a directory",
        ));
    }

    let ignores = ignore_patterns(root, commands);
    let globs = glob_filters(commands);
    let max_files = commands.max_files();
    let recursive = commands.recursive();

    let mut files = Vec::new();
    let tree = walk(root, root, &ignores, &globs, recursive, max_files, &mut files);

    let kind = if root.join(".git").exists() {
        StructureKind::GitRepository
    } else {
        StructureKind::Directory
    };
    let mut info = base_info(&files);
    if let Some(git) = collect_git_info(root) {
        info.extend(git);
    }

    Ok(StructureRecord {
        kind,
        root: root.to_path_buf(),
        files,
        tree,
        info,
    })
}

fn collect_glob(pattern: &str, commands: &CommandMap) -> Result<StructureRecord> {
    let matches = glob::glob(pattern).map_err(|e| {
        LlmctxError::invalid_value("glob", pattern, e.to_string())
    })?;

    let max_files = commands.max_files();
    let mut files = Vec::new();
    let mut children = Vec::new();
    for entry in matches.flatten() {
        if files.len() >= max_files {
            break;
        }
        if entry.is_file() && !is_binary_file(&entry) {
            children.push(stat_node(&entry));
            files.push(entry);
        }
    }

    let info = base_info(&files);
    let mut tree = FileNode {
        name: pattern.to_string(),
        is_dir: true,
        ..FileNode::default()
    };
    tree.children = children;

    Ok(StructureRecord {
        kind: StructureKind::Directory,
        root: PathBuf::from("."),
        files,
        tree,
        info,
    })
}

fn base_info(files: &[PathBuf]) -> Map<String, Value> {
    let total_size: u64 = files
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();
    let mut info = Map::new();
    info.insert("file_count".into(), Value::from(files.len()));
    info.insert("total_size".into(), Value::from(total_size));
    info
}

fn walk(
    root: &Path,
    dir: &Path,
    ignores: &[glob::Pattern],
    globs: &[glob::Pattern],
    recursive: bool,
    max_files: usize,
    files: &mut Vec<PathBuf>,
) -> FileNode {
    let mut node = stat_node(dir);
    let Ok(entries) = std::fs::read_dir(dir) else {
        return node;
    };

    let mut entries: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    entries.sort();

    for path in entries {
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if is_ignored(relative, ignores) {
            continue;
        }
        if path.is_dir() {
            if recursive {
                node.children
                    .push(walk(root, &path, ignores, globs, recursive, max_files, files));
            } else {
                node.children.push(stat_node(&path));
            }
        } else {
            node.children.push(stat_node(&path));
            if files.len() < max_files
                && glob_selected(relative, globs)
                && !is_binary_file(&path)
            {
                files.push(path);
            }
        }
    }
    node
}

fn ignore_patterns(root: &Path, commands: &CommandMap) -> Vec<glob::Pattern> {
    let spec = commands.get("ignore").unwrap_or("standard");
    let names: Vec<String> = match spec {
        "standard" => STANDARD_IGNORES.iter().map(ToString::to_string).collect(),
        "minimal" => MINIMAL_IGNORES.iter().map(ToString::to_string).collect(),
        "gitignore" => {
            let mut names: Vec<String> = MINIMAL_IGNORES.iter().map(ToString::to_string).collect();
            if let Ok(content) = std::fs::read_to_string(root.join(".gitignore")) {
                for line in content.lines() {
                    let line = line.trim().trim_end_matches('/');
                    if !line.is_empty() && !line.starts_with('#') {
                        names.push(line.to_string());
                    }
                }
            }
            names
        }
        custom => custom.split(',').map(|p| p.trim().to_string()).collect(),
    };
    names
        .iter()
        .filter_map(|name| glob::Pattern::new(name).ok())
        .collect()
}

fn glob_filters(commands: &CommandMap) -> Vec<glob::Pattern> {
    commands
        .get("glob")
        .map(|spec| {
            spec.split(',')
                .filter_map(|p| glob::Pattern::new(p.trim()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn is_ignored(relative: &Path, ignores: &[glob::Pattern]) -> bool {
    ignores.iter().any(|pattern| {
        relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| pattern.matches(name))
        }) || pattern.matches(&relative.to_string_lossy())
    })
}

fn glob_selected(relative: &Path, globs: &[glob::Pattern]) -> bool {
    if globs.is_empty() {
        return true;
    }
    globs.iter().any(|pattern| {
        pattern.matches(&relative.to_string_lossy())
            || relative
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| pattern.matches(name))
    })
}

/// Binary heuristic: known-binary extension, oversized, or a NUL byte
/// in the first 1 KiB.
pub fn is_binary_file(path: &Path) -> bool {
    if path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
    {
        return true;
    }
    let Ok(meta) = std::fs::metadata(path) else {
        return true;
    };
    if meta.len() > BINARY_SIZE_LIMIT {
        return true;
    }
    let Ok(mut file) = std::fs::File::open(path) else {
        return true;
    };
    let mut head = [0u8; 1024];
    match file.read(&mut head) {
        Ok(n) => head[..n].contains(&0),
        Err(_) => true,
    }
}

fn stat_node(path: &Path) -> FileNode {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let Ok(meta) = std::fs::metadata(path) else {
        return FileNode {
            name,
            ..FileNode::default()
        };
    };

    let modified = meta
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339());

    #[cfg(unix)]
    let (permissions, owner, group, mode_octal, inode, links) = {
        use std::os::unix::fs::MetadataExt;
        let mode = meta.mode();
        (
            permission_string(mode),
            meta.uid(),
            meta.gid(),
            format!("{:o}", mode & 0o7777),
            meta.ino(),
            meta.nlink(),
        )
    };
    #[cfg(not(unix))]
    let (permissions, owner, group, mode_octal, inode, links) =
        (String::new(), 0u32, 0u32, String::new(), 0u64, 0u64);

    FileNode {
        name,
        is_dir: meta.is_dir(),
        size: meta.len(),
        permissions,
        owner,
        group,
        mode_octal,
        inode,
        links,
        modified,
        children: Vec::new(),
    }
}

#[cfg(unix)]
fn permission_string(mode: u32) -> String {
    let mut out = String::with_capacity(9);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
