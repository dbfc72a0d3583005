//! Exercise workspace on disk
//!
//! ```text
//! rozelle-scaffold/
//! ├── attempt.py
//! └── exercises/
//!     └── example.toml
//! ```

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

pub const DEFAULT_ROOT: &str = "rozelle-scaffold";
const EXERCISES_DIR: &str = "exercises";
const ATTEMPT_FILE: &str = "attempt.py";

const EXAMPLE_EXERCISE: &str = r#"message = """
Print a greeting for everyone in `names`, one per line, in the form
`Hello, <name>!`.
"""

expected_output = """
Hello, Alice!
Hello, Bob!
"""

[code]
prerun = """
names = ["Alice", "Bob"]
"""

[[constraints]]
description = "You must use at least one `for` loop."
node = "For"
min_required = 1

[[constraints]]
description = "You cannot use `while` loops."
node = "While"
max_allowed = 0
"#;

pub fn attempt_path(root: &Path) -> PathBuf {
    root.join(ATTEMPT_FILE)
}

pub fn exercise_path(root: &Path, name: &str) -> PathBuf {
    let file = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{}.toml", name)
    };
    root.join(EXERCISES_DIR).join(file)
}

/// Create a fresh workspace with the example exercise and an empty attempt.
pub fn init(root: &Path) -> Result<()> {
    if root.is_dir() {
        bail!("Folder '{}' already exists", root.display());
    }

    let files = [
        (exercise_path(root, "example"), EXAMPLE_EXERCISE),
        (attempt_path(root), ""),
    ];
    for (path, content) in files {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create folder '{}'", parent.display()))?;
        }
        fs::write(&path, content)
            .with_context(|| format!("Failed to create file '{}'", path.display()))?;
    }
    Ok(())
}

/// All exercise files under the workspace, sorted by path.
pub fn exercises(root: &Path) -> Result<Vec<PathBuf>> {
    let dir = root.join(EXERCISES_DIR);
    if !dir.is_dir() {
        bail!("No exercises folder found at '{}'", dir.display());
    }

    let mut found: Vec<PathBuf> = WalkDir::new(&dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    found.sort();
    Ok(found)
}

/// Pick one of `exercises` by `seed`. `None` only when the list is empty.
pub fn choose(exercises: &[PathBuf], seed: u128) -> Option<&PathBuf> {
    if exercises.is_empty() {
        return None;
    }
    let index = (seed % exercises.len() as u128) as usize;
    exercises.get(index)
}

/// A random exercise from the workspace.
pub fn random_exercise(root: &Path) -> Result<PathBuf> {
    let found = exercises(root)?;
    choose(&found, Uuid::new_v4().as_u128())
        .cloned()
        .with_context(|| format!("No exercises found under '{}'", root.display()))
}

/// Display name of an exercise: its path relative to the exercises folder.
pub fn exercise_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root.join(EXERCISES_DIR))
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}
