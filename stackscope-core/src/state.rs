//! Local state directory discovery.
//!
//! A state directory stores one checkpoint per stack at
//! `.pulumi/stacks/<project>/<stack>.json`.

use crate::error::{Result, StateError};
use crate::stack::Stack;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Location of the stacks tree inside a state directory.
pub const STACKS_DIR: &str = ".pulumi/stacks";

/// Summary of one stack checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackInfo {
    pub name: String,
    pub last_updated: DateTime<Utc>,
}

/// A project and the stacks it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub stacks: Vec<StackInfo>,
}

/// Lists every project and stack under a state directory.
///
/// Projects and their stacks come back sorted by name. A state directory
/// without a stacks tree simply has no projects.
pub fn list_projects(state_dir: &Path) -> Result<Vec<Project>> {
    if !state_dir.is_dir() {
        return Err(StateError::NotADirectory(state_dir.to_path_buf()));
    }

    let stacks_dir = state_dir.join(STACKS_DIR);
    let mut projects: BTreeMap<String, Vec<StackInfo>> = BTreeMap::new();

    for entry in WalkDir::new(&stacks_dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // A missing stacks tree is reported as an error on the root.
                if e.depth() > 0 {
                    warn!("Skipping unreadable state entry: {}", e);
                }
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }

        let (Some(project), Some(stack)) = (
            path.parent().and_then(Path::file_name),
            path.file_stem(),
        ) else {
            continue;
        };

        let last_updated = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_default();

        projects
            .entry(project.to_string_lossy().into_owned())
            .or_default()
            .push(StackInfo {
                name: stack.to_string_lossy().into_owned(),
                last_updated,
            });
    }

    debug!(
        "Found {} projects under {}",
        projects.len(),
        stacks_dir.display()
    );

    Ok(projects
        .into_iter()
        .map(|(name, mut stacks)| {
            stacks.sort_by(|a, b| a.name.cmp(&b.name));
            Project { name, stacks }
        })
        .collect())
}

/// Path of a stack checkpoint inside a state directory.
pub fn stack_path(state_dir: &Path, project: &str, stack: &str) -> PathBuf {
    state_dir
        .join(STACKS_DIR)
        .join(project)
        .join(format!("{}.json", stack))
}

/// Loads a stack from a state directory.
pub fn load_stack(state_dir: &Path, project: &str, stack: &str) -> Result<Stack> {
    let path = stack_path(state_dir, project, stack);
    if !path.is_file() {
        return Err(StateError::StackNotFound {
            project: project.to_string(),
            stack: stack.to_string(),
        });
    }
    Stack::load(&path)
}
