use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::BatchError;
use crate::work::WorkItem;

/// Where a batch's identifiers come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkSource {
    /// Every regular file under `root` whose extension is allowed
    Directory {
        root: PathBuf,
        extensions: Vec<String>,
        follow_links: bool,
    },
    /// An explicit ordered list, taken as is
    Identifiers(Vec<String>),
}

impl WorkSource {
    pub fn directory(root: impl Into<PathBuf>, extensions: &[String], follow_links: bool) -> Self {
        WorkSource::Directory {
            root: root.into(),
            extensions: extensions.to_vec(),
            follow_links,
        }
    }
}

/// Enumerate a source into indexed work items
///
/// Directory walks are recursive, include hidden files and ignore
/// `.gitignore` rules; paths are sorted so the batch order is stable.
/// A missing root is invalid input. An empty result is not an error.
pub fn discover(source: &WorkSource) -> Result<Vec<WorkItem>, BatchError> {
    match source {
        WorkSource::Identifiers(identifiers) => Ok(WorkItem::batch(identifiers.iter().cloned())),
        WorkSource::Directory {
            root,
            extensions,
            follow_links,
        } => {
            let paths = walk(root, extensions, *follow_links)?;
            Ok(WorkItem::batch(
                paths.into_iter().map(|path| path.display().to_string()),
            ))
        }
    }
}

fn walk(root: &Path, extensions: &[String], follow_links: bool) -> Result<Vec<PathBuf>, BatchError> {
    if !root.exists() {
        return Err(BatchError::InvalidInput(format!(
            "directory {} does not exist",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(BatchError::InvalidInput(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let allowed: HashSet<String> = extensions.iter().map(|ext| normalize_extension(ext)).collect();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(follow_links)
        .build();

    let mut paths = Vec::new();
    let mut walk_errors = 0usize;
    for entry in walker {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                if allowed.is_empty() || has_allowed_extension(entry.path(), &allowed) {
                    paths.push(entry.into_path());
                }
            }
            Err(e) => {
                walk_errors += 1;
                tracing::warn!("Walk error under {}: {}", root.display(), e);
            }
        }
    }

    paths.sort();
    tracing::info!(
        "Discovered {} files under {} ({} walk errors)",
        paths.len(),
        root.display(),
        walk_errors
    );
    Ok(paths)
}

/// `txt`, `.txt` and `.TXT` all mean the same thing
fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim().trim_start_matches('.').to_lowercase())
}

fn has_allowed_extension(path: &Path, allowed: &HashSet<String>) -> bool {
    path.extension()
        .map(|ext| allowed.contains(&normalize_extension(&ext.to_string_lossy())))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recursive_walk_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.JSON"), "{}").unwrap();
        fs::write(dir.path().join("skip.bin"), [0u8; 4]).unwrap();
        fs::write(dir.path().join("nested/deeper/c.py"), "print()").unwrap();
        fs::write(dir.path().join(".hidden.md"), "# hi").unwrap();

        let source = WorkSource::directory(dir.path(), &exts(&[".txt", "json", ".py", ".md"]), false);
        let items = discover(&source).unwrap();

        let names: Vec<String> = items
            .iter()
            .map(|item| {
                Path::new(&item.identifier)
                    .strip_prefix(dir.path())
                    .unwrap()
                    .display()
                    .to_string()
            })
            .collect();
        assert_eq!(names, vec![".hidden.md", "a.JSON", "b.txt", "nested/deeper/c.py"]);
        assert_eq!(items.iter().map(|i| i.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_gitignore_is_not_honored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.txt\n").unwrap();
        fs::write(dir.path().join("kept.txt"), "x").unwrap();

        let items = discover(&WorkSource::directory(dir.path(), &exts(&[".txt"]), false)).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_invalid_input() {
        let source = WorkSource::directory("/definitely/not/here", &exts(&[".txt"]), false);
        assert!(matches!(discover(&source), Err(BatchError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_directory_is_no_work() {
        let dir = TempDir::new().unwrap();
        let items = discover(&WorkSource::directory(dir.path(), &exts(&[".txt"]), false)).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_identifier_list_keeps_order() {
        let items = discover(&WorkSource::Identifiers(exts(&["z", "a", "m"]))).unwrap();
        assert_eq!(items[0], WorkItem::new(0, "z"));
        assert_eq!(items[2], WorkItem::new(2, "m"));
    }
}
