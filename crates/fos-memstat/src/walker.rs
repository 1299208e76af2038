//! Directory tree walker
//!
//! Every directory becomes a sizer scope and every regular file an object
//! keyed by its inode, so hard links are only counted once.

use anyhow::{Context, Result};
use fos_sizer::Sizer;
use std::fs::{self, Metadata};
use std::path::Path;
use tracing::{debug, warn};

/// What a walk visited.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    pub files: usize,
    pub directories: usize,
    /// Entries that could not be read
    pub skipped: usize,
    /// Directories too deep for the scope stack, folded into their parent
    pub flattened: usize,
}

/// Report the tree under `root` into `sizer`, inside a scope named after it.
pub fn walk(sizer: &mut Sizer, root: &Path) -> Result<WalkSummary> {
    let metadata = fs::symlink_metadata(root)
        .with_context(|| format!("failed to read {}", root.display()))?;

    let mut summary = WalkSummary::default();
    let name = scope_name(root);
    if metadata.is_dir() {
        sizer.push(&name);
        visit_dir(sizer, root, &metadata, &mut summary);
        sizer.pop();
    } else {
        sizer.push(&name);
        add_entry(sizer, root, &metadata);
        summary.files += 1;
        sizer.pop();
    }

    debug!(
        files = summary.files,
        directories = summary.directories,
        skipped = summary.skipped,
        "Walk finished"
    );
    Ok(summary)
}

fn visit_dir(sizer: &mut Sizer, dir: &Path, metadata: &Metadata, summary: &mut WalkSummary) {
    summary.directories += 1;
    add_entry(sizer, dir, metadata);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
            summary.skipped += 1;
            return;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            summary.skipped += 1;
            continue;
        };
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping entry");
                summary.skipped += 1;
                continue;
            }
        };

        if metadata.is_dir() {
            match sizer.try_push(&scope_name(&path)) {
                Ok(_) => {
                    visit_dir(sizer, &path, &metadata, summary);
                    sizer.pop();
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Flattening deep directory");
                    summary.flattened += 1;
                    visit_dir(sizer, &path, &metadata, summary);
                }
            }
        } else if metadata.is_file() {
            add_entry(sizer, &path, &metadata);
            summary.files += 1;
        }
    }
}

fn add_entry(sizer: &mut Sizer, path: &Path, metadata: &Metadata) {
    sizer.add_object(identity(path, metadata), metadata.len() as usize);
}

fn scope_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(unix)]
fn identity(_path: &Path, metadata: &Metadata) -> usize {
    use std::os::unix::fs::MetadataExt;
    metadata.ino() as usize
}

#[cfg(not(unix))]
fn identity(path: &Path, _metadata: &Metadata) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    (hasher.finish() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_sizer::{SizerConfig, StatsBuilder};

    fn write(path: &Path, len: usize) {
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    #[test]
    fn test_walk_attributes_files_to_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("textures")).unwrap();
        write(&root.join("textures/rock.dds"), 4000);
        write(&root.join("level.pak"), 1000);

        let mut sizer = Sizer::with_defaults();
        let summary = walk(&mut sizer, root).unwrap();
        sizer.end();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.directories, 2);
        let root_name = scope_name(root);
        let textures = sizer.find(&format!("{root_name}/textures")).unwrap();
        assert!(textures.total_bytes >= 4000);
        assert!(sizer.find(&root_name).unwrap().total_bytes >= 5000);
    }

    #[cfg(unix)]
    #[test]
    fn test_hard_links_counted_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("a")).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        write(&root.join("a/shared.bin"), 8192);
        fs::hard_link(root.join("a/shared.bin"), root.join("b/shared.bin")).unwrap();

        let mut sizer = Sizer::with_defaults();
        let summary = walk(&mut sizer, root).unwrap();
        sizer.end();

        assert_eq!(summary.files, 2);
        let root_name = scope_name(root);
        let a = sizer.find(&format!("{root_name}/a")).unwrap().total_bytes;
        let b = sizer.find(&format!("{root_name}/b")).unwrap().total_bytes;
        // Only one of the two directories owns the file
        assert!((a >= 8192) != (b >= 8192));
    }

    #[test]
    fn test_deep_directories_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("l1/l2/l3");
        fs::create_dir_all(&deep).unwrap();
        write(&deep.join("leaf.txt"), 300);

        let mut sizer = Sizer::new(SizerConfig {
            max_scope_depth: 3,
            ..Default::default()
        });
        let summary = walk(&mut sizer, dir.path()).unwrap();

        assert_eq!(summary.flattened, 2);
        assert_eq!(sizer.scope_depth(), 0);
        let stats = StatsBuilder::new(&mut sizer, 0).build();
        assert!(stats.components().iter().all(|c| c.depth <= 2));
        assert!(stats.total_bytes() >= 300);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sizer = Sizer::with_defaults();
        assert!(walk(&mut sizer, &dir.path().join("missing")).is_err());
    }
}
