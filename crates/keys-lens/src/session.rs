//! Scoped edit transactions
//!
//! A [`Session`] loads files into a [`Tree`], lets callers edit the tree, and
//! either writes the changed files back or discards everything. Dropping a
//! session without calling [`Session::commit`] discards all edits.

use keys_fs::NormalizedPath;
use keys_fs::io::{content_checksum, read_optional, write_atomic};

use crate::diff::FileDiff;
use crate::error::{Error, Result};
use crate::lens::Lens;
use crate::tree::Tree;

/// Whether a commit touches the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Write every changed file
    #[default]
    Persist,
    /// Compute the changes but write nothing
    Noop,
}

/// What a commit did, or would have done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Files written to disk
    pub written: Vec<NormalizedPath>,
    /// Files that differ from disk but were left alone (no-op mode)
    pub pending: Vec<NormalizedPath>,
}

/// One edit transaction over a set of files.
#[derive(Debug)]
pub struct Session {
    tree: Tree,
}

impl Session {
    /// Load `files` into a fresh tree.
    ///
    /// A missing file is loaded as an empty skeleton. Fails on the first file
    /// that cannot be read or parsed.
    pub fn load<L: Lens + 'static>(lens: L, files: &[NormalizedPath]) -> Result<Self> {
        let mut tree = Tree::new(lens);
        for path in files {
            let text = read(path)?;
            tree.add_file(path, text.as_deref())?;
        }
        Ok(Self { tree })
    }

    /// Load only the files that exist.
    pub fn load_existing<L: Lens + 'static>(lens: L, files: &[NormalizedPath]) -> Result<Self> {
        let mut tree = Tree::new(lens);
        for path in files {
            match read(path)? {
                Some(text) => {
                    tree.add_file(path, Some(&text))?;
                }
                None => tracing::debug!(path = %path, "Skipping missing file"),
            }
        }
        Ok(Self { tree })
    }

    /// Load every file independently, collecting failures instead of
    /// stopping at the first one.
    ///
    /// Files that fail are left out of the tree. Missing files are skipped.
    pub fn load_each<L: Lens + 'static>(
        lens: L,
        files: &[NormalizedPath],
    ) -> (Self, Vec<(NormalizedPath, Error)>) {
        let mut tree = Tree::new(lens);
        let mut failures = Vec::new();
        for path in files {
            let loaded = read(path).and_then(|text| match text {
                Some(text) => tree.add_file(path, Some(&text)).map(|_| ()),
                None => Ok(()),
            });
            if let Err(e) = loaded {
                tracing::warn!(path = %path, "Skipping file: {}", e);
                failures.push((path.clone(), e));
            }
        }
        (Self { tree }, failures)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Files whose rendering differs from what was loaded.
    pub fn pending_changes(&self) -> Result<Vec<NormalizedPath>> {
        let mut changed = Vec::new();
        for path in self.tree.files() {
            if self.tree.is_modified(path)? {
                changed.push(path.clone());
            }
        }
        Ok(changed)
    }

    /// Unified diffs for every changed file.
    pub fn diff(&self) -> Result<Vec<FileDiff>> {
        self.pending_changes()?
            .iter()
            .map(|path| {
                let rendered = self.tree.render_file(path)?;
                Ok(FileDiff::compute(
                    path,
                    self.tree.original_text(path)?,
                    &rendered,
                ))
            })
            .collect()
    }

    /// End the transaction.
    ///
    /// With [`SaveMode::Persist`] every changed file is rendered and written
    /// atomically; untouched files are never rewritten. With
    /// [`SaveMode::Noop`] nothing is written and the changed files are
    /// reported as pending.
    pub fn commit(self, mode: SaveMode) -> Result<CommitReport> {
        let mut report = CommitReport::default();
        for path in self.pending_changes()? {
            if mode == SaveMode::Noop {
                tracing::info!("[noop] Would write {}", path);
                report.pending.push(path);
                continue;
            }

            let rendered = self.tree.render_file(&path)?;
            self.warn_if_stale(&path)?;
            write_atomic(&path, rendered.as_bytes()).map_err(|source| Error::WriteError {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path, bytes = rendered.len(), "Wrote file");
            report.written.push(path);
        }
        Ok(report)
    }

    /// Warn when the file on disk no longer matches what was loaded.
    fn warn_if_stale(&self, path: &NormalizedPath) -> Result<()> {
        let loaded = self.tree.original_text(path)?.map(content_checksum);
        let current = read(path)?.as_deref().map(content_checksum);
        if loaded != current {
            tracing::warn!(
                path = %path,
                "File changed on disk since it was loaded; overwriting"
            );
        }
        Ok(())
    }
}

fn read(path: &NormalizedPath) -> Result<Option<String>> {
    read_optional(path).map_err(|source| Error::ReadError {
        path: path.clone(),
        source,
    })
}
