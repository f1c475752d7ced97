//! Text diffs of pending file changes

use keys_fs::NormalizedPath;
use similar::{ChangeTag, TextDiff};

/// Lines of context around each hunk
const CONTEXT_RADIUS: usize = 3;

/// Line-level difference between a file on disk and its pending rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: NormalizedPath,
    /// Unified diff text, empty when nothing changed
    pub unified: String,
    /// Number of inserted lines
    pub added: usize,
    /// Number of deleted lines
    pub removed: usize,
}

impl FileDiff {
    /// Compare `old` (what was loaded, `None` for a new file) with `new`.
    pub fn compute(path: &NormalizedPath, old: Option<&str>, new: &str) -> Self {
        let old_text = old.unwrap_or_default();
        if old_text == new {
            return Self {
                path: path.clone(),
                unified: String::new(),
                added: 0,
                removed: 0,
            };
        }

        let text_diff = TextDiff::from_lines(old_text, new);
        let (mut added, mut removed) = (0, 0);
        for change in text_diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => added += 1,
                ChangeTag::Delete => removed += 1,
                ChangeTag::Equal => {}
            }
        }

        let before = match old {
            Some(_) => path.as_str().to_string(),
            None => "/dev/null".to_string(),
        };
        let unified = text_diff
            .unified_diff()
            .context_radius(CONTEXT_RADIUS)
            .header(&before, path.as_str())
            .to_string();

        Self {
            path: path.clone(),
            unified,
            added,
            removed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}
