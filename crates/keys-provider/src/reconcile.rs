//! Applying desired state to key files
//!
//! Updates are applied in input order. Every update resolves its own target
//! file from its `user`; updates that share a target share one [`Session`],
//! so each file is loaded once and committed once. A failed update leaves the
//! tree exactly as it found it, so the other updates in its file still
//! commit.

use std::sync::Arc;

use keys_fs::{FailurePolicy, KeyLayout, NormalizedPath};
use keys_lens::{AuthorizedKeysLens, FileDiff, Node, SaveMode, Session, labels};
use tracing::{debug, warn};

use crate::context::SetContext;
use crate::error::{Error, Result};
use crate::mapper;
use crate::record::{Ensure, KeyRecord};

/// One desired-state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update<R = KeyRecord> {
    pub name: String,
    /// State observed before the change, if the caller has it
    pub is: Option<R>,
    pub should: R,
}

impl<R> Update<R> {
    pub fn new(name: impl Into<String>, should: R) -> Self {
        Self {
            name: name.into(),
            is: None,
            should,
        }
    }

    pub fn with_is(mut self, is: R) -> Self {
        self.is = Some(is);
        self
    }
}

impl Update<KeyRecord> {
    /// An update whose name is taken from the desired record.
    pub fn from_record(should: KeyRecord) -> Self {
        Self::new(should.name.clone(), should)
    }
}

/// How a batch of updates is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Compute every change but write nothing
    pub noop: bool,
    pub policy: FailurePolicy,
}

impl SetOptions {
    pub fn new(noop: bool, policy: FailurePolicy) -> Self {
        Self { noop, policy }
    }
}

/// What happened to one update.
#[derive(Debug, Clone)]
pub enum UpdateStatus {
    /// The resource changed; `changes` lists the attributes involved
    Applied { changes: Vec<String> },
    /// Already in the desired state
    Unchanged,
    /// Nothing was changed for this update
    Failed(Arc<Error>),
    /// Not attempted because an earlier update failed under
    /// [`FailurePolicy::Abort`]
    Skipped,
}

#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub name: String,
    /// Resolved key file, when resolution got that far
    pub target: Option<NormalizedPath>,
    pub status: UpdateStatus,
}

/// Per-update results of a `set` call.
#[derive(Debug, Clone, Default)]
pub struct SetReport {
    /// One outcome per update, in input order
    pub outcomes: Vec<UpdateOutcome>,
    /// Text diff of every file that changed (or would change)
    pub diffs: Vec<FileDiff>,
    /// Files written to disk
    pub written: Vec<NormalizedPath>,
}

impl SetReport {
    /// True when no update failed or was skipped.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| {
            matches!(
                o.status,
                UpdateStatus::Applied { .. } | UpdateStatus::Unchanged
            )
        })
    }

    pub fn changed(&self) -> impl Iterator<Item = &UpdateOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, UpdateStatus::Applied { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            UpdateStatus::Failed(error) => Some((o.name.as_str(), error.as_ref())),
            _ => None,
        })
    }
}

/// Edits on one target file.
struct FileGroup {
    target: NormalizedPath,
    session: std::result::Result<Session, Arc<Error>>,
    /// Updates that changed something, by input index
    applied: Vec<usize>,
}

/// Applies updates against the files of a [`KeyLayout`].
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    layout: &'a KeyLayout,
}

impl<'a> Reconciler<'a> {
    pub fn new(layout: &'a KeyLayout) -> Self {
        Self { layout }
    }

    pub fn apply(
        &self,
        updates: &[Update],
        options: SetOptions,
        ctx: &mut dyn SetContext<KeyRecord>,
    ) -> SetReport {
        let mut outcomes: Vec<UpdateOutcome> = updates
            .iter()
            .map(|update| UpdateOutcome {
                name: update.name.clone(),
                target: None,
                status: UpdateStatus::Skipped,
            })
            .collect();
        let mut groups: Vec<FileGroup> = Vec::new();

        for (index, update) in updates.iter().enumerate() {
            debug!(name = %update.name, ensure = %update.should.ensure, "Applying update");
            match self.stage(&mut groups, update, &mut outcomes[index].target) {
                Ok((_, changes)) if changes.is_empty() => {
                    outcomes[index].status = UpdateStatus::Unchanged;
                }
                Ok((group, changes)) => {
                    groups[group].applied.push(index);
                    outcomes[index].status = UpdateStatus::Applied { changes };
                }
                Err(error) => {
                    ctx.report_error(update, &error);
                    outcomes[index].status = UpdateStatus::Failed(error);
                    if options.policy == FailurePolicy::Abort {
                        warn!(name = %update.name, "Update failed; skipping the rest of the batch");
                        break;
                    }
                }
            }
        }

        let mut report = SetReport {
            outcomes,
            ..SetReport::default()
        };
        let mode = if options.noop {
            SaveMode::Noop
        } else {
            SaveMode::Persist
        };

        for group in groups {
            let FileGroup {
                target,
                session,
                applied,
            } = group;
            // Sessions with no applied update are dropped unchanged
            let Ok(session) = session else { continue };
            if applied.is_empty() {
                continue;
            }

            match session.diff() {
                Ok(diffs) => report.diffs.extend(diffs),
                Err(e) => warn!(path = %target, "Failed to diff: {}", e),
            }

            match session.commit(mode) {
                Ok(commit) => {
                    report.written.extend(commit.written);
                    for &index in &applied {
                        if let UpdateStatus::Applied { changes } = &report.outcomes[index].status {
                            for attribute in changes {
                                ctx.report_change(&updates[index], Some(attribute.as_str()));
                            }
                        }
                    }
                }
                Err(e) => {
                    let error = Arc::new(Error::from(e));
                    for &index in &applied {
                        ctx.report_error(&updates[index], &error);
                        report.outcomes[index].status = UpdateStatus::Failed(Arc::clone(&error));
                    }
                }
            }
        }
        report
    }

    /// Apply one update to the session of its target file, returning the
    /// group index and the changed attributes.
    fn stage(
        &self,
        groups: &mut Vec<FileGroup>,
        update: &Update,
        target_slot: &mut Option<NormalizedPath>,
    ) -> std::result::Result<(usize, Vec<String>), Arc<Error>> {
        let target = self.resolve(update).map_err(Arc::new)?;
        *target_slot = Some(target.clone());

        let index = open_group(groups, target);
        let FileGroup {
            target, session, ..
        } = &mut groups[index];
        let session = session.as_mut().map_err(|e| Arc::clone(e))?;
        let changes = apply_update(session, target, update).map_err(Arc::new)?;
        Ok((index, changes))
    }

    /// Validate an update and resolve the file it belongs in.
    fn resolve(&self, update: &Update) -> Result<NormalizedPath> {
        let name = update.name.as_str();
        let should = &update.should;
        if let Ensure::Unknown(value) = &should.ensure {
            return Err(Error::UnknownEnsureValue {
                name: name.to_string(),
                value: value.clone(),
            });
        }
        let user = should
            .user
            .as_deref()
            .ok_or_else(|| Error::missing(name, "user"))?;
        if should.is_present() {
            if should.key.is_none() {
                return Err(Error::missing(name, "key"));
            }
            if should.key_type.is_none() {
                return Err(Error::missing(name, "type"));
            }
        }
        Ok(self.layout.file_for(user)?)
    }
}

fn open_group(groups: &mut Vec<FileGroup>, target: NormalizedPath) -> usize {
    if let Some(index) = groups.iter().position(|g| g.target == target) {
        return index;
    }
    let session = Session::load(AuthorizedKeysLens, std::slice::from_ref(&target))
        .map_err(|e| Arc::new(Error::from(e)));
    groups.push(FileGroup {
        target,
        session,
        applied: Vec::new(),
    });
    groups.len() - 1
}

/// Converge one entry. On error the tree is left untouched.
fn apply_update(session: &mut Session, target: &NormalizedPath, update: &Update) -> Result<Vec<String>> {
    let name = update.name.as_str();
    let path = mapper::entry_path(target, name);
    let tree = session.tree_mut();

    let existing: Option<Node> = tree
        .get(&path)
        .map_err(|e| match e {
            keys_lens::Error::MultipleMatches { count, .. } => Error::MultipleMatches {
                name: name.to_string(),
                target: target.clone(),
                count,
            },
            other => Error::Lens(other),
        })?
        .cloned();

    match &update.should.ensure {
        Ensure::Absent => {
            if existing.is_none() {
                return Ok(Vec::new());
            }
            tree.remove(&path)?;
            Ok(vec!["ensure".to_string()])
        }
        Ensure::Present => {
            let desired = KeyRecord {
                name: name.to_string(),
                ..update.should.clone()
            };
            let entry = mapper::entry_from_record(&desired)?;
            let changes = match &existing {
                None => vec!["ensure".to_string()],
                Some(current) => changed_attributes(current, entry.node()),
            };
            tree.move_into(entry, &path)?;
            Ok(changes)
        }
        Ensure::Unknown(value) => Err(Error::UnknownEnsureValue {
            name: name.to_string(),
            value: value.clone(),
        }),
    }
}

fn changed_attributes(current: &Node, desired: &Node) -> Vec<String> {
    let mut changes = Vec::new();
    if current.value() != desired.value() {
        changes.push("key".to_string());
    }
    if current.child_value(labels::TYPE) != desired.child_value(labels::TYPE) {
        changes.push("type".to_string());
    }
    if mapper::entry_options(current) != mapper::entry_options(desired) {
        changes.push("options".to_string());
    }
    changes
}
