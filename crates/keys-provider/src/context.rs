//! Change and error reporting during `set`

use crate::error::Error;
use crate::reconcile::Update;

/// Collaborator told about every change and failure while updates are applied.
pub trait SetContext<R> {
    /// An update failed; it made no change.
    fn report_error(&mut self, update: &Update<R>, error: &Error);

    /// An attribute of the updated resource changed, or the whole resource
    /// when `attribute` is `None`.
    fn report_change(&mut self, update: &Update<R>, attribute: Option<&str>);
}

/// Keeps every report in order of arrival.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingContext {
    /// `(name, message)` per failed update
    pub errors: Vec<(String, String)>,
    /// `(name, attribute)` per change
    pub changes: Vec<(String, Option<String>)>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes reported as changed for `name`.
    pub fn changes_for(&self, name: &str) -> Vec<Option<&str>> {
        self.changes
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, attribute)| attribute.as_deref())
            .collect()
    }
}

impl<R> SetContext<R> for RecordingContext {
    fn report_error(&mut self, update: &Update<R>, error: &Error) {
        self.errors.push((update.name.clone(), error.to_string()));
    }

    fn report_change(&mut self, update: &Update<R>, attribute: Option<&str>) {
        self.changes
            .push((update.name.clone(), attribute.map(str::to_string)));
    }
}
