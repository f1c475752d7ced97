//! The describe/get/set contract

use keys_fs::{FailurePolicy, KeyLayout, ProviderConfig};

use crate::context::SetContext;
use crate::enumerate::{Enumeration, enumerate};
use crate::error::Result;
use crate::reconcile::{Reconciler, SetOptions, SetReport, Update};
use crate::record::KeyRecord;
use crate::schema::ProviderSpec;

/// A resource provider as seen by an orchestrator.
pub trait Provider {
    type Record;

    /// Fixed schema of the managed resource.
    fn describe(&self) -> ProviderSpec;

    /// Current state of `names`, or of every resource when `names` is empty.
    /// Names not found come back as absent records.
    fn get(&self, names: &[String]) -> Result<Vec<Self::Record>>;

    /// Converge every update. Failures are reported per update through
    /// `ctx` and the returned report.
    fn set(
        &self,
        updates: &[Update<Self::Record>],
        options: SetOptions,
        ctx: &mut dyn SetContext<Self::Record>,
    ) -> SetReport;
}

/// Provider for `authorized_keys` files under a [`KeyLayout`].
#[derive(Debug, Clone)]
pub struct AuthorizedKeysProvider {
    layout: KeyLayout,
    policy: FailurePolicy,
}

impl AuthorizedKeysProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            layout: KeyLayout::from_config(config)?,
            policy: config.failure_policy,
        })
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Set options using the configured failure policy.
    pub fn options(&self, noop: bool) -> SetOptions {
        SetOptions::new(noop, self.policy)
    }

    /// Like [`Provider::get`], also returning the files that were skipped.
    pub fn enumerate(&self, names: &[String]) -> Result<Enumeration> {
        enumerate(&self.layout, names)
    }
}

impl Provider for AuthorizedKeysProvider {
    type Record = KeyRecord;

    fn describe(&self) -> ProviderSpec {
        ProviderSpec::authorized_keys(self.layout.home_root().is_dir())
    }

    fn get(&self, names: &[String]) -> Result<Vec<KeyRecord>> {
        Ok(self.enumerate(names)?.records)
    }

    fn set(
        &self,
        updates: &[Update],
        options: SetOptions,
        ctx: &mut dyn SetContext<KeyRecord>,
    ) -> SetReport {
        Reconciler::new(&self.layout).apply(updates, options, ctx)
    }
}
