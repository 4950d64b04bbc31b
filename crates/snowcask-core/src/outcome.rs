//! Per-object failure handling for batch loops.
//!
//! Every loop over already-listed objects states its [`FailurePolicy`] when it
//! folds a result into a [`BatchReport`], so whether a failure stops the pass
//! or is recorded and skipped is decided at the call site.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::kind::ObjectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record recoverable per-object failures and keep going.
    SkipAndLog,
    /// Return the first failure to the caller.
    Stop,
}

/// A recovered per-object failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub kind: ObjectKind,
    pub name: String,
    pub reason: String,
}

/// Items completed by a batch loop plus the objects it skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub completed: Vec<T>,
    pub skipped: Vec<Skipped>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one object's result into the report.
    ///
    /// Under [`FailurePolicy::SkipAndLog`] recoverable errors are logged and
    /// recorded; anything else, or any error under [`FailurePolicy::Stop`],
    /// is returned.
    pub fn absorb(
        &mut self,
        policy: FailurePolicy,
        kind: ObjectKind,
        name: &str,
        result: Result<T>,
    ) -> Result<()> {
        let err = match result {
            Ok(item) => {
                self.completed.push(item);
                return Ok(());
            }
            Err(err) => err,
        };

        if policy == FailurePolicy::Stop || !err.is_recoverable() {
            return Err(err);
        }

        warn!(
            event = "object_skipped",
            kind = %kind,
            name = %name,
            error = %err
        );
        self.skipped.push(Skipped::from_error(kind, name, &err));
        Ok(())
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl Skipped {
    pub fn from_error(kind: ObjectKind, name: &str, err: &Error) -> Self {
        Self {
            kind,
            name: name.to_string(),
            reason: err.to_string(),
        }
    }
}
