//! Embedded script-policy seam
//!
//! The config may list script policies evaluated by an external scripting
//! engine. The engine itself is an opaque collaborator: the scheduler hands
//! it a script path and the changed files and appends whatever violations
//! it returns. No interpreter ships with this crate.

use anyhow::Result;
use std::path::Path;

use crate::policy::Violation;

/// An external engine that evaluates one policy script against the
/// changeset.
pub trait ScriptPolicy: Send + Sync {
    fn evaluate(&self, script: &Path, files: &[String]) -> Result<Vec<Violation>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Engine returning a fixed violation list, for scheduler tests.
    pub struct FixedEngine(pub Vec<Violation>);

    impl ScriptPolicy for FixedEngine {
        fn evaluate(&self, _script: &Path, _files: &[String]) -> Result<Vec<Violation>> {
            Ok(self.0.clone())
        }
    }
}
