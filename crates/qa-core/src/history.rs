//! Append-only version history for versioned entities.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::requirement::Requirement;
use crate::script::AutomationScript;
use crate::test_case::TestCase;
use crate::version::Version;

/// An entity that carries a [`Version`]
pub trait Versioned {
    fn version(&self) -> Version;
}

impl Versioned for Requirement {
    fn version(&self) -> Version {
        self.version
    }
}

impl Versioned for TestCase {
    fn version(&self) -> Version {
        self.version
    }
}

impl Versioned for AutomationScript {
    fn version(&self) -> Version {
        self.version
    }
}

/// Every version of one entity, oldest first.
///
/// Only the current (last) version may be mutated in place, for status
/// changes that do not alter content. Content changes go through
/// [`push`](Self::push), which enforces `v(n+1)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionHistory<T> {
    versions: Vec<T>,
}

impl<T: Versioned> VersionHistory<T> {
    pub fn new(initial: T) -> Self {
        Self {
            versions: vec![initial],
        }
    }

    /// Rebuild from stored versions, sorting by version number.
    pub fn from_versions(mut versions: Vec<T>) -> CoreResult<Self> {
        if versions.is_empty() {
            return Err(CoreError::validation(
                "version history",
                "at least one version is required",
            ));
        }
        versions.sort_by_key(|v| v.version());
        let history = Self { versions };
        if !history.is_monotonic() {
            return Err(CoreError::validation(
                "version history",
                "versions must run v1, v2, ... without gaps",
            ));
        }
        Ok(history)
    }

    pub fn current(&self) -> &T {
        // never empty: constructors require one version
        &self.versions[self.versions.len() - 1]
    }

    pub(crate) fn current_mut(&mut self) -> &mut T {
        let last = self.versions.len() - 1;
        &mut self.versions[last]
    }

    pub fn get(&self, version: Version) -> Option<&T> {
        self.versions.iter().find(|v| v.version() == version)
    }

    pub fn versions(&self) -> &[T] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Append a new version, which must directly follow the current one.
    pub fn push(&mut self, next: T) -> CoreResult<()> {
        let expected = self.current().version().next();
        if next.version() != expected {
            return Err(CoreError::validation(
                "version history",
                format!(
                    "next version must be {expected}, got {}",
                    next.version()
                ),
            ));
        }
        self.versions.push(next);
        Ok(())
    }

    /// Whether versions run `v1..=vn` strictly increasing
    pub fn is_monotonic(&self) -> bool {
        self.versions
            .iter()
            .enumerate()
            .all(|(i, v)| v.version().number() as usize == i + 1)
    }
}
