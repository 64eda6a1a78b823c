//! Per-process fetch bookkeeping
//!
//! A [`FetchSession`] owns the set of artifact names that already have a fetch
//! task in this process, plus the set of paths verified so far. The shared
//! session lives for the whole process; tests construct isolated ones.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::app::cache::VerifiedSet;

static SHARED: LazyLock<Arc<FetchSession>> = LazyLock::new(|| Arc::new(FetchSession::new()));

/// In-process de-duplication state
#[derive(Debug, Default)]
pub struct FetchSession {
    started: Mutex<HashSet<String>>,
    verified: Arc<VerifiedSet>,
}

impl FetchSession {
    /// Create an isolated session
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide session
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Claim `name` for a fetch task.
    ///
    /// Returns `false` if a task for `name` was already started in this
    /// session. Names are never released, including when the claiming task
    /// stopped on cancellation or failed. A later `fetch_all` on the same
    /// session skips such a name and will not fetch it; use a fresh session
    /// (or a new process) to try again after a cancelled run.
    pub fn try_start(&self, name: &str) -> bool {
        let mut started = self.started.lock();
        if started.contains(name) {
            return false;
        }
        started.insert(name.to_string())
    }

    /// Paths verified in this session
    pub fn verified(&self) -> Arc<VerifiedSet> {
        Arc::clone(&self.verified)
    }
}
