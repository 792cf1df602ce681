//! Session-scoped dispatch configuration
//!
//! Every dispatch reads one immutable [`SessionConfig`] snapshot at its
//! start. Changing the mode swaps in a new snapshot; dispatches already in
//! flight keep the one they started with.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::types::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalMode {
    /// Submit operations immediately
    #[default]
    DirectExecution,
    /// Finalize and hand back bytes for external signing
    ProvideBytes,
}

impl OperationalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectExecution => "direct_execution",
            Self::ProvideBytes => "provide_bytes",
        }
    }
}

impl fmt::Display for OperationalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct_execution" => Ok(Self::DirectExecution),
            "provide_bytes" => Ok(Self::ProvideBytes),
            other => Err(format!(
                "unknown mode '{}', expected direct_execution or provide_bytes",
                other
            )),
        }
    }
}

/// One immutable snapshot of the session policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: OperationalMode,
    pub schedule_by_default_in_bytes_mode: bool,
    /// The user the operating identity acts for
    pub acting_on_behalf_of: Option<EntityId>,
}

/// Shared holder of the current [`SessionConfig`]
///
/// Reads are lock-free. Writers are serialized so a read-modify-write such
/// as [`Session::change_mode`] never loses a concurrent update.
pub struct Session {
    current: ArcSwap<SessionConfig>,
    write_lock: Mutex<()>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
            write_lock: Mutex::new(()),
        }
    }

    /// The snapshot a dispatch should use from start to finish
    pub fn snapshot(&self) -> Arc<SessionConfig> {
        self.current.load_full()
    }

    /// Switch the operational mode, keeping the rest of the policy
    ///
    /// Returns the previous mode.
    pub fn change_mode(&self, mode: OperationalMode) -> OperationalMode {
        let _guard = self.write_lock.lock();
        let previous = self.current.load_full();
        if previous.mode != mode {
            let mut next = (*previous).clone();
            next.mode = mode;
            self.current.store(Arc::new(next));
            info!(from = %previous.mode, to = %mode, "Operational mode changed");
        }
        previous.mode
    }

    /// Replace the whole policy
    pub fn replace(&self, config: SessionConfig) -> Arc<SessionConfig> {
        let _guard = self.write_lock.lock();
        info!(
            mode = %config.mode,
            schedule_by_default = config.schedule_by_default_in_bytes_mode,
            acting_on_behalf_of = ?config.acting_on_behalf_of.map(|id| id.to_string()),
            "Session configuration replaced"
        );
        self.current.swap(Arc::new(config))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
