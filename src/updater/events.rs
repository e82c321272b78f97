//! Lifecycle events, phases and outcomes of an update cycle.

use serde::Serialize;
use std::fmt;

use crate::manifest::DependencyMap;

/// Event emitted as an update cycle moves through its phases.
///
/// Each variant has a stable kebab-case name (see [`UpdateEvent::name`]) and
/// carries its payload in a fixed order. A successful [`run_update`] always
/// ends with [`UpdateEvent::End`]; a failed one never emits it.
///
/// [`run_update`]: crate::updater::Updater::run_update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum UpdateEvent {
    /// The local version is equal to or newer than the remote one.
    UpToDate { local: String },
    /// The remote version is newer.
    OutOfDate { local: String, remote: String },
    DownloadStart { repo: String },
    DownloadEnd { repo: String },
    /// Purge and install of the fetched tree begins.
    UpdateStart,
    ModulesStart,
    /// Dependency check finished; carries the full remote dependency map.
    ModulesEnd { modules: DependencyMap },
    End,
}

impl UpdateEvent {
    /// Stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpToDate { .. } => "up-to-date",
            Self::OutOfDate { .. } => "out-of-date",
            Self::DownloadStart { .. } => "download-start",
            Self::DownloadEnd { .. } => "download-end",
            Self::UpdateStart => "update-start",
            Self::ModulesStart => "modules-start",
            Self::ModulesEnd { .. } => "modules-end",
            Self::End => "end",
        }
    }
}

impl fmt::Display for UpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate { local } => write!(f, "{}({local})", self.name()),
            Self::OutOfDate { local, remote } => write!(f, "{}({local}, {remote})", self.name()),
            Self::DownloadStart { repo } | Self::DownloadEnd { repo } => {
                write!(f, "{}({repo})", self.name())
            }
            Self::ModulesEnd { modules } => write!(f, "{}({} modules)", self.name(), modules.len()),
            Self::UpdateStart | Self::ModulesStart | Self::End => write!(f, "{}()", self.name()),
        }
    }
}

/// Phase of the update state machine.
///
/// ```text
/// Idle → CheckingVersion → UpToDate ─────────────────────────────────────────┐
///                        └→ Downloading → Purging → Installing               │
///                              → CheckingModules → ModulesUpToDate ──────────┤
///                                                └→ InstallingModules ───────┴→ Done
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePhase {
    #[default]
    Idle,
    CheckingVersion,
    UpToDate,
    Downloading,
    Purging,
    Installing,
    CheckingModules,
    ModulesUpToDate,
    InstallingModules,
    Done,
}

/// Result of a successful [`run_update`](crate::updater::Updater::run_update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum UpdateOutcome {
    /// Development mode is active; nothing was checked.
    DevMode,
    UpToDate { local: String },
    Updated {
        from: String,
        to: String,
        /// Whether the dependency install command ran.
        modules_reinstalled: bool,
    },
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}
