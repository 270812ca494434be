//! The execution policy aggregate. No globals: every component receives the
//! values it needs from here explicitly.

use std::path::PathBuf;

/// Controls the randomness source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Fixed seed; a time-derived seed is used when absent.
    pub seed: Option<i64>,
}

/// When the per-worker journal is snapshotted to a named file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuditRetention {
    None,
    #[default]
    OnFailure,
    Always,
}

/// How much of the audit trail is persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuditDepth {
    /// Design-phase events are dropped on flush.
    #[default]
    Simple,
    /// Everything is kept and successful records gain source locations.
    Explainable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditConfig {
    pub retention: AuditRetention,
    pub depth: AuditDepth,
    /// Root directory for journals and snapshots.
    pub root: PathBuf,
    /// History mode: snapshot names carry a timestamp suffix instead of
    /// overwriting the previous run's file.
    pub archive: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention: AuditRetention::default(),
            depth: AuditDepth::default(),
            root: PathBuf::from("covenant-out"),
            archive: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Per-test deadline.
    pub timeout_ms: u64,
    /// Worker pool size.
    pub parallelism: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            parallelism: 4,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionPolicy {
    pub determinism: DeterminismConfig,
    pub auditing: AuditConfig,
    pub resources: ResourceConfig,
}
