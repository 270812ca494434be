//! Runner options: the bridge between collaborator-provided flags and the
//! execution policy. Argument parsing itself lives outside the core.

use crate::{
    discovery::ScanScope,
    filter::TestFilterConfig,
    policy::{AuditDepth, ExecutionPolicy},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Options a host passes into the runner.
#[derive(Clone, Debug, Default)]
pub struct RunnerOptions {
    /// `--trace`: explainable audit depth, design events kept, source
    /// locations populated on success.
    pub trace: bool,
    /// `--tests <pattern>`: wildcard target filter.
    pub tests: Option<String>,
    /// `--package <name>`: narrow the scan scope.
    pub package: Option<String>,
    /// `--archive`: history mode for snapshot files.
    pub archive: bool,
    /// `--seed <i64>`.
    pub seed: Option<i64>,
    /// `--verbose` / `--quiet`.
    pub verbosity: Verbosity,
}

impl RunnerOptions {
    /// Applies the options onto a base policy.
    pub fn apply(&self, mut policy: ExecutionPolicy) -> ExecutionPolicy {
        if self.trace {
            policy.auditing.depth = AuditDepth::Explainable;
        }
        policy.auditing.archive = self.archive;
        if self.seed.is_some() {
            policy.determinism.seed = self.seed;
        }
        policy
    }

    pub fn filter(&self) -> TestFilterConfig {
        match &self.tests {
            Some(pattern) => TestFilterConfig::pattern(pattern),
            None => TestFilterConfig::all(),
        }
    }

    pub fn scope(&self) -> ScanScope {
        match &self.package {
            Some(package) => ScanScope::Packages([package.clone()].into()),
            None => ScanScope::All,
        }
    }
}

/// Enables console theming unless the environment opts out. `NO_COLOR` and
/// non-tty outputs disable ANSI sequences.
pub fn configure_console() {
    yansi::whenever(yansi::Condition::TTY_AND_COLOR);
}
