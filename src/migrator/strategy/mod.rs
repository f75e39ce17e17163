//! Migration strategies
//!
//! A strategy is one technique for moving bytes between two claims. Each
//! answers a cheap applicability question and, when asked, performs a full
//! attempt that releases everything it provisioned before returning.
//!
//! Built-in priority order:
//!
//! ```text
//! mount-both → rsync-in-cluster → rsync-cross-cluster
//! (cheapest)                      (most capable, most failure-prone)
//! ```

mod mount_both;
mod rsync_cross_cluster;
mod rsync_in_cluster;
mod tunnel;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::try_join;

use super::context::AttemptContext;
use super::inspector::{mount_violation, MountInspector, VolumeProbe};
use crate::error::{Error, Result};

pub use mount_both::{co_mount_node, MountBoth};
pub use rsync_cross_cluster::RsyncCrossCluster;
pub use rsync_in_cluster::RsyncInCluster;

pub const MOUNT_BOTH: &str = "mount-both";
pub const RSYNC_IN_CLUSTER: &str = "rsync-in-cluster";
pub const RSYNC_CROSS_CLUSTER: &str = "rsync-cross-cluster";

/// Answer of an applicability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicability {
    Applicable,
    NotApplicable(String),
}

impl Applicability {
    pub fn not(reason: impl Into<String>) -> Self {
        Applicability::NotApplicable(reason.into())
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Applicability::Applicable)
    }
}

/// A technique for migrating one claim's contents to another.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable identifier used for overrides and logging.
    fn name(&self) -> &'static str;

    /// Whether this strategy can handle the request in the current cluster state.
    ///
    /// Must not create anything. Errors (unreachable API, missing claim) are
    /// hard failures, not "not applicable".
    async fn applicable(&self, ctx: &AttemptContext<'_>) -> Result<Applicability>;

    /// Run a complete attempt: provision, wait, transfer, release.
    async fn execute(&self, ctx: &AttemptContext<'_>) -> Result<()>;
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered set of strategies, highest priority first.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Build a registry; names must be unique.
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for strategy in &strategies {
            if !seen.insert(strategy.name()) {
                return Err(Error::Configuration(format!(
                    "strategy {} registered twice",
                    strategy.name()
                )));
            }
        }
        Ok(Self { strategies })
    }

    /// The built-in strategies in default priority order.
    pub fn builtin() -> Self {
        Self {
            strategies: vec![
                Arc::new(MountBoth::new()),
                Arc::new(RsyncInCluster::new()),
                Arc::new(RsyncCrossCluster::new()),
            ],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Candidates for a request: the full default order when `overrides` is
    /// empty, otherwise exactly the named strategies in the given order.
    pub fn resolve(&self, overrides: &[String]) -> Result<Vec<Arc<dyn Strategy>>> {
        let candidates: Vec<_> = if overrides.is_empty() {
            self.strategies.clone()
        } else {
            let mut seen = HashSet::new();
            overrides
                .iter()
                .map(|name| {
                    if !seen.insert(name.as_str()) {
                        return Err(Error::Configuration(format!(
                            "strategy {} listed more than once",
                            name
                        )));
                    }
                    self.strategies
                        .iter()
                        .find(|s| s.name() == name.as_str())
                        .cloned()
                        .ok_or_else(|| {
                            Error::Configuration(format!(
                                "unknown strategy {} (available: {})",
                                name,
                                self.names().join(", ")
                            ))
                        })
                })
                .collect::<Result<_>>()?
        };

        if candidates.is_empty() {
            return Err(Error::Configuration(
                "no strategies to attempt".to_string(),
            ));
        }
        Ok(candidates)
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

// =============================================================================
// Shared Checks
// =============================================================================

/// Probe both claims concurrently.
pub(crate) async fn probe_volumes(ctx: &AttemptContext<'_>) -> Result<(VolumeProbe, VolumeProbe)> {
    let inspector = MountInspector::new();
    let source_cluster = ctx.source_cluster()?;
    let destination_cluster = ctx.destination_cluster()?;

    try_join!(
        inspector.probe(source_cluster.as_ref(), &ctx.request.source),
        inspector.probe(destination_cluster.as_ref(), &ctx.request.destination),
    )
}

/// Probe both claims and apply the mount safety gate.
pub(crate) async fn checked_probe(
    ctx: &AttemptContext<'_>,
) -> Result<std::result::Result<(VolumeProbe, VolumeProbe), String>> {
    let (source, destination) = probe_volumes(ctx).await?;
    match mount_violation(ctx.request, &source.mount, &destination.mount) {
        Some(reason) => Ok(Err(reason)),
        None => Ok(Ok((source, destination))),
    }
}
