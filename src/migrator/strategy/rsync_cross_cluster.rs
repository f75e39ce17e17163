//! Cross-cluster tunnel: sshd relay behind a LoadBalancer service.

use async_trait::async_trait;
use tracing::instrument;

use super::{checked_probe, tunnel, Applicability, Strategy, RSYNC_CROSS_CLUSTER};
use crate::error::Result;
use crate::migrator::context::AttemptContext;
use crate::migrator::manifests::Exposure;
use crate::migrator::resources::EphemeralResources;

/// rsync over ssh to an externally exposed relay. Works for any topology as
/// long as both API servers answer and the load balancer is routable from
/// the source cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsyncCrossCluster;

impl RsyncCrossCluster {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Strategy for RsyncCrossCluster {
    fn name(&self) -> &'static str {
        RSYNC_CROSS_CLUSTER
    }

    #[instrument(skip_all, fields(strategy = RSYNC_CROSS_CLUSTER))]
    async fn applicable(&self, ctx: &AttemptContext<'_>) -> Result<Applicability> {
        Ok(match checked_probe(ctx).await? {
            Ok(_) => Applicability::Applicable,
            Err(reason) => Applicability::NotApplicable(reason),
        })
    }

    #[instrument(skip_all, fields(strategy = RSYNC_CROSS_CLUSTER, attempt = %ctx.attempt_id()))]
    async fn execute(&self, ctx: &AttemptContext<'_>) -> Result<()> {
        let mut resources = EphemeralResources::new();
        let outcome = tunnel::transfer(ctx, Exposure::LoadBalancer, &mut resources).await;
        resources.release(ctx).await;
        outcome
    }
}
