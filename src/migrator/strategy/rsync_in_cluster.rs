//! Same-cluster tunnel: sshd relay behind a ClusterIP service.

use async_trait::async_trait;
use tracing::instrument;

use super::{checked_probe, tunnel, Applicability, Strategy, RSYNC_IN_CLUSTER};
use crate::error::Result;
use crate::migrator::context::AttemptContext;
use crate::migrator::manifests::Exposure;
use crate::migrator::resources::EphemeralResources;

/// rsync over ssh inside one cluster; namespaces may differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsyncInCluster;

impl RsyncInCluster {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Strategy for RsyncInCluster {
    fn name(&self) -> &'static str {
        RSYNC_IN_CLUSTER
    }

    #[instrument(skip_all, fields(strategy = RSYNC_IN_CLUSTER))]
    async fn applicable(&self, ctx: &AttemptContext<'_>) -> Result<Applicability> {
        let request = ctx.request;
        if !request.source.same_cluster(&request.destination) {
            return Ok(Applicability::not("source and destination are in different clusters"));
        }

        Ok(match checked_probe(ctx).await? {
            Ok(_) => Applicability::Applicable,
            Err(reason) => Applicability::NotApplicable(reason),
        })
    }

    #[instrument(skip_all, fields(strategy = RSYNC_IN_CLUSTER, attempt = %ctx.attempt_id()))]
    async fn execute(&self, ctx: &AttemptContext<'_>) -> Result<()> {
        let mut resources = EphemeralResources::new();
        let outcome = tunnel::transfer(ctx, Exposure::ClusterIp, &mut resources).await;
        resources.release(ctx).await;
        outcome
    }
}
