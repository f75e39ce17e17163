//! Co-mount strategy: both claims in one pod, local rsync.

use async_trait::async_trait;
use tracing::{info, instrument};

use super::{checked_probe, Applicability, Strategy, MOUNT_BOTH};
use crate::domain::ports::AccessMode;
use crate::error::{Error, Result};
use crate::migrator::context::AttemptContext;
use crate::migrator::inspector::VolumeProbe;
use crate::migrator::manifests::{rsync_script, MountBothPod, RsyncTarget};
use crate::migrator::resources::{wait_pod_completed, EphemeralResources};

/// Attaches source and destination to a single pod. No network hop.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountBoth;

impl MountBoth {
    pub fn new() -> Self {
        Self
    }

    async fn transfer(&self, ctx: &AttemptContext<'_>, resources: &mut EphemeralResources) -> Result<()> {
        let request = ctx.request;
        let cluster = ctx.source_cluster()?;

        let (source, destination) = checked_probe(ctx).await?.map_err(|reason| Error::ProvisioningFailed {
            resource: "mount-both pod".to_string(),
            reason,
        })?;
        let node = co_mount_node(&source, &destination).map_err(|reason| Error::ProvisioningFailed {
            resource: "mount-both pod".to_string(),
            reason,
        })?;

        let name = ctx.resource_name("mount-both");
        let pod = MountBothPod {
            name: &name,
            namespace: &request.source.namespace,
            attempt_id: ctx.attempt_id(),
            image: &request.rsync_image,
            source_claim: &request.source.name,
            destination_claim: &request.destination.name,
            node: node.as_deref(),
            script: rsync_script(&request.options, ctx.config, RsyncTarget::Local),
        }
        .build();

        info!(pod = %name, node = ?node, "Starting co-mount transfer");
        let pod_ref = resources.create_pod(ctx, &cluster, &pod).await?;
        wait_pod_completed(ctx, cluster.as_ref(), &pod_ref).await
    }
}

#[async_trait]
impl Strategy for MountBoth {
    fn name(&self) -> &'static str {
        MOUNT_BOTH
    }

    #[instrument(skip_all, fields(strategy = MOUNT_BOTH))]
    async fn applicable(&self, ctx: &AttemptContext<'_>) -> Result<Applicability> {
        let request = ctx.request;
        if !request.source.same_cluster(&request.destination) {
            return Ok(Applicability::not("source and destination are in different clusters"));
        }
        if !request.source.same_namespace(&request.destination) {
            return Ok(Applicability::not("source and destination are in different namespaces"));
        }

        let (source, destination) = match checked_probe(ctx).await? {
            Ok(probes) => probes,
            Err(reason) => return Ok(Applicability::NotApplicable(reason)),
        };

        Ok(match co_mount_node(&source, &destination) {
            Ok(_) => Applicability::Applicable,
            Err(reason) => Applicability::NotApplicable(reason),
        })
    }

    #[instrument(skip_all, fields(strategy = MOUNT_BOTH, attempt = %ctx.attempt_id()))]
    async fn execute(&self, ctx: &AttemptContext<'_>) -> Result<()> {
        let mut resources = EphemeralResources::new();
        let outcome = self.transfer(ctx, &mut resources).await;
        resources.release(ctx).await;
        outcome
    }
}

/// Node to run the co-mount pod on, `None` when the scheduler may pick.
///
/// Fails when the claims are tied to different nodes and neither can be
/// attached from the other's node.
pub fn co_mount_node(
    source: &VolumeProbe,
    destination: &VolumeProbe,
) -> std::result::Result<Option<String>, String> {
    for (side, probe) in [("source", source), ("destination", destination)] {
        if probe.mount.mounted && probe.claim.access_modes.contains(&AccessMode::ReadWriteOncePod) {
            return Err(format!(
                "{} claim is ReadWriteOncePod and already mounted",
                side
            ));
        }
    }

    match (source.node(), destination.node()) {
        (None, None) => Ok(None),
        (Some(node), None) | (None, Some(node)) => Ok(Some(node.to_string())),
        (Some(a), Some(b)) if a == b => Ok(Some(a.to_string())),
        (Some(a), Some(b)) => {
            if destination.claim.writable_from_many_nodes() {
                Ok(Some(a.to_string()))
            } else if source.claim.readable_from_many_nodes() {
                Ok(Some(b.to_string()))
            } else {
                Err(format!(
                    "source is tied to node {} and destination to node {}",
                    a, b
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ClaimInfo, MountStatus};

    fn probe(modes: &[AccessMode], pinned: Option<&str>, mounted_on: Option<&str>) -> VolumeProbe {
        VolumeProbe {
            claim: ClaimInfo {
                namespace: "apps".into(),
                name: "data".into(),
                access_modes: modes.to_vec(),
                pinned_node: pinned.map(String::from),
            },
            mount: MountStatus {
                mounted: mounted_on.is_some(),
                node: mounted_on.map(String::from),
                pod: mounted_on.map(|_| "web-0".to_string()),
            },
        }
    }

    const RWO: &[AccessMode] = &[AccessMode::ReadWriteOnce];

    #[test]
    fn test_unpinned_volumes_let_scheduler_pick() {
        assert_eq!(co_mount_node(&probe(RWO, None, None), &probe(RWO, None, None)), Ok(None));
    }

    #[test]
    fn test_single_pinned_volume_decides_node() {
        let node = co_mount_node(&probe(RWO, Some("n1"), None), &probe(RWO, None, None));
        assert_eq!(node, Ok(Some("n1".to_string())));

        let node = co_mount_node(&probe(RWO, None, None), &probe(RWO, None, Some("n2")));
        assert_eq!(node, Ok(Some("n2".to_string())));
    }

    #[test]
    fn test_mount_node_wins_over_pinning() {
        let node = co_mount_node(&probe(RWO, Some("n1"), Some("n1")), &probe(RWO, Some("n1"), None));
        assert_eq!(node, Ok(Some("n1".to_string())));
    }

    #[test]
    fn test_different_nodes_single_attach_is_rejected() {
        let result = co_mount_node(&probe(RWO, Some("n1"), None), &probe(RWO, Some("n2"), None));
        assert!(result.unwrap_err().contains("n1"));
    }

    #[test]
    fn test_different_nodes_multi_attach() {
        let rwx = &[AccessMode::ReadWriteMany];
        let rox = &[AccessMode::ReadOnlyMany];

        let node = co_mount_node(&probe(RWO, Some("n1"), None), &probe(rwx, Some("n2"), None));
        assert_eq!(node, Ok(Some("n1".to_string())));

        let node = co_mount_node(&probe(rox, Some("n1"), None), &probe(RWO, Some("n2"), None));
        assert_eq!(node, Ok(Some("n2".to_string())));
    }

    #[test]
    fn test_read_write_once_pod_in_use() {
        let rwop = &[AccessMode::ReadWriteOncePod];
        let result = co_mount_node(&probe(rwop, None, Some("n1")), &probe(RWO, None, None));
        assert!(result.unwrap_err().contains("ReadWriteOncePod"));
    }
}
