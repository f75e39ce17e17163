//! Mount/Capability Inspector
//!
//! Answers "is this claim in use, and where" from live cluster state. The
//! inspector is read-only; API failures propagate so that an unreachable
//! cluster is never mistaken for an unmounted volume.

use futures::try_join;
use tracing::{debug, instrument};

use crate::domain::ports::{ClaimInfo, ClaimUser, ClusterApi, MountStatus, Request, VolumeLocator};
use crate::error::Result;

/// Inspects volume usage on a cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountInspector;

/// Claim details together with its mount status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeProbe {
    pub claim: ClaimInfo,
    pub mount: MountStatus,
}

impl VolumeProbe {
    /// Node the volume is tied to: where it is mounted, else where it is pinned.
    pub fn node(&self) -> Option<&str> {
        self.mount
            .node
            .as_deref()
            .or(self.claim.pinned_node.as_deref())
    }
}

impl MountInspector {
    pub fn new() -> Self {
        Self
    }

    /// Whether the volume is mounted by a live workload, and on which node.
    #[instrument(skip(self, cluster), fields(volume = %locator))]
    pub async fn mount_status(
        &self,
        cluster: &dyn ClusterApi,
        locator: &VolumeLocator,
    ) -> Result<MountStatus> {
        let users = cluster
            .claim_users(&locator.namespace, &locator.name)
            .await?;
        let status = summarize(&users);
        debug!(mounted = status.mounted, node = ?status.node, "Mount status");
        Ok(status)
    }

    /// Fetch the claim and its mount status concurrently.
    pub async fn probe(&self, cluster: &dyn ClusterApi, locator: &VolumeLocator) -> Result<VolumeProbe> {
        let (claim, mount) = try_join!(
            cluster.claim(&locator.namespace, &locator.name),
            self.mount_status(cluster, locator),
        )?;
        Ok(VolumeProbe { claim, mount })
    }
}

/// Reduce the pods referencing a claim to a mount status.
///
/// Pods in a terminal phase and pods created by pv-migrate are ignored.
pub fn summarize(users: &[ClaimUser]) -> MountStatus {
    users
        .iter()
        .find(|u| !u.managed && !u.phase.is_terminal())
        .map(|u| MountStatus {
            mounted: true,
            node: u.node.clone(),
            pod: Some(u.pod.clone()),
        })
        .unwrap_or_default()
}

/// Reason to refuse the request under the mount safety option, if any.
pub fn mount_violation(request: &Request, source: &MountStatus, destination: &MountStatus) -> Option<String> {
    if request.options.ignore_mounted {
        return None;
    }

    let describe = |side: &str, locator: &VolumeLocator, status: &MountStatus| {
        format!(
            "{} {} is mounted by pod {} on node {}",
            side,
            locator,
            status.pod.as_deref().unwrap_or("<unknown>"),
            status.node.as_deref().unwrap_or("<unscheduled>"),
        )
    };

    let mut reasons = Vec::new();
    if source.mounted {
        reasons.push(describe("source", &request.source, source));
    }
    if destination.mounted {
        reasons.push(describe("destination", &request.destination, destination));
    }

    if reasons.is_empty() {
        None
    } else {
        Some(format!("{} (ignore-mounted is off)", reasons.join(", ")))
    }
}
