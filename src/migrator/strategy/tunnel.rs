//! sshd relay + rsync pod, shared by the in-cluster and cross-cluster strategies.
//!
//! ```text
//! source cluster                       destination cluster
//! ┌──────────────────────┐             ┌──────────────────────────┐
//! │ rsync pod            │   ssh/22    │ service ─▶ sshd pod       │
//! │  /source (ro)        │────────────▶│            /dest          │
//! │  private key secret  │             │ authorized_keys secret    │
//! └──────────────────────┘             └──────────────────────────┘
//! ```

use tracing::info;

use super::checked_probe;
use crate::error::{Error, Result};
use crate::migrator::context::AttemptContext;
use crate::migrator::keys::SshKeyPair;
use crate::migrator::manifests::{self, Exposure, RsyncTarget};
use crate::migrator::resources::{
    wait_pod_completed, wait_pod_ready, wait_service_ingress, EphemeralResources,
};

/// Provision the relay, wait for it, then run the transfer pod against it.
pub(super) async fn transfer(
    ctx: &AttemptContext<'_>,
    exposure: Exposure,
    resources: &mut EphemeralResources,
) -> Result<()> {
    let request = ctx.request;
    let attempt = ctx.attempt_id();
    let source_cluster = ctx.source_cluster()?;
    let destination_cluster = ctx.destination_cluster()?;

    // A volume already attached elsewhere can only be mounted on that node
    let (source, destination) = checked_probe(ctx).await?.map_err(|reason| Error::ProvisioningFailed {
        resource: "relay".to_string(),
        reason,
    })?;
    let source_node = source.mount.node.as_deref();
    let destination_node = destination.mount.node.as_deref();

    let keys = SshKeyPair::generate();

    // Relay side
    let destination_ns = &request.destination.namespace;
    let keys_name = ctx.resource_name("sshd-keys");
    let sshd_name = ctx.resource_name("sshd");

    let secret = manifests::authorized_keys_secret(&keys_name, destination_ns, attempt, keys.authorized_key());
    resources
        .create_secret(ctx, &destination_cluster, &secret)
        .await?;

    let sshd = manifests::sshd_pod(
        &sshd_name,
        destination_ns,
        attempt,
        &request.sshd_image,
        &request.destination.name,
        &keys_name,
        destination_node,
    );
    let sshd_ref = resources
        .create_pod(ctx, &destination_cluster, &sshd)
        .await?;

    let service = manifests::relay_service(&sshd_name, destination_ns, attempt, exposure);
    let service_ref = resources
        .create_service(ctx, &destination_cluster, &service)
        .await?;

    wait_pod_ready(ctx, destination_cluster.as_ref(), &sshd_ref).await?;
    info!(pod = %sshd_name, "Relay is ready");

    let host = match exposure {
        Exposure::ClusterIp => format!("{}.{}", sshd_name, destination_ns),
        Exposure::LoadBalancer => {
            wait_service_ingress(ctx, destination_cluster.as_ref(), &service_ref).await?
        }
    };
    info!(host = %host, "Relay reachable");

    // Transfer side
    let source_ns = &request.source.namespace;
    let key_name = ctx.resource_name("rsync-key");
    let rsync_name = ctx.resource_name("rsync");

    let secret = manifests::private_key_secret(&key_name, source_ns, attempt, keys.private_key());
    resources.create_secret(ctx, &source_cluster, &secret).await?;

    let script = manifests::rsync_script(&request.options, ctx.config, RsyncTarget::Remote { host: &host });
    let rsync = manifests::rsync_pod(
        &rsync_name,
        source_ns,
        attempt,
        &request.rsync_image,
        &request.source.name,
        &key_name,
        source_node,
        script,
    );
    let rsync_ref = resources.create_pod(ctx, &source_cluster, &rsync).await?;

    wait_pod_completed(ctx, source_cluster.as_ref(), &rsync_ref).await
}
