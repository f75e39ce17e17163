//! Ephemeral resources and bounded waits.
//!
//! [`EphemeralResources`] records every object an attempt manages to create
//! and deletes exactly those on release. Waits poll the cluster until a
//! condition holds, the bound expires, or the attempt is cancelled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::context::AttemptContext;
use crate::domain::ports::{ClusterApi, PodState, ResourceKind, ResourceRef};
use crate::error::{Error, FailureKind, Result};

/// Container waiting reasons that will not resolve by waiting longer.
const FATAL_WAITING_REASONS: &[&str] = &[
    "InvalidImageName",
    "CreateContainerConfigError",
    "CreateContainerError",
];

// =============================================================================
// Ephemeral Resource Set
// =============================================================================

/// Objects created by one attempt, released in reverse creation order.
#[derive(Default)]
pub struct EphemeralResources {
    created: Vec<(Arc<dyn ClusterApi>, ResourceRef)>,
}

impl EphemeralResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    pub async fn create_pod(
        &mut self,
        ctx: &AttemptContext<'_>,
        cluster: &Arc<dyn ClusterApi>,
        pod: &Pod,
    ) -> Result<ResourceRef> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        self.provision(ctx, cluster, ResourceKind::Pod, &name, cluster.create_pod(pod))
            .await
    }

    pub async fn create_service(
        &mut self,
        ctx: &AttemptContext<'_>,
        cluster: &Arc<dyn ClusterApi>,
        service: &Service,
    ) -> Result<ResourceRef> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.provision(
            ctx,
            cluster,
            ResourceKind::Service,
            &name,
            cluster.create_service(service),
        )
        .await
    }

    pub async fn create_secret(
        &mut self,
        ctx: &AttemptContext<'_>,
        cluster: &Arc<dyn ClusterApi>,
        secret: &Secret,
    ) -> Result<ResourceRef> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.provision(
            ctx,
            cluster,
            ResourceKind::Secret,
            &name,
            cluster.create_secret(secret),
        )
        .await
    }

    async fn provision<F>(
        &mut self,
        ctx: &AttemptContext<'_>,
        cluster: &Arc<dyn ClusterApi>,
        kind: ResourceKind,
        name: &str,
        create: F,
    ) -> Result<ResourceRef>
    where
        F: Future<Output = Result<ResourceRef>>,
    {
        ctx.check_cancelled()?;

        match create.await {
            Ok(resource) => {
                debug!(resource = %resource, attempt = %ctx.attempt_id(), "Created");
                self.created.push((Arc::clone(cluster), resource.clone()));
                Ok(resource)
            }
            Err(e) => Err(Error::ProvisioningFailed {
                resource: format!("{} {}", kind, name),
                reason: e.to_string(),
            }),
        }
    }

    /// Delete everything that was created. Runs regardless of cancellation.
    ///
    /// Failures are logged and recorded on the context; they never replace
    /// the attempt's own outcome.
    pub async fn release(self, ctx: &AttemptContext<'_>) {
        if self.is_empty() {
            return;
        }

        let total = self.len();
        for (cluster, resource) in self.created.into_iter().rev() {
            match cluster.delete(&resource).await {
                Ok(()) => debug!(resource = %resource, "Deleted"),
                Err(e) => {
                    let failure = Error::TeardownFailed {
                        resource: resource.to_string(),
                        reason: e.to_string(),
                    };
                    warn!(attempt = %ctx.attempt_id(), "{}; remove it manually", failure);
                    ctx.record_teardown_failure(failure.to_string());
                }
            }
        }
        info!(attempt = %ctx.attempt_id(), count = total, "Released ephemeral resources");
    }
}

// =============================================================================
// Bounded Waits
// =============================================================================

/// Poll `check` until it yields a value, within `limit`.
///
/// Cluster errors while polling are logged and retried; any other error from
/// `check` ends the wait. A polled object that disappears must be reported by
/// `check` as a terminal error. Cancellation is observed between polls.
pub async fn poll_until<T, F, Fut>(
    ctx: &AttemptContext<'_>,
    limit: Duration,
    on_timeout: impl FnOnce() -> Error,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let poll = async {
        loop {
            ctx.check_cancelled()?;

            match check().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) if e.kind() == FailureKind::Cluster => {
                    warn!("Failed to poll status: {}", e);
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = ctx.cancel.cancelled() => return Err(Error::Cancelled),
                _ = sleep(ctx.config.poll_interval) => {}
            }
        }
    };

    match timeout(limit, poll).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

/// Wait until every container of the pod reports ready.
pub async fn wait_pod_ready(
    ctx: &AttemptContext<'_>,
    cluster: &dyn ClusterApi,
    pod: &ResourceRef,
) -> Result<()> {
    let limit = ctx.config.readiness_timeout;
    let (namespace, name) = (pod.namespace.as_str(), pod.name.as_str());

    poll_until(
        ctx,
        limit,
        || Error::ReadinessTimeout {
            resource: pod.to_string(),
            waited: limit,
        },
        move || async move {
            match cluster.pod_state(namespace, name).await? {
                PodState::Running { ready: true } => Ok(Some(())),
                PodState::Pending { reason: Some(reason) } if is_fatal_waiting(&reason) => {
                    Err(Error::ProvisioningFailed {
                        resource: format!("pod {}", name),
                        reason,
                    })
                }
                PodState::Succeeded | PodState::Failed { .. } => Err(Error::ProvisioningFailed {
                    resource: format!("pod {}", name),
                    reason: "exited before becoming ready".to_string(),
                }),
                PodState::Gone => Err(vanished_before_start(name)),
                state => {
                    debug!(pod = %name, ?state, "Waiting for pod to become ready");
                    Ok(None)
                }
            }
        },
    )
    .await
}

/// Wait for a run-to-completion pod: first for it to start (readiness bound),
/// then for it to finish (transfer bound).
pub async fn wait_pod_completed(
    ctx: &AttemptContext<'_>,
    cluster: &dyn ClusterApi,
    pod: &ResourceRef,
) -> Result<()> {
    let (namespace, name) = (pod.namespace.as_str(), pod.name.as_str());

    let readiness = ctx.config.readiness_timeout;
    poll_until(
        ctx,
        readiness,
        || Error::ReadinessTimeout {
            resource: pod.to_string(),
            waited: readiness,
        },
        move || async move {
            match cluster.pod_state(namespace, name).await? {
                PodState::Pending { reason: Some(reason) } if is_fatal_waiting(&reason) => {
                    Err(Error::ProvisioningFailed {
                        resource: format!("pod {}", name),
                        reason,
                    })
                }
                PodState::Gone => Err(vanished_before_start(name)),
                PodState::Pending { .. } | PodState::Unknown => Ok(None),
                _ => Ok(Some(())),
            }
        },
    )
    .await?;

    info!(pod = %name, "Transfer started");

    let transfer = ctx.config.transfer_timeout;
    poll_until(
        ctx,
        transfer,
        || Error::TransferFailed {
            pod: name.to_string(),
            reason: format!("did not finish within {:?}", transfer),
        },
        move || async move {
            match cluster.pod_state(namespace, name).await? {
                PodState::Succeeded => Ok(Some(())),
                PodState::Failed { exit_code, reason } => Err(Error::TransferFailed {
                    pod: name.to_string(),
                    reason: describe_exit(exit_code, reason.as_deref()),
                }),
                PodState::Gone => Err(Error::TransferFailed {
                    pod: name.to_string(),
                    reason: "pod no longer exists".to_string(),
                }),
                _ => Ok(None),
            }
        },
    )
    .await
}

/// Wait for a LoadBalancer service to get an external address.
pub async fn wait_service_ingress(
    ctx: &AttemptContext<'_>,
    cluster: &dyn ClusterApi,
    service: &ResourceRef,
) -> Result<String> {
    let limit = ctx.config.readiness_timeout;
    let (namespace, name) = (service.namespace.as_str(), service.name.as_str());

    poll_until(
        ctx,
        limit,
        || Error::ReadinessTimeout {
            resource: service.to_string(),
            waited: limit,
        },
        move || async move { cluster.service_ingress(namespace, name).await },
    )
    .await
}

fn vanished_before_start(name: &str) -> Error {
    Error::ProvisioningFailed {
        resource: format!("pod {}", name),
        reason: "deleted before it started".to_string(),
    }
}

fn is_fatal_waiting(reason: &str) -> bool {
    FATAL_WAITING_REASONS.contains(&reason)
}

fn describe_exit(exit_code: Option<i32>, reason: Option<&str>) -> String {
    match (exit_code, reason) {
        (Some(code), Some(reason)) => format!("exit code {} ({})", code, reason),
        (Some(code), None) => format!("exit code {}", code),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => "pod failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_exit() {
        assert_eq!(describe_exit(Some(23), Some("Error")), "exit code 23 (Error)");
        assert_eq!(describe_exit(Some(1), None), "exit code 1");
        assert_eq!(describe_exit(None, Some("Evicted")), "Evicted");
        assert_eq!(describe_exit(None, None), "pod failed");
    }

    #[test]
    fn test_fatal_waiting_reasons() {
        assert!(is_fatal_waiting("InvalidImageName"));
        assert!(!is_fatal_waiting("ContainerCreating"));
        assert!(!is_fatal_waiting("ImagePullBackOff"));
    }

    #[test]
    fn test_vanished_pod_is_a_provisioning_failure() {
        let err = vanished_before_start("pv-migrate-abcd1234-rsync");
        assert_eq!(err.kind(), FailureKind::ProvisioningFailed);
        assert!(err.to_string().contains("pv-migrate-abcd1234-rsync"));
    }

    #[test]
    fn test_new_resource_set_is_empty() {
        let resources = EphemeralResources::new();
        assert!(resources.is_empty());
        assert_eq!(resources.len(), 0);
    }
}
