//! Kubernetes Cluster Adapter
//!
//! Implements the `ClusterApi` port with kube-rs, and resolves
//! [`ClusterAccess`] descriptors into authenticated clients.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service,
};
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info, instrument};

use crate::domain::ports::{
    AccessMode, ClaimInfo, ClaimUser, ClusterAccess, ClusterApi, PodPhase, PodState,
    ResourceKind, ResourceRef, VolumeLocator,
};
use crate::error::{Error, Result};
use crate::migrator::{ClusterSet, LABEL_MANAGED_BY, MANAGED_BY};

/// Node label used by local volume provisioners to pin a volume.
const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

// =============================================================================
// Cluster Adapter
// =============================================================================

/// One cluster reached through a kube-rs client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    label: String,
}

impl KubeCluster {
    pub fn new(client: Client, label: impl Into<String>) -> Self {
        Self {
            client,
            label: label.into(),
        }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    #[instrument(skip(self), fields(cluster = %self.label))]
    async fn claim(&self, namespace: &str, name: &str) -> Result<ClaimInfo> {
        let claims: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let claim = claims
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::ClaimNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let spec = claim.spec.unwrap_or_default();
        let access_modes = spec
            .access_modes
            .unwrap_or_default()
            .iter()
            .filter_map(|m| AccessMode::parse(m))
            .collect();

        let pinned_node = match spec.volume_name.filter(|v| !v.is_empty()) {
            Some(volume) => {
                let volumes: Api<PersistentVolume> = Api::all(self.client.clone());
                volumes
                    .get_opt(&volume)
                    .await?
                    .as_ref()
                    .and_then(pinned_node_of)
            }
            None => None,
        };

        debug!(claim = %name, ?pinned_node, "Fetched claim");
        Ok(ClaimInfo {
            namespace: namespace.to_string(),
            name: name.to_string(),
            access_modes,
            pinned_node,
        })
    }

    #[instrument(skip(self), fields(cluster = %self.label))]
    async fn claim_users(&self, namespace: &str, claim: &str) -> Result<Vec<ClaimUser>> {
        let pods = self.pods(namespace).list(&ListParams::default()).await?;
        Ok(claim_users_of(&pods.items, claim))
    }

    async fn create_pod(&self, pod: &Pod) -> Result<ResourceRef> {
        let namespace = namespace_of(&pod.metadata)?;
        let created = self
            .pods(&namespace)
            .create(&PostParams::default(), pod)
            .await?;
        Ok(ResourceRef::new(
            ResourceKind::Pod,
            namespace,
            created.metadata.name.unwrap_or_default(),
        ))
    }

    async fn create_service(&self, service: &Service) -> Result<ResourceRef> {
        let namespace = namespace_of(&service.metadata)?;
        let created = self
            .services(&namespace)
            .create(&PostParams::default(), service)
            .await?;
        Ok(ResourceRef::new(
            ResourceKind::Service,
            namespace,
            created.metadata.name.unwrap_or_default(),
        ))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<ResourceRef> {
        let namespace = namespace_of(&secret.metadata)?;
        let created = self
            .secrets(&namespace)
            .create(&PostParams::default(), secret)
            .await?;
        Ok(ResourceRef::new(
            ResourceKind::Secret,
            namespace,
            created.metadata.name.unwrap_or_default(),
        ))
    }

    #[instrument(skip(self), fields(cluster = %self.label, resource = %resource))]
    async fn delete(&self, resource: &ResourceRef) -> Result<()> {
        let (namespace, name) = (resource.namespace.as_str(), resource.name.as_str());
        let result = match resource.kind {
            // Transfer pods hold no state worth a graceful shutdown
            ResourceKind::Pod => self
                .pods(namespace)
                .delete(name, &DeleteParams::default().grace_period(0))
                .await
                .map(|_| ()),
            ResourceKind::Service => self
                .services(namespace)
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ()),
            ResourceKind::Secret => self
                .secrets(namespace)
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!("Already gone");
                Ok(())
            }
            Err(e) => Err(Error::Kube(e)),
        }
    }

    async fn pod_state(&self, namespace: &str, name: &str) -> Result<PodState> {
        Ok(self
            .pods(namespace)
            .get_opt(name)
            .await?
            .map_or(PodState::Gone, |pod| pod_state_of(&pod)))
    }

    async fn service_ingress(&self, namespace: &str, name: &str) -> Result<Option<String>> {
        match self.services(namespace).get_opt(name).await? {
            Some(service) => Ok(ingress_of(&service)),
            None => Err(Error::ProvisioningFailed {
                resource: format!("service {}", name),
                reason: "deleted while waiting for an external address".to_string(),
            }),
        }
    }
}

fn namespace_of(meta: &kube::api::ObjectMeta) -> Result<String> {
    meta.namespace
        .clone()
        .ok_or_else(|| Error::Internal("object has no namespace".to_string()))
}

// =============================================================================
// Object Interpretation
// =============================================================================

/// Pods that reference `claim` in their volumes.
pub fn claim_users_of(pods: &[Pod], claim: &str) -> Vec<ClaimUser> {
    pods.iter()
        .filter(|pod| {
            pod.spec
                .as_ref()
                .and_then(|s| s.volumes.as_ref())
                .map(|volumes| {
                    volumes.iter().any(|v| {
                        v.persistent_volume_claim
                            .as_ref()
                            .map(|c| c.claim_name == claim)
                            .unwrap_or(false)
                    })
                })
                .unwrap_or(false)
        })
        .map(|pod| ClaimUser {
            pod: pod.metadata.name.clone().unwrap_or_default(),
            node: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
            phase: PodPhase::parse(pod.status.as_ref().and_then(|s| s.phase.as_deref())),
            managed: pod
                .metadata
                .labels
                .as_ref()
                .and_then(|l| l.get(LABEL_MANAGED_BY))
                .map(|v| v == MANAGED_BY)
                .unwrap_or(false),
        })
        .collect()
}

/// Node a volume is bound to by a single-host node affinity.
pub fn pinned_node_of(volume: &PersistentVolume) -> Option<String> {
    let terms = &volume
        .spec
        .as_ref()?
        .node_affinity
        .as_ref()?
        .required
        .as_ref()?
        .node_selector_terms;

    terms
        .iter()
        .flat_map(|t| t.match_expressions.iter().flatten())
        .find(|e| e.key == HOSTNAME_LABEL && e.operator == "In")
        .and_then(|e| match e.values.as_deref() {
            Some([node]) => Some(node.clone()),
            _ => None,
        })
}

/// Interpret pod status for the bounded waits.
pub fn pod_state_of(pod: &Pod) -> PodState {
    let Some(status) = pod.status.as_ref() else {
        return PodState::Pending { reason: None };
    };
    let containers = status.container_statuses.as_deref().unwrap_or_default();

    match PodPhase::parse(status.phase.as_deref()) {
        PodPhase::Pending => PodState::Pending {
            reason: containers
                .iter()
                .filter_map(|c| c.state.as_ref()?.waiting.as_ref()?.reason.clone())
                .next(),
        },
        PodPhase::Running => PodState::Running {
            ready: !containers.is_empty() && containers.iter().all(|c| c.ready),
        },
        PodPhase::Succeeded => PodState::Succeeded,
        PodPhase::Failed => {
            let terminated = containers
                .iter()
                .filter_map(|c| c.state.as_ref()?.terminated.as_ref())
                .next();
            PodState::Failed {
                exit_code: terminated.map(|t| t.exit_code),
                reason: terminated
                    .and_then(|t| t.reason.clone())
                    .or_else(|| status.reason.clone()),
            }
        }
        PodPhase::Unknown => PodState::Unknown,
    }
}

/// First load balancer address of a service.
pub fn ingress_of(service: &Service) -> Option<String> {
    service
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .iter()
        .find_map(|i| i.ip.clone().or_else(|| i.hostname.clone()))
}

// =============================================================================
// Connector
// =============================================================================

/// Builds one client per distinct resolved [`ClusterAccess`].
#[derive(Default)]
pub struct KubeConnector {
    clients: HashMap<ClusterAccess, Client>,
}

impl KubeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill in the current context so that two descriptors naming the same
    /// context compare equal.
    ///
    /// Without any kubeconfig the descriptor is kept as-is and the in-cluster
    /// configuration is used on connect.
    pub fn resolve_access(&self, access: &ClusterAccess) -> Result<ClusterAccess> {
        if access.context.is_some() {
            return Ok(access.clone());
        }

        let kubeconfig = match (load_kubeconfig(access), &access.kubeconfig) {
            (Ok(config), _) => config,
            (Err(_), None) => return Ok(access.clone()),
            (Err(e), Some(_)) => return Err(e),
        };

        Ok(ClusterAccess::new(
            access.kubeconfig.clone(),
            kubeconfig.current_context,
        ))
    }

    /// Client for `access`, created on first use.
    #[instrument(skip(self), fields(access = %access))]
    pub async fn connect(&mut self, access: &ClusterAccess) -> Result<Client> {
        let resolved = self.resolve_access(access)?;
        if let Some(client) = self.clients.get(&resolved) {
            return Ok(client.clone());
        }

        let config = if resolved.kubeconfig.is_none() && resolved.context.is_none() {
            Config::infer()
                .await
                .map_err(|e| Error::Kubeconfig(e.to_string()))?
        } else {
            let kubeconfig = load_kubeconfig(&resolved)?;
            let options = KubeConfigOptions {
                context: resolved.context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| Error::Kubeconfig(e.to_string()))?
        };

        let client = Client::try_from(config)?;
        info!(access = %resolved, "Connected to cluster");
        self.clients.insert(resolved, client.clone());
        Ok(client)
    }

    /// Resolve a claim reference; an empty namespace means the context's default.
    pub async fn locate(
        &mut self,
        access: &ClusterAccess,
        namespace: Option<String>,
        name: impl Into<String>,
    ) -> Result<VolumeLocator> {
        let resolved = self.resolve_access(access)?;
        let client = self.connect(&resolved).await?;
        let namespace = namespace
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| client.default_namespace().to_string());
        Ok(VolumeLocator::new(resolved, namespace, name))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Hand the connected clusters to the engine.
    pub fn into_cluster_set(self) -> ClusterSet {
        let mut clusters = ClusterSet::new();
        for (access, client) in self.clients {
            let label = access.to_string();
            clusters.insert(access, Arc::new(KubeCluster::new(client, label)));
        }
        clusters
    }
}

fn load_kubeconfig(access: &ClusterAccess) -> Result<Kubeconfig> {
    match &access.kubeconfig {
        Some(path) => Kubeconfig::read_from(path),
        None => Kubeconfig::read(),
    }
    .map_err(|e| Error::Kubeconfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateTerminated, ContainerStateWaiting, ContainerStatus,
        LoadBalancerIngress, LoadBalancerStatus, NodeSelector, NodeSelectorRequirement,
        NodeSelectorTerm, PersistentVolumeClaimVolumeSource, PersistentVolumeSpec, PodSpec,
        PodStatus, ServiceStatus, Volume, VolumeNodeAffinity,
    };
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn pod(name: &str, claim: &str, phase: &str, managed: bool) -> Pod {
        let labels = managed.then(|| {
            BTreeMap::from([(LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string())])
        });
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels,
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some("node-a".to_string()),
                volumes: Some(vec![Volume {
                    name: "data".to_string(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                        claim_name: claim.to_string(),
                        read_only: None,
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        }
    }

    fn with_container(mut pod: Pod, status: ContainerStatus) -> Pod {
        if let Some(s) = pod.status.as_mut() {
            s.container_statuses = Some(vec![status]);
        }
        pod
    }

    #[test]
    fn test_claim_users_filters_by_claim() {
        let pods = vec![
            pod("web-0", "data", "Running", false),
            pod("web-1", "other", "Running", false),
            pod("pv-migrate-1-rsync", "data", "Running", true),
        ];

        let users = claim_users_of(&pods, "data");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].pod, "web-0");
        assert_eq!(users[0].node.as_deref(), Some("node-a"));
        assert_eq!(users[0].phase, PodPhase::Running);
        assert!(!users[0].managed);
        assert!(users[1].managed);
    }

    #[test]
    fn test_pinned_node_requires_single_hostname() {
        let volume = |values: Vec<&str>| PersistentVolume {
            spec: Some(PersistentVolumeSpec {
                node_affinity: Some(VolumeNodeAffinity {
                    required: Some(NodeSelector {
                        node_selector_terms: vec![NodeSelectorTerm {
                            match_expressions: Some(vec![NodeSelectorRequirement {
                                key: HOSTNAME_LABEL.to_string(),
                                operator: "In".to_string(),
                                values: Some(values.into_iter().map(String::from).collect()),
                            }]),
                            match_fields: None,
                        }],
                    }),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(pinned_node_of(&volume(vec!["node-a"])), Some("node-a".to_string()));
        assert_eq!(pinned_node_of(&volume(vec!["node-a", "node-b"])), None);
        assert_eq!(pinned_node_of(&PersistentVolume::default()), None);
    }

    #[test]
    fn test_pod_state_interpretation() {
        let waiting = with_container(
            pod("p", "data", "Pending", true),
            ContainerStatus {
                state: Some(ContainerState {
                    waiting: Some(ContainerStateWaiting {
                        reason: Some("ErrImagePull".to_string()),
                        message: None,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        assert_eq!(
            pod_state_of(&waiting),
            PodState::Pending {
                reason: Some("ErrImagePull".to_string())
            }
        );

        let ready = with_container(
            pod("p", "data", "Running", true),
            ContainerStatus {
                ready: true,
                ..Default::default()
            },
        );
        assert_eq!(pod_state_of(&ready), PodState::Running { ready: true });

        let failed = with_container(
            pod("p", "data", "Failed", true),
            ContainerStatus {
                state: Some(ContainerState {
                    terminated: Some(ContainerStateTerminated {
                        exit_code: 23,
                        reason: Some("Error".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        assert_eq!(
            pod_state_of(&failed),
            PodState::Failed {
                exit_code: Some(23),
                reason: Some("Error".to_string())
            }
        );

        assert_eq!(
            pod_state_of(&pod("p", "data", "Succeeded", true)),
            PodState::Succeeded
        );
        assert_eq!(
            pod_state_of(&Pod::default()),
            PodState::Pending { reason: None }
        );
    }

    #[test]
    fn test_ingress_prefers_ip() {
        let service = |ip: Option<&str>, hostname: Option<&str>| Service {
            status: Some(ServiceStatus {
                load_balancer: Some(LoadBalancerStatus {
                    ingress: Some(vec![LoadBalancerIngress {
                        ip: ip.map(String::from),
                        hostname: hostname.map(String::from),
                        ..Default::default()
                    }]),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            ingress_of(&service(Some("10.0.0.1"), Some("lb.example"))),
            Some("10.0.0.1".to_string())
        );
        assert_eq!(
            ingress_of(&service(None, Some("lb.example"))),
            Some("lb.example".to_string())
        );
        assert_eq!(ingress_of(&Service::default()), None);
    }

    #[test]
    fn test_explicit_context_is_kept() {
        let connector = KubeConnector::new();
        let access = ClusterAccess::new(None, Some("prod".into()));
        assert_eq!(connector.resolve_access(&access).unwrap(), access);
        assert!(connector.is_empty());
    }
}
