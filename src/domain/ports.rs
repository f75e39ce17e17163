//! Domain Ports (DDD Port/Adapter Pattern)
//!
//! Value objects describing a migration request and the cluster state the
//! strategies reason about, plus the traits the migrator depends on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Migrator                                │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │          ClusterApi      │      EventPublisher       │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │   KubeCluster   │   LoggingEventPublisher            │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Secret, Service};
use serde::Serialize;

use super::events::MigrationEvent;
use crate::error::Result;

/// Image used for running rsync.
pub const DEFAULT_RSYNC_IMAGE: &str = "docker.io/instrumentisto/rsync-ssh:alpine";

/// Image used for running the sshd relay.
pub const DEFAULT_SSHD_IMAGE: &str = "docker.io/panubo/sshd:1.3.0";

/// Mounted volumes are refused unless explicitly allowed.
pub const DEFAULT_IGNORE_MOUNTED: bool = false;

// =============================================================================
// Request Value Objects
// =============================================================================

/// How to reach a cluster: kubeconfig path and context.
///
/// `None` means "default": the default kubeconfig chain or its current
/// context. Locators are compared after resolution, see
/// [`KubeConnector::resolve_access`](crate::adapters::KubeConnector::resolve_access).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ClusterAccess {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
}

impl ClusterAccess {
    pub fn new(kubeconfig: Option<PathBuf>, context: Option<String>) -> Self {
        Self {
            kubeconfig: kubeconfig.filter(|p| !p.as_os_str().is_empty()),
            context: context.filter(|c| !c.is_empty()),
        }
    }
}

impl std::fmt::Display for ClusterAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = self
            .kubeconfig
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<default>".to_string());
        let context = self.context.as_deref().unwrap_or("<current>");
        write!(f, "{}@{}", context, path)
    }
}

/// Identifies one PersistentVolumeClaim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeLocator {
    pub access: ClusterAccess,
    pub namespace: String,
    pub name: String,
}

impl VolumeLocator {
    pub fn new(access: ClusterAccess, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            access,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Same resolved kubeconfig and context.
    pub fn same_cluster(&self, other: &VolumeLocator) -> bool {
        self.access == other.access
    }

    /// Same cluster and same namespace.
    pub fn same_namespace(&self, other: &VolumeLocator) -> bool {
        self.same_cluster(other) && self.namespace == other.namespace
    }
}

impl std::fmt::Display for VolumeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Transfer behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferOptions {
    /// Remove destination files that do not exist in the source (rsync `--delete`)
    pub delete_extraneous: bool,

    /// Proceed even if either volume is mounted by a running workload
    pub ignore_mounted: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            delete_extraneous: false,
            ignore_mounted: DEFAULT_IGNORE_MOUNTED,
        }
    }
}

/// One migration job. Built once, shared by reference, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub source: VolumeLocator,
    pub destination: VolumeLocator,
    pub options: TransferOptions,

    /// Strategy names to try, in order. Empty means every built-in strategy.
    pub strategies: Vec<String>,

    pub rsync_image: String,
    pub sshd_image: String,
}

impl Request {
    pub fn new(source: VolumeLocator, destination: VolumeLocator, options: TransferOptions) -> Self {
        Self {
            source,
            destination,
            options,
            strategies: Vec::new(),
            rsync_image: DEFAULT_RSYNC_IMAGE.to_string(),
            sshd_image: DEFAULT_SSHD_IMAGE.to_string(),
        }
    }

    pub fn with_strategies<I, S>(mut self, strategies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategies = strategies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_images(mut self, rsync_image: impl Into<String>, sshd_image: impl Into<String>) -> Self {
        self.rsync_image = rsync_image.into();
        self.sshd_image = sshd_image.into();
        self
    }
}

// =============================================================================
// Cluster State Value Objects
// =============================================================================

/// PersistentVolumeClaim access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    ReadWriteMany,
    ReadWriteOncePod,
}

impl AccessMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ReadWriteOnce" => Some(AccessMode::ReadWriteOnce),
            "ReadOnlyMany" => Some(AccessMode::ReadOnlyMany),
            "ReadWriteMany" => Some(AccessMode::ReadWriteMany),
            "ReadWriteOncePod" => Some(AccessMode::ReadWriteOncePod),
            _ => None,
        }
    }
}

/// What the cluster knows about a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimInfo {
    pub namespace: String,
    pub name: String,
    pub access_modes: Vec<AccessMode>,

    /// Node the bound volume is pinned to by its node affinity, if any
    pub pinned_node: Option<String>,
}

impl ClaimInfo {
    /// Can be read from pods on several nodes at once.
    pub fn readable_from_many_nodes(&self) -> bool {
        self.access_modes
            .iter()
            .any(|m| matches!(m, AccessMode::ReadOnlyMany | AccessMode::ReadWriteMany))
    }

    /// Can be written from pods on several nodes at once.
    pub fn writable_from_many_nodes(&self) -> bool {
        self.access_modes.contains(&AccessMode::ReadWriteMany)
    }
}

/// A pod referencing a claim in its volumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimUser {
    pub pod: String,
    pub node: Option<String>,
    pub phase: PodPhase,

    /// Created by pv-migrate itself
    pub managed: bool,
}

/// Result of mount inspection for a single volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MountStatus {
    pub mounted: bool,
    pub node: Option<String>,
    pub pod: Option<String>,
}

/// Pod lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("Pending") => PodPhase::Pending,
            Some("Running") => PodPhase::Running,
            Some("Succeeded") => PodPhase::Succeeded,
            Some("Failed") => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PodPhase::Succeeded | PodPhase::Failed)
    }
}

/// Observed state of an ephemeral pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodState {
    /// Not scheduled or containers not started; `reason` carries a waiting reason
    Pending { reason: Option<String> },
    Running { ready: bool },
    Succeeded,
    Failed {
        exit_code: Option<i32>,
        reason: Option<String>,
    },
    Unknown,
    /// The pod no longer exists
    Gone,
}

/// Kind of an ephemeral cluster object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResourceKind {
    Pod,
    Service,
    Secret,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Pod => write!(f, "pod"),
            ResourceKind::Service => write!(f, "service"),
            ResourceKind::Secret => write!(f, "secret"),
        }
    }
}

/// Handle to a created cluster object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

// =============================================================================
// Cluster Port
// =============================================================================

/// Port for everything the migrator asks of one cluster.
///
/// One handle exists per distinct [`ClusterAccess`]. Implementations must not
/// retry creates: a failed create is reported and nothing is left behind.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch a claim. A missing claim is `Error::ClaimNotFound`.
    async fn claim(&self, namespace: &str, name: &str) -> Result<ClaimInfo>;

    /// List pods in `namespace` that reference `claim` in their volumes.
    async fn claim_users(&self, namespace: &str, claim: &str) -> Result<Vec<ClaimUser>>;

    async fn create_pod(&self, pod: &Pod) -> Result<ResourceRef>;

    async fn create_service(&self, service: &Service) -> Result<ResourceRef>;

    async fn create_secret(&self, secret: &Secret) -> Result<ResourceRef>;

    /// Delete a previously created object. Already-gone objects are not an error.
    async fn delete(&self, resource: &ResourceRef) -> Result<()>;

    async fn pod_state(&self, namespace: &str, name: &str) -> Result<PodState>;

    /// Externally routable address of a LoadBalancer service, once assigned.
    async fn service_ingress(&self, namespace: &str, name: &str) -> Result<Option<String>>;
}

// =============================================================================
// Event Publisher Port
// =============================================================================

/// Port for publishing migration events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a migration event.
    async fn publish(&self, event: MigrationEvent) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================
