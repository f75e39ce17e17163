//! Migrator module
//!
//! Moves the contents of one PersistentVolumeClaim into another, falling back
//! through transfer strategies until one succeeds.

mod context;
mod engine;
mod inspector;
mod keys;
mod manifests;
mod proptest;
mod resources;
mod strategy;

pub use context::{AttemptContext, ClusterSet};
pub use engine::{
    AttemptOutcome, AttemptResult, Engine, EngineConfig, MigrationReport, RunState, RunStep,
};
pub use inspector::{MountInspector, VolumeProbe};
pub use keys::SshKeyPair;
pub use manifests::{LABEL_COMPONENT, LABEL_INSTANCE, LABEL_MANAGED_BY, MANAGED_BY};
pub use strategy::{
    co_mount_node, Applicability, MountBoth, RsyncCrossCluster, RsyncInCluster, Strategy,
    StrategyRegistry, MOUNT_BOTH, RSYNC_CROSS_CLUSTER, RSYNC_IN_CLUSTER,
};
