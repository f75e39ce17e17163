//! Domain Layer
//!
//! Value objects, ports and events shared by the migrator and its adapters.
//!
//! - **Ports** (`ports.rs`) - Request model, cluster state and trait abstractions
//! - **Events** (`events.rs`) - Phase-transition events for observability

pub mod events;
pub mod ports;

pub use events::MigrationEvent;
pub use ports::{
    AccessMode, ClaimInfo, ClaimUser, ClusterAccess, ClusterApi, EventPublisher, MountStatus,
    PodPhase, PodState, Request, ResourceKind, ResourceRef, TransferOptions, VolumeLocator,
    DEFAULT_IGNORE_MOUNTED, DEFAULT_RSYNC_IMAGE, DEFAULT_SSHD_IMAGE,
};
