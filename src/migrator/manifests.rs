//! Ephemeral object construction
//!
//! Builds the Pods, Services and Secrets a strategy attempt provisions.
//! Every object carries the pv-migrate labels so that the mount inspector
//! can skip it and operators can find leftovers.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, Container, ContainerPort, EnvVar, KeyToPath, NodeAffinity, NodeSelector,
    NodeSelectorRequirement, NodeSelectorTerm, PersistentVolumeClaimVolumeSource, Pod, PodSpec,
    Probe, Secret, SecretVolumeSource, Service, ServicePort, ServiceSpec, TCPSocketAction, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::engine::EngineConfig;
use crate::domain::ports::TransferOptions;

pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const MANAGED_BY: &str = "pv-migrate";

/// Where the source claim is mounted in transfer pods
pub const SOURCE_MOUNT_PATH: &str = "/source";

/// Where the destination claim is mounted in the relay and co-mount pods
pub const DEST_MOUNT_PATH: &str = "/dest";

const SSH_PORT: i32 = 22;
const KEY_DIR: &str = "/etc/pv-migrate";
const PRIVATE_KEY_FILE: &str = "id_ed25519";
const AUTHORIZED_KEYS_FILE: &str = "authorized_keys";

/// Destination of an rsync invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsyncTarget<'a> {
    /// Destination claim mounted in the same pod
    Local,
    /// sshd relay reachable at `host`
    Remote { host: &'a str },
}

/// How the relay service is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    ClusterIp,
    LoadBalancer,
}

impl Exposure {
    fn service_type(&self) -> &'static str {
        match self {
            Exposure::ClusterIp => "ClusterIP",
            Exposure::LoadBalancer => "LoadBalancer",
        }
    }
}

/// Labels shared by every object of one attempt.
pub fn labels(attempt_id: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string()),
        (LABEL_INSTANCE.to_string(), attempt_id.to_string()),
        (LABEL_COMPONENT.to_string(), component.to_string()),
    ])
}

fn metadata(name: &str, namespace: &str, labels: &BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(labels.clone()),
        ..Default::default()
    }
}

/// Shell script running rsync with bounded retries.
pub fn rsync_script(options: &TransferOptions, config: &EngineConfig, target: RsyncTarget<'_>) -> String {
    let mut command = vec!["rsync", "-azv", "--info=progress2"];
    if options.delete_extraneous {
        command.push("--delete");
    }

    let ssh = format!(
        "ssh -i {}/{} -p {} -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null -o ConnectTimeout=5",
        KEY_DIR, PRIVATE_KEY_FILE, SSH_PORT
    );
    let destination = match target {
        RsyncTarget::Local => format!("{}/", DEST_MOUNT_PATH),
        RsyncTarget::Remote { host } => format!("root@{}:{}/", host, DEST_MOUNT_PATH),
    };

    let mut line = command.join(" ");
    if let RsyncTarget::Remote { .. } = target {
        line.push_str(&format!(" -e \"{}\"", ssh));
    }
    line.push_str(&format!(" {}/ {}", SOURCE_MOUNT_PATH, destination));

    format!(
        "n=0\n\
         rc=1\n\
         retries={retries}\n\
         until [ \"$n\" -ge \"$retries\" ]; do\n  \
           {line} && rc=0 && break\n  \
           n=$((n+1))\n  \
           echo \"rsync attempt $n/$retries failed, waiting {delay} seconds before retry\"\n  \
           sleep {delay}\n\
         done\n\
         exit $rc\n",
        retries = config.transfer_retries.max(1),
        delay = config.retry_delay.as_secs(),
        line = line,
    )
}

fn claim_volume(volume: &str, claim: &str, read_only: bool) -> Volume {
    Volume {
        name: volume.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim.to_string(),
            read_only: Some(read_only),
        }),
        ..Default::default()
    }
}

fn secret_volume(volume: &str, secret: &str, key: &str, mode: i32) -> Volume {
    Volume {
        name: volume.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            default_mode: Some(mode),
            items: Some(vec![KeyToPath {
                key: key.to_string(),
                path: key.to_string(),
                mode: Some(mode),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mount(volume: &str, path: &str, read_only: bool) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: path.to_string(),
        read_only: Some(read_only),
        ..Default::default()
    }
}

fn pinned_to(node: &str) -> Affinity {
    Affinity {
        node_affinity: Some(NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm {
                    match_fields: Some(vec![NodeSelectorRequirement {
                        key: "metadata.name".to_string(),
                        operator: "In".to_string(),
                        values: Some(vec![node.to_string()]),
                    }]),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Pod mounting both claims and copying locally.
pub struct MountBothPod<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub attempt_id: &'a str,
    pub image: &'a str,
    pub source_claim: &'a str,
    pub destination_claim: &'a str,
    pub node: Option<&'a str>,
    pub script: String,
}

impl MountBothPod<'_> {
    pub fn build(&self) -> Pod {
        let container = Container {
            name: "rsync".to_string(),
            image: Some(self.image.to_string()),
            command: Some(vec!["sh".to_string(), "-c".to_string(), self.script.clone()]),
            volume_mounts: Some(vec![
                mount("source", SOURCE_MOUNT_PATH, true),
                mount("dest", DEST_MOUNT_PATH, false),
            ]),
            ..Default::default()
        };

        Pod {
            metadata: metadata(self.name, self.namespace, &labels(self.attempt_id, "mount-both")),
            spec: Some(PodSpec {
                containers: vec![container],
                volumes: Some(vec![
                    claim_volume("source", self.source_claim, true),
                    claim_volume("dest", self.destination_claim, false),
                ]),
                restart_policy: Some("Never".to_string()),
                affinity: self.node.map(pinned_to),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Secret holding the relay's `authorized_keys`.
pub fn authorized_keys_secret(name: &str, namespace: &str, attempt_id: &str, authorized_key: &str) -> Secret {
    Secret {
        metadata: metadata(name, namespace, &labels(attempt_id, "sshd")),
        string_data: Some(BTreeMap::from([(
            AUTHORIZED_KEYS_FILE.to_string(),
            format!("{}\n", authorized_key),
        )])),
        ..Default::default()
    }
}

/// Secret holding the transfer pod's private key.
pub fn private_key_secret(name: &str, namespace: &str, attempt_id: &str, private_key: &str) -> Secret {
    Secret {
        metadata: metadata(name, namespace, &labels(attempt_id, "rsync")),
        string_data: Some(BTreeMap::from([(
            PRIVATE_KEY_FILE.to_string(),
            private_key.to_string(),
        )])),
        ..Default::default()
    }
}

/// sshd relay pod with the destination claim mounted, pinned to `node` when
/// the claim is already attached there.
pub fn sshd_pod(
    name: &str,
    namespace: &str,
    attempt_id: &str,
    image: &str,
    destination_claim: &str,
    keys_secret: &str,
    node: Option<&str>,
) -> Pod {
    let container = Container {
        name: "sshd".to_string(),
        image: Some(image.to_string()),
        env: Some(vec![EnvVar {
            name: "SSH_ENABLE_ROOT".to_string(),
            value: Some("true".to_string()),
            ..Default::default()
        }]),
        ports: Some(vec![ContainerPort {
            name: Some("ssh".to_string()),
            container_port: SSH_PORT,
            ..Default::default()
        }]),
        readiness_probe: Some(Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::Int(SSH_PORT),
                ..Default::default()
            }),
            period_seconds: Some(2),
            ..Default::default()
        }),
        volume_mounts: Some(vec![
            mount("dest", DEST_MOUNT_PATH, false),
            mount("keys", "/root/.ssh", true),
        ]),
        ..Default::default()
    };

    Pod {
        metadata: metadata(name, namespace, &labels(attempt_id, "sshd")),
        spec: Some(PodSpec {
            containers: vec![container],
            volumes: Some(vec![
                claim_volume("dest", destination_claim, false),
                secret_volume("keys", keys_secret, AUTHORIZED_KEYS_FILE, 0o600),
            ]),
            restart_policy: Some("Never".to_string()),
            affinity: node.map(pinned_to),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Service in front of the sshd relay.
pub fn relay_service(name: &str, namespace: &str, attempt_id: &str, exposure: Exposure) -> Service {
    let selector = labels(attempt_id, "sshd");
    Service {
        metadata: metadata(name, namespace, &selector),
        spec: Some(ServiceSpec {
            type_: Some(exposure.service_type().to_string()),
            selector: Some(selector),
            ports: Some(vec![ServicePort {
                name: Some("ssh".to_string()),
                port: SSH_PORT,
                target_port: Some(IntOrString::Int(SSH_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// rsync pod pushing the source claim to a relay.
#[allow(clippy::too_many_arguments)]
pub fn rsync_pod(
    name: &str,
    namespace: &str,
    attempt_id: &str,
    image: &str,
    source_claim: &str,
    key_secret: &str,
    node: Option<&str>,
    script: String,
) -> Pod {
    let container = Container {
        name: "rsync".to_string(),
        image: Some(image.to_string()),
        command: Some(vec!["sh".to_string(), "-c".to_string(), script]),
        volume_mounts: Some(vec![
            mount("source", SOURCE_MOUNT_PATH, true),
            mount("key", KEY_DIR, true),
        ]),
        ..Default::default()
    };

    Pod {
        metadata: metadata(name, namespace, &labels(attempt_id, "rsync")),
        spec: Some(PodSpec {
            containers: vec![container],
            volumes: Some(vec![
                claim_volume("source", source_claim, true),
                secret_volume("key", key_secret, PRIVATE_KEY_FILE, 0o400),
            ]),
            restart_policy: Some("Never".to_string()),
            affinity: node.map(pinned_to),
            ..Default::default()
        }),
        ..Default::default()
    }
}
