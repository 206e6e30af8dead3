//! Volume and volume mount resolution
//!
//! Two sources contribute per container: bind-mount style data volumes and
//! tmpfs mounts. Volume names are derived from a hash of the source path so
//! the same host path used by several containers collapses to one volume.
//! A path used both as a host path and as a tmpfs gets a second,
//! kind-qualified name for whichever source shows up later.

use crate::models::{Container, DeploymentSyncRequest};
use k8s_openapi::api::core::v1::{
    EmptyDirVolumeSource, HostPathVolumeSource, Volume, VolumeMount,
};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Hex characters kept from the digest; fits a DNS-1123 label
const VOLUME_NAME_LEN: usize = 32;

const MEMORY_MEDIUM: &str = "Memory";

/// Options Docker accepts after the container path of a bind mount
const MOUNT_OPTIONS: &[&str] = &[
    "ro", "rw", "z", "Z", "shared", "rshared", "slave", "rslave", "private", "rprivate",
    "nocopy", "consistent", "cached", "delegated",
];

/// Stable volume name for a source path
pub fn volume_name(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    let mut name = hex::encode(digest);
    name.truncate(VOLUME_NAME_LEN);
    name
}

/// A parsed `hostPath:containerPath[:options]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount<'a> {
    pub host_path: &'a str,
    pub container_path: &'a str,
    pub read_only: bool,
}

fn is_mount_options(segment: &str) -> bool {
    !segment.is_empty() && segment.split(',').all(|option| MOUNT_OPTIONS.contains(&option))
}

/// Parse a data volume entry
///
/// The trailing segment is an option list (`ro`, `z`, `ro,Z`, ...) when
/// every entry is a known mount option; `ro` anywhere makes the mount
/// read-only. Returns `None` for anonymous volumes (no host path mapping)
/// and for entries whose container path is not absolute.
pub fn parse_data_volume(spec: &str) -> Option<BindMount<'_>> {
    let (rest, read_only) = match spec.rsplit_once(':') {
        Some((rest, options)) if is_mount_options(options) => {
            (rest, options.split(',').any(|option| option == "ro"))
        }
        _ => (spec, false),
    };

    let (host_path, container_path) = rest.rsplit_once(':')?;
    if host_path.is_empty() || !container_path.starts_with('/') {
        return None;
    }

    Some(BindMount {
        host_path,
        container_path,
        read_only,
    })
}

/// Where a pod volume's content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeSource<'a> {
    HostPath(&'a str),
    Memory(&'a str),
}

impl<'a> VolumeSource<'a> {
    fn path(&self) -> &'a str {
        match *self {
            VolumeSource::HostPath(path) | VolumeSource::Memory(path) => path,
        }
    }

    /// Name used when the plain path hash is taken by the other kind
    fn qualified_name(&self) -> String {
        match self {
            VolumeSource::HostPath(path) => volume_name(&format!("hostPath:{}", path)),
            VolumeSource::Memory(path) => volume_name(&format!("tmpfs:{}", path)),
        }
    }

    fn into_volume(self, name: String) -> Volume {
        match self {
            VolumeSource::HostPath(path) => Volume {
                name,
                host_path: Some(HostPathVolumeSource {
                    path: path.to_string(),
                    type_: None,
                }),
                ..Default::default()
            },
            VolumeSource::Memory(_) => Volume {
                name,
                empty_dir: Some(EmptyDirVolumeSource {
                    medium: Some(MEMORY_MEDIUM.to_string()),
                    size_limit: None,
                }),
                ..Default::default()
            },
        }
    }
}

fn container_sources(container: &Container) -> impl Iterator<Item = VolumeSource<'_>> {
    let host_paths = container
        .data_volumes
        .iter()
        .filter_map(|spec| parse_data_volume(spec))
        .map(|mount| VolumeSource::HostPath(mount.host_path));

    let tmpfs = container
        .tmpfs
        .keys()
        .map(|path| VolumeSource::Memory(path.as_str()));

    host_paths.chain(tmpfs)
}

/// Volume names for every source of a request, in first-seen order
///
/// Sources not registered here resolve to the plain path hash.
#[derive(Debug, Default)]
pub struct VolumeNames<'a> {
    order: Vec<VolumeSource<'a>>,
    names: HashMap<VolumeSource<'a>, String>,
}

impl<'a> VolumeNames<'a> {
    pub fn new(request: &'a DeploymentSyncRequest) -> Self {
        let mut resolved = Self::default();
        let mut taken: HashSet<String> = HashSet::new();

        for source in request.containers.iter().flat_map(container_sources) {
            if resolved.names.contains_key(&source) {
                continue;
            }

            let mut name = volume_name(source.path());
            if taken.contains(&name) {
                name = source.qualified_name();
            }
            taken.insert(name.clone());
            resolved.order.push(source);
            resolved.names.insert(source, name);
        }

        resolved
    }

    pub fn name(&self, source: VolumeSource<'a>) -> String {
        self.names
            .get(&source)
            .cloned()
            .unwrap_or_else(|| volume_name(source.path()))
    }

    /// Pod-level volumes, one per distinct source
    pub fn volumes(&self) -> Vec<Volume> {
        self.order
            .iter()
            .map(|source| source.into_volume(self.names[source].clone()))
            .collect()
    }
}

/// Pod-level volumes for every container, unique by source in first-seen order
pub fn volumes(request: &DeploymentSyncRequest) -> Vec<Volume> {
    VolumeNames::new(request).volumes()
}

/// Mounts for a single container, named after the request's volumes
pub fn volume_mounts<'a>(container: &'a Container, names: &VolumeNames<'a>) -> Vec<VolumeMount> {
    let binds = container
        .data_volumes
        .iter()
        .filter_map(|spec| parse_data_volume(spec))
        .map(|mount| VolumeMount {
            name: names.name(VolumeSource::HostPath(mount.host_path)),
            mount_path: mount.container_path.to_string(),
            read_only: mount.read_only.then_some(true),
            ..Default::default()
        });

    let tmpfs = container.tmpfs.keys().map(|path| VolumeMount {
        name: names.name(VolumeSource::Memory(path)),
        mount_path: path.clone(),
        ..Default::default()
    });

    binds.chain(tmpfs).collect()
}
