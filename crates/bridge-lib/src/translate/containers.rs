//! Per-container target definitions

use super::{
    security::security_context,
    volumes::{volume_mounts, VolumeNames},
};
use crate::models::Container;
use k8s_openapi::api::core::v1::{Container as PodContainer, EnvVar};

/// Build the pod container for a source container
///
/// The source entry point maps to `command` and the source command to
/// `args`, matching how the image's ENTRYPOINT/CMD are overridden.
/// Mount names come from the request-wide `volumes`.
pub fn container<'a>(source: &'a Container, volumes: &VolumeNames<'a>) -> PodContainer {
    let mounts = volume_mounts(source, volumes);

    PodContainer {
        name: source.name.clone(),
        image: non_empty(&source.image),
        command: non_empty_list(&source.entry_point),
        args: non_empty_list(&source.command),
        env: env(source),
        working_dir: non_empty(&source.working_dir),
        tty: source.tty.then_some(true),
        stdin: source.stdin_open.then_some(true),
        volume_mounts: (!mounts.is_empty()).then_some(mounts),
        security_context: Some(security_context(source)),
        ..Default::default()
    }
}

fn env(source: &Container) -> Option<Vec<EnvVar>> {
    if source.environment.is_empty() {
        return None;
    }

    Some(
        source
            .environment
            .iter()
            .map(|(name, value)| EnvVar {
                name: name.clone(),
                value: Some(value.to_string()),
                value_from: None,
            })
            .collect(),
    )
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn non_empty_list(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}
