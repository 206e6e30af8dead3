//! Pod labels and annotations

use crate::labels::{is_marker_label, CONTAINER_UUID_LABEL, DEPLOYMENT_UUID_LABEL, REVISION_LABEL};
use crate::models::{Container, DeploymentSyncRequest};
use std::collections::BTreeMap;

/// Identity labels for the pod: revision and deployment unit uuid
pub fn labels(request: &DeploymentSyncRequest) -> BTreeMap<String, String> {
    BTreeMap::from([
        (REVISION_LABEL.to_string(), request.revision.clone()),
        (
            DEPLOYMENT_UUID_LABEL.to_string(),
            request.deployment_unit_uuid.clone(),
        ),
    ])
}

/// Flatten every container's labels into pod annotations
///
/// Primary container labels keep their key, so a later primary overwrites an
/// earlier one. Sidecar labels are qualified as `<container>/<key>`. Each
/// container also gets a `<container>/io.rancher.container.uuid` entry.
pub fn annotations(containers: &[Container]) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();

    for container in containers {
        for (key, value) in &container.labels {
            if is_marker_label(key) {
                continue;
            }

            let key = if container.is_primary() {
                key.clone()
            } else {
                qualified(&container.name, key)
            };
            annotations.insert(key, value.as_annotation());
        }

        annotations.insert(
            qualified(&container.name, CONTAINER_UUID_LABEL),
            container.uuid.clone(),
        );
    }

    annotations
}

fn qualified(container_name: &str, key: &str) -> String {
    format!("{}/{}", container_name, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{LabelValue, SERVICE_LAUNCH_CONFIG, SERVICE_PRIMARY_LAUNCH_CONFIG};
    use crate::models::DeploymentSyncRequest;

    const UUID: &str = "00000000-0000-0000-0000-000000000000";

    fn container(name: &str, labels: &[(&str, &str)]) -> Container {
        Container {
            name: name.to_string(),
            uuid: UUID.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), LabelValue::from(*v)))
                .collect(),
            ..Default::default()
        }
    }

    fn normalized(containers: Vec<Container>) -> Vec<Container> {
        DeploymentSyncRequest {
            containers,
            ..Default::default()
        }
        .normalize()
        .unwrap()
        .containers
    }

    #[test]
    fn test_labels() {
        let request = DeploymentSyncRequest {
            revision: "revision".to_string(),
            deployment_unit_uuid: UUID.to_string(),
            ..Default::default()
        };

        let expected = BTreeMap::from([
            (REVISION_LABEL.to_string(), "revision".to_string()),
            (DEPLOYMENT_UUID_LABEL.to_string(), UUID.to_string()),
        ]);
        assert_eq!(labels(&request), expected);
    }

    #[test]
    fn test_labels_keep_empty_values() {
        let labels = labels(&DeploymentSyncRequest::default());
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[REVISION_LABEL], "");
        assert_eq!(labels[DEPLOYMENT_UUID_LABEL], "");
    }

    #[test]
    fn test_annotations() {
        let containers = normalized(vec![
            container(
                "c1",
                &[
                    (SERVICE_LAUNCH_CONFIG, SERVICE_PRIMARY_LAUNCH_CONFIG),
                    ("a", "b"),
                ],
            ),
            container("c2", &[("c", "d")]),
        ]);

        let expected = BTreeMap::from([
            ("a".to_string(), "b".to_string()),
            ("c1/io.rancher.container.uuid".to_string(), UUID.to_string()),
            ("c2/c".to_string(), "d".to_string()),
            ("c2/io.rancher.container.uuid".to_string(), UUID.to_string()),
        ]);
        assert_eq!(annotations(&containers), expected);
    }

    #[test]
    fn test_marker_label_never_propagates() {
        let containers = normalized(vec![
            container("c1", &[(SERVICE_LAUNCH_CONFIG, SERVICE_PRIMARY_LAUNCH_CONFIG)]),
            container("c2", &[(SERVICE_LAUNCH_CONFIG, "sidekick")]),
        ]);

        let annotations = annotations(&containers);
        assert!(annotations
            .keys()
            .all(|key| !key.ends_with(SERVICE_LAUNCH_CONFIG)));
        assert_eq!(annotations.len(), 2);
    }

    #[test]
    fn test_last_primary_wins_on_collision() {
        let marker = (SERVICE_LAUNCH_CONFIG, SERVICE_PRIMARY_LAUNCH_CONFIG);
        let containers = normalized(vec![
            container("c1", &[marker, ("tier", "web")]),
            container("c2", &[marker, ("tier", "api")]),
        ]);

        assert_eq!(annotations(&containers)["tier"], "api");
    }

    #[test]
    fn test_bool_labels_render_as_strings() {
        let mut c = container("c1", &[]);
        c.labels.insert("enabled".to_string(), LabelValue::Bool(false));

        let annotations = annotations(&normalized(vec![c]));
        assert_eq!(annotations["c1/enabled"], "false");
    }
}
