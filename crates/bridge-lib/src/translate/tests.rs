//! End-to-end translation tests
//!
//! Each test feeds a whole request through `translate_request` and checks the
//! resulting pod.

use super::*;
use crate::labels::{
    LabelValue, DEPLOYMENT_UUID_LABEL, HOST_AFFINITY_LABEL, HOST_ANTI_AFFINITY_LABEL,
    HOST_SOFT_AFFINITY_LABEL, SERVICE_LAUNCH_CONFIG, SERVICE_PRIMARY_LAUNCH_CONFIG,
};
use crate::models::{Network, RestartPolicy};
use crate::translate::volumes::volume_name;
use k8s_openapi::api::core::v1::HostAlias;

fn primary_labels() -> BTreeMap<String, LabelValue> {
    BTreeMap::from([(
        SERVICE_LAUNCH_CONFIG.to_string(),
        LabelValue::from(SERVICE_PRIMARY_LAUNCH_CONFIG),
    )])
}

fn request(containers: Vec<Container>) -> DeploymentSyncRequest {
    DeploymentSyncRequest {
        deployment_unit_uuid: "du-1".to_string(),
        containers,
        ..Default::default()
    }
}

fn named(name: &str) -> Container {
    Container {
        name: name.to_string(),
        ..Default::default()
    }
}

mod pod_spec_tests {
    use super::*;

    #[test]
    fn test_single_empty_container() {
        let pod = translate_request(request(vec![Container::default()])).unwrap();

        let expected = PodSpec {
            restart_policy: Some("Never".to_string()),
            dns_policy: Some("Default".to_string()),
            containers: vec![containers::container(&Container::default(), &volumes::VolumeNames::default())],
            ..Default::default()
        };
        assert_eq!(pod.spec, expected);
        assert!(pod.spec.host_ipc.is_none());
        assert!(pod.spec.host_network.is_none());
        assert!(pod.spec.host_pid.is_none());
        assert!(pod.spec.volumes.is_none());
        assert_eq!(pod.annotations.len(), 1);
    }

    #[test]
    fn test_host_modes_and_node_name() {
        let container = Container {
            labels: primary_labels(),
            restart_policy: Some(RestartPolicy {
                name: "always".to_string(),
                maximum_retry_count: 0,
            }),
            primary_network_id: "1".to_string(),
            ipc_mode: "host".to_string(),
            pid_mode: "host".to_string(),
            ..Default::default()
        };

        let mut req = request(vec![container]);
        req.networks = vec![Network {
            id: "1".to_string(),
            kind: "dockerHost".to_string(),
        }];
        req.node_name = "node1".to_string();

        let spec = translate_request(req).unwrap().spec;
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(spec.dns_policy.as_deref(), Some("Default"));
        assert_eq!(spec.host_ipc, Some(true));
        assert_eq!(spec.host_network, Some(true));
        assert_eq!(spec.host_pid, Some(true));
        assert_eq!(spec.node_name.as_deref(), Some("node1"));
    }

    #[test]
    fn test_host_flags_are_or_over_containers() {
        let first = Container {
            ipc_mode: "host".to_string(),
            pid_mode: "container:other".to_string(),
            ..named("a")
        };
        let second = Container {
            ipc_mode: "shareable".to_string(),
            pid_mode: "host".to_string(),
            primary_network_id: "net-host".to_string(),
            ..named("b")
        };
        let third = Container {
            primary_network_id: "net-overlay".to_string(),
            ..named("c")
        };

        let mut req = request(vec![first, second, third]);
        req.networks = vec![
            Network {
                id: "net-host".to_string(),
                kind: "dockerHost".to_string(),
            },
            Network {
                id: "net-overlay".to_string(),
                kind: "network".to_string(),
            },
        ];

        let spec = translate_request(req).unwrap().spec;
        assert_eq!(spec.host_ipc, Some(true));
        assert_eq!(spec.host_pid, Some(true));
        assert_eq!(spec.host_network, Some(true));
    }

    #[test]
    fn test_unresolved_network_is_not_host() {
        let container = Container {
            primary_network_id: "missing".to_string(),
            ..Default::default()
        };

        let spec = translate_request(request(vec![container])).unwrap().spec;
        assert!(spec.host_network.is_none());
    }

    #[test]
    fn test_container_order_is_preserved() {
        let spec = translate_request(request(vec![named("z"), named("a"), named("m")]))
            .unwrap()
            .spec;

        let names: Vec<_> = spec.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_empty_request_is_rejected() {
        assert!(translate_request(request(vec![])).is_err());
    }
}

mod merge_tests {
    use super::*;

    #[test]
    fn test_host_aliases_are_collected() {
        let container = Container {
            extra_hosts: vec!["hostname:0.0.0.0".to_string()],
            ..Default::default()
        };

        let spec = translate_request(request(vec![container])).unwrap().spec;
        assert_eq!(
            spec.host_aliases,
            Some(vec![HostAlias {
                ip: Some("0.0.0.0".to_string()),
                hostnames: Some(vec!["hostname".to_string()]),
            }])
        );
    }

    #[test]
    fn test_shared_volume_appears_once() {
        let first = Container {
            data_volumes: vec!["/data:/a".to_string(), "/anonymous".to_string()],
            ..named("a")
        };
        let second = Container {
            data_volumes: vec!["/data:/b".to_string()],
            ..named("b")
        };

        let spec = translate_request(request(vec![first, second])).unwrap().spec;

        let volumes = spec.volumes.unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, volume_name("/data"));

        let mounts: Vec<_> = spec
            .containers
            .iter()
            .map(|c| c.volume_mounts.clone().unwrap())
            .collect();
        assert_eq!(mounts[0].len(), 1);
        assert_eq!(mounts[0][0].mount_path, "/a");
        assert_eq!(mounts[1][0].mount_path, "/b");
    }

    #[test]
    fn test_tmpfs_does_not_shadow_host_path_of_another_container() {
        let a = Container {
            tmpfs: BTreeMap::from([("/cache".to_string(), LabelValue::Bool(true))]),
            ..named("a")
        };
        let b = Container {
            data_volumes: vec!["/cache:/x".to_string()],
            ..named("b")
        };

        let spec = translate_request(request(vec![a, b])).unwrap().spec;
        let volumes = spec.volumes.unwrap();
        assert_eq!(volumes.len(), 2);

        let b_mount = &spec.containers[1].volume_mounts.as_ref().unwrap()[0];
        let b_volume = volumes.iter().find(|v| v.name == b_mount.name).unwrap();
        assert_eq!(
            b_volume.host_path.as_ref().map(|h| h.path.as_str()),
            Some("/cache")
        );
        assert!(b_volume.empty_dir.is_none());
    }

    #[test]
    fn test_required_affinity_end_to_end() {
        let container = Container {
            labels: BTreeMap::from([
                (
                    HOST_AFFINITY_LABEL.to_string(),
                    LabelValue::from("key1=val1,key2=val2"),
                ),
                (
                    HOST_ANTI_AFFINITY_LABEL.to_string(),
                    LabelValue::from("key3=val3,key4=val4"),
                ),
            ]),
            ..Default::default()
        };

        let spec = translate_request(request(vec![container])).unwrap().spec;
        let terms = spec
            .affinity
            .and_then(|a| a.node_affinity)
            .and_then(|n| n.required_during_scheduling_ignored_during_execution)
            .unwrap()
            .node_selector_terms;

        assert_eq!(terms.len(), 1);
        let expressions = terms[0].match_expressions.as_ref().unwrap();
        assert_eq!(expressions.len(), 4);
        assert_eq!(expressions.iter().filter(|e| e.operator == "In").count(), 2);
        assert_eq!(expressions.iter().filter(|e| e.operator == "NotIn").count(), 2);
    }

    #[test]
    fn test_primary_affinity_takes_precedence() {
        let mut primary = Container {
            labels: primary_labels(),
            ..named("primary")
        };
        primary.labels.insert(
            HOST_AFFINITY_LABEL.to_string(),
            LabelValue::from("zone=a"),
        );

        let sidecar = Container {
            labels: BTreeMap::from([(
                HOST_SOFT_AFFINITY_LABEL.to_string(),
                LabelValue::from("zone=b"),
            )]),
            ..named("sidecar")
        };

        let spec = translate_request(request(vec![primary, sidecar])).unwrap().spec;
        let node_affinity = spec.affinity.unwrap().node_affinity.unwrap();

        assert!(node_affinity
            .required_during_scheduling_ignored_during_execution
            .is_some());
        assert!(node_affinity
            .preferred_during_scheduling_ignored_during_execution
            .is_none());
    }
}

mod pod_tests {
    use super::*;

    #[test]
    fn test_into_pod_carries_metadata() {
        let mut req = request(vec![named("web")]);
        req.revision = "7".to_string();

        let pod = translate_request(req).unwrap().into_pod(pod_name("DU-1"), "apps");

        assert_eq!(pod.metadata.name.as_deref(), Some("du-du-1"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("apps"));
        assert_eq!(
            pod.metadata.labels.unwrap()[DEPLOYMENT_UUID_LABEL],
            "du-1"
        );
        assert!(pod.metadata.annotations.unwrap().contains_key("web/io.rancher.container.uuid"));
        assert!(pod.spec.is_some());
    }

    #[test]
    fn test_translation_is_deterministic() {
        let req = request(vec![
            Container {
                tmpfs: BTreeMap::from([
                    ("/b".to_string(), LabelValue::Bool(true)),
                    ("/a".to_string(), LabelValue::Bool(true)),
                ]),
                ..named("a")
            },
            named("b"),
        ])
        .normalize()
        .unwrap();

        assert_eq!(translate(&req), translate(&req));
    }
}
