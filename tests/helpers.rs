#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentStatus, StatefulSet, StatefulSetStatus},
    core::v1::{ContainerState, ContainerStateTerminated, ContainerStatus, Pod, PodStatus},
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use app_runtime_status::{AppSnapshot, EventLogger};

pub fn version_meta(name: &str, version: &str) -> ObjectMeta {
    let mut labels = BTreeMap::new();
    labels.insert("version".to_owned(), version.to_owned());
    ObjectMeta {
        name: Some(name.to_owned()),
        labels: Some(labels),
        ..ObjectMeta::default()
    }
}

pub fn deployment(ready_replicas: i32, version: &str) -> Deployment {
    Deployment {
        metadata: version_meta("app-deployment", version),
        status: Some(DeploymentStatus {
            ready_replicas: Some(ready_replicas),
            ..DeploymentStatus::default()
        }),
        ..Deployment::default()
    }
}

pub fn statefulset(ready_replicas: i32, version: &str) -> StatefulSet {
    StatefulSet {
        metadata: version_meta("app-statefulset", version),
        status: Some(StatefulSetStatus {
            ready_replicas: Some(ready_replicas),
            ..StatefulSetStatus::default()
        }),
        ..StatefulSet::default()
    }
}

fn terminated_state() -> ContainerState {
    ContainerState {
        terminated: Some(ContainerStateTerminated {
            exit_code: 1,
            reason: Some("Error".to_owned()),
            ..ContainerStateTerminated::default()
        }),
        ..ContainerState::default()
    }
}

fn pod_with(version: &str, state: Option<ContainerState>, last_state: Option<ContainerState>) -> Pod {
    Pod {
        metadata: version_meta("app-pod", version),
        status: Some(PodStatus {
            container_statuses: Some(vec![ContainerStatus {
                name: "app".to_owned(),
                state,
                last_state,
                ..ContainerStatus::default()
            }]),
            ..PodStatus::default()
        }),
        ..Pod::default()
    }
}

pub fn pod(version: &str) -> Pod {
    pod_with(version, Some(ContainerState::default()), None)
}

// Pod whose container is currently terminated
pub fn terminated_pod(version: &str) -> Pod {
    pod_with(version, Some(terminated_state()), None)
}

// Pod whose container was terminated in its previous run
pub fn restarted_pod(version: &str) -> Pod {
    pod_with(version, Some(ContainerState::default()), Some(terminated_state()))
}

pub fn pods(count: usize, version: &str) -> Vec<Pod> {
    (0..count).map(|_| pod(version)).collect()
}

pub fn snapshot(replicas: i32, pods: Vec<Pod>) -> AppSnapshot {
    AppSnapshot {
        tenant_id: "tenant".to_owned(),
        service_id: "svc".to_owned(),
        service_alias: "app".to_owned(),
        pods,
        replicas,
        deploy_version: "v2".to_owned(),
        ..AppSnapshot::default()
    }
}

pub fn stateless(ready_replicas: i32, replicas: i32, pods: Vec<Pod>) -> AppSnapshot {
    AppSnapshot {
        deployment: Some(deployment(ready_replicas, "v2")),
        ..snapshot(replicas, pods)
    }
}

pub fn stateful(ready_replicas: i32, replicas: i32, pods: Vec<Pod>) -> AppSnapshot {
    AppSnapshot {
        statefulset: Some(statefulset(ready_replicas, "v2")),
        ..snapshot(replicas, pods)
    }
}

// Read a snapshot fixture from `tests/fixtures`
pub fn example_snapshot(name: &str) -> AppSnapshot {
    let snapshot_str = std::fs::read_to_string(format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name))
        .expect("Failed to read snapshot file");
    serde_yaml::from_str(&snapshot_str).expect("Unable to parse snapshot file from yaml")
}

/// Keeps every event for later assertions
#[derive(Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<(String, BTreeMap<String, String>)>>,
}

impl RecordingLogger {
    pub fn records(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl EventLogger for RecordingLogger {
    fn info(&self, message: &str, fields: &BTreeMap<&str, &str>) {
        let fields = fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        self.records.lock().unwrap().push((message.to_owned(), fields));
    }
}
