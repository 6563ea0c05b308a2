use std::convert::TryFrom;

use k8s_openapi::api::core::v1::{ContainerState, Pod};
use kube::ResourceExt;

/// Label carrying the version an object was rolled out with
pub const VERSION_LABEL: &str = "version";

/// Version label of any Kubernetes object, empty when it is not set
pub fn version_label<K: ResourceExt>(resource: &K) -> String {
    resource.labels().get(VERSION_LABEL).cloned().unwrap_or_default()
}

fn is_terminated(state: Option<&ContainerState>) -> bool {
    state.map_or(false, |state| state.terminated.is_some())
}

/// True if any container of any pod is terminated, or was terminated in its last run
pub fn has_terminated_container(pods: &[Pod]) -> bool {
    pods.iter()
        .filter_map(|pod| pod.status.as_ref())
        .filter_map(|status| status.container_statuses.as_ref())
        .flatten()
        .any(|container| is_terminated(container.state.as_ref()) || is_terminated(container.last_state.as_ref()))
}

/// Saturating conversion of a collection length into a replica count
pub fn replica_count(length: usize) -> i32 {
    i32::try_from(length).unwrap_or(i32::MAX)
}

pub fn plural_str(length: usize, word: &str) -> String {
    if length == 1 {
        word.trim_end_matches('s').to_string()
    } else {
        word.to_string()
    }
}
