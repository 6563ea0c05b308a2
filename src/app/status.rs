use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

use crate::app::snapshot::{deployment_ready_replicas, statefulset_ready_replicas, AppSnapshot};
use crate::metrics::status_evaluated;
use crate::utils::{has_terminated_container, version_label};

/// Runtime status of an app service.
///
/// Only `Running`, `Closed`, `Starting`, `Stopping`, `Abnormal`, `SomeAbnormal` and `Unknown`
/// are derived here. The rest are set by the build pipeline and initial provisioning,
/// and live in the same enum so callers can compare against them.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    Running,
    Closed,
    Starting,
    Stopping,
    Abnormal,
    SomeAbnormal,
    Unknown,
    Upgrade,
    Building,
    BuildFailure,
    Undeploy,
}

pub const STATUS_LABELS_COUNT: usize = 11;

impl StatusLabel {
    pub const ALL: [StatusLabel; STATUS_LABELS_COUNT] = [
        StatusLabel::Running,
        StatusLabel::Closed,
        StatusLabel::Starting,
        StatusLabel::Stopping,
        StatusLabel::Abnormal,
        StatusLabel::SomeAbnormal,
        StatusLabel::Unknown,
        StatusLabel::Upgrade,
        StatusLabel::Building,
        StatusLabel::BuildFailure,
        StatusLabel::Undeploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Running => "running",
            StatusLabel::Closed => "closed",
            StatusLabel::Starting => "starting",
            StatusLabel::Stopping => "stopping",
            StatusLabel::Abnormal => "abnormal",
            StatusLabel::SomeAbnormal => "some_abnormal",
            StatusLabel::Unknown => "unknown",
            StatusLabel::Upgrade => "upgrade",
            StatusLabel::Building => "building",
            StatusLabel::BuildFailure => "build_failure",
            StatusLabel::Undeploy => "undeploy",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusLabel::ALL
            .iter()
            .find(|label| label.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown status label '{}'", s))
    }
}

/// Status of a service that is deployed but not fully ready, `None` when `ready` is out of range
fn degraded_status(ready: i32, desired: i32, pods: &[Pod]) -> Option<StatusLabel> {
    if ready > 0 && ready < desired {
        if has_terminated_container(pods) {
            return Some(StatusLabel::SomeAbnormal);
        }
        return Some(StatusLabel::Starting);
    }
    if ready == 0 {
        if has_terminated_container(pods) {
            return Some(StatusLabel::Abnormal);
        }
        return Some(StatusLabel::Starting);
    }
    None
}

/// Classify the runtime status of a service. An absent snapshot is `Closed`.
///
/// The first matching rule wins:
/// 1. no workload and no pods: `Closed`
/// 2. no workload but pods left: `Stopping`
/// 3. fewer pods than desired: `Starting`
/// 4. ready replicas reach the desired count: `Running`
/// 5. some replicas ready: `SomeAbnormal` if a container terminated, else `Starting`
/// 6. no replicas ready: `Abnormal` if a container terminated, else `Starting`
pub fn classify_status(snapshot: Option<&AppSnapshot>) -> StatusLabel {
    let snapshot = match snapshot {
        Some(snapshot) => snapshot,
        None => return StatusLabel::Closed,
    };
    let statefulset = snapshot.statefulset.as_ref();
    let deployment = snapshot.deployment.as_ref();

    if statefulset.is_none() && deployment.is_none() {
        if snapshot.pods.is_empty() {
            return StatusLabel::Closed;
        }
        return StatusLabel::Stopping;
    }

    let desired = snapshot.desired_replicas();
    if snapshot.pod_count() < desired {
        return StatusLabel::Starting;
    }

    let sts_ready = statefulset.map(statefulset_ready_replicas);
    let deploy_ready = deployment.map(deployment_ready_replicas);
    if sts_ready.map_or(false, |ready| ready >= desired) || deploy_ready.map_or(false, |ready| ready >= desired) {
        return StatusLabel::Running;
    }

    deploy_ready
        .and_then(|ready| degraded_status(ready, desired, &snapshot.pods))
        .or_else(|| sts_ready.and_then(|ready| degraded_status(ready, desired, &snapshot.pods)))
        .unwrap_or(StatusLabel::Unknown)
}

impl AppSnapshot {
    pub fn status(&self) -> StatusLabel {
        classify_status(Some(self))
    }

    /// A workload controller exists, as opposed to never deployed or fully removed
    pub fn is_deployed(&self) -> bool {
        self.statefulset.is_some() || self.deployment.is_some()
    }

    /// Nothing left running: no workload controller and no pods
    pub fn is_closed(&self) -> bool {
        !self.is_deployed() && self.pods.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.workload()
            .map_or(false, |workload| workload.ready_replicas() >= self.desired_replicas())
    }

    /// Ready replicas of the workload controller, 0 when not deployed
    pub fn ready_replicas(&self) -> i32 {
        self.workload().map_or(0, |workload| workload.ready_replicas())
    }

    /// Version label of the workload controller, empty when not deployed
    pub fn running_version(&self) -> String {
        self.workload().map(|workload| workload.version()).unwrap_or_default()
    }

    /// Every pod carries the deploy version and the workload is ready
    pub fn is_upgrade_complete(&self) -> bool {
        self.pods.iter().all(|pod| version_label(pod) == self.deploy_version) && self.is_ready()
    }

    pub fn status_report(&self) -> StatusReport {
        let status = self.status();
        status_evaluated(status);
        StatusReport {
            tenant_id: self.tenant_id.clone(),
            service_id: self.service_id.clone(),
            service_alias: self.service_alias.clone(),
            status,
            deployed: self.is_deployed(),
            ready_replicas: self.ready_replicas(),
            desired_replicas: self.desired_replicas(),
            pod_count: self.pod_count(),
            running_version: self.running_version(),
            deploy_version: self.deploy_version.clone(),
            observed_at: Utc::now(),
        }
    }
}

/// Serializable summary of a classification
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub tenant_id: String,
    pub service_id: String,
    pub service_alias: String,
    pub status: StatusLabel,
    pub deployed: bool,
    pub ready_replicas: i32,
    pub desired_replicas: i32,
    pub pod_count: i32,
    pub running_version: String,
    pub deploy_version: String,
    pub observed_at: DateTime<Utc>,
}
