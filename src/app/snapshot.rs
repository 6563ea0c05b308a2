use k8s_openapi::api::{
    apps::v1::{Deployment, StatefulSet},
    core::v1::Pod,
};
use serde::{Deserialize, Serialize};

use crate::utils::{replica_count, version_label};

/// Point-in-time view of one app service's workload controller and the pods it owns.
///
/// Produced and refreshed by the watcher; everything in this crate only reads it.
/// At most one of `statefulset` and `deployment` is set.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSnapshot {
    pub tenant_id: String,
    pub service_id: String,
    pub service_alias: String,
    pub statefulset: Option<StatefulSet>,
    pub deployment: Option<Deployment>,
    pub pods: Vec<Pod>,
    /// Desired replicas
    pub replicas: i32,
    /// Version the pods are being converged to
    pub deploy_version: String,
}

/// Borrowed handle to whichever workload controller backs the service
#[derive(Clone, Copy, Debug)]
pub enum Workload<'a> {
    Stateful(&'a StatefulSet),
    Stateless(&'a Deployment),
}

impl<'a> Workload<'a> {
    pub fn ready_replicas(&self) -> i32 {
        match self {
            Workload::Stateful(sts) => statefulset_ready_replicas(sts),
            Workload::Stateless(deploy) => deployment_ready_replicas(deploy),
        }
    }

    pub fn version(&self) -> String {
        match self {
            Workload::Stateful(sts) => version_label(*sts),
            Workload::Stateless(deploy) => version_label(*deploy),
        }
    }
}

pub(crate) fn statefulset_ready_replicas(sts: &StatefulSet) -> i32 {
    sts.status.as_ref().and_then(|status| status.ready_replicas).unwrap_or(0)
}

pub(crate) fn deployment_ready_replicas(deploy: &Deployment) -> i32 {
    deploy.status.as_ref().and_then(|status| status.ready_replicas).unwrap_or(0)
}

impl AppSnapshot {
    /// The workload controller backing this service, stateful first
    pub fn workload(&self) -> Option<Workload<'_>> {
        match (&self.statefulset, &self.deployment) {
            (Some(sts), _) => Some(Workload::Stateful(sts)),
            (None, Some(deploy)) => Some(Workload::Stateless(deploy)),
            (None, None) => None,
        }
    }

    /// Desired replicas, never negative
    pub fn desired_replicas(&self) -> i32 {
        self.replicas.max(0)
    }

    pub fn pod_count(&self) -> i32 {
        replica_count(self.pods.len())
    }
}
