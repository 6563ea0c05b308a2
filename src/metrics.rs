use prometheus::{IntCounterVec, Opts, Registry};

use lazy_static::lazy_static;

use crate::app::StatusLabel;

pub const METRICS_NAMESPACE: &str = "app_runtime";

lazy_static! {
    pub static ref STATUS_EVALUATIONS: IntCounterVec = IntCounterVec::new(
      Opts::new("status_evaluations", "app-runtime-status classified statuses")
      .namespace(METRICS_NAMESPACE),
      &["status"]
    ).unwrap();
    pub static ref WAIT_OUTCOMES: IntCounterVec = IntCounterVec::new(
      Opts::new("wait_outcomes", "app-runtime-status wait results")
      .namespace(METRICS_NAMESPACE),
      &["operation", "outcome"]
    ).unwrap();
}

pub fn custom_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
  registry.register(Box::new(STATUS_EVALUATIONS.clone()))?;
  registry.register(Box::new(WAIT_OUTCOMES.clone()))?;
  Ok(())
}

pub fn status_evaluated(status: StatusLabel) {
  STATUS_EVALUATIONS.with_label_values(&[status.as_str()]).inc();
}

pub fn wait_finished(operation: &str, outcome: &str) {
  WAIT_OUTCOMES.with_label_values(&[operation, outcome]).inc();
}
