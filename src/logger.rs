use std::collections::BTreeMap;

use log::info;

/// Structured event sink handed to long running operations.
///
/// Recognized fields: `step` (processing stage) and `status` (coarse phase).
pub trait EventLogger: Send + Sync {
    fn info(&self, message: &str, fields: &BTreeMap<&str, &str>);
}

/// Forwards events to the `log` facade, tagged with the service they belong to
#[derive(Clone, Debug, Default)]
pub struct LogEventLogger {
    service_id: String,
}

impl LogEventLogger {
    pub fn new(service_id: &str) -> Self {
        LogEventLogger {
            service_id: service_id.to_owned(),
        }
    }
}

impl EventLogger for LogEventLogger {
    fn info(&self, message: &str, fields: &BTreeMap<&str, &str>) {
        let fields: Vec<String> = fields.iter().map(|(key, value)| format!("{}={}", key, value)).collect();
        info!("[{}] {} {}", self.service_id, message, fields.join(" "));
    }
}
