use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::app::AppSnapshot;

/// Anything a wait can re-read the current snapshot from.
///
/// `None` means the service is not known, i.e. never deployed or already removed.
pub trait SnapshotSource {
    fn load(&self) -> Option<Arc<AppSnapshot>>;
}

impl SnapshotSource for Arc<AppSnapshot> {
    fn load(&self) -> Option<Arc<AppSnapshot>> {
        Some(self.clone())
    }
}

impl SnapshotSource for Option<Arc<AppSnapshot>> {
    fn load(&self) -> Option<Arc<AppSnapshot>> {
        self.clone()
    }
}

/// Shared slot holding the latest snapshot of one service
#[derive(Clone, Debug, Default)]
pub struct SnapshotCell {
    inner: Arc<RwLock<Option<Arc<AppSnapshot>>>>,
}

impl SnapshotCell {
    pub fn new(snapshot: Option<AppSnapshot>) -> Self {
        SnapshotCell {
            inner: Arc::new(RwLock::new(snapshot.map(Arc::new))),
        }
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: AppSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(snapshot));
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SnapshotSource for SnapshotCell {
    fn load(&self) -> Option<Arc<AppSnapshot>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Latest snapshots of all watched services, keyed by service id
#[derive(Clone, Debug, Default)]
pub struct AppStore {
    cells: Arc<RwLock<HashMap<String, SnapshotCell>>>,
}

impl AppStore {
    pub fn new() -> Self {
        AppStore::default()
    }

    /// The cell of a service, created empty if the service was never published
    pub fn cell(&self, service_id: &str) -> SnapshotCell {
        if let Some(cell) = self.cells.read().unwrap_or_else(PoisonError::into_inner).get(service_id) {
            return cell.clone();
        }
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(service_id.to_owned())
            .or_default()
            .clone()
    }

    pub fn get(&self, service_id: &str) -> Option<Arc<AppSnapshot>> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_id)
            .and_then(|cell| cell.load())
    }

    pub fn publish(&self, service_id: &str, snapshot: AppSnapshot) {
        debug!("Publishing snapshot of service '{}'", service_id);
        self.cell(service_id).publish(snapshot);
    }

    /// Forget a service. Cells handed out earlier observe it as removed.
    pub fn remove(&self, service_id: &str) -> bool {
        match self.cells.write().unwrap_or_else(PoisonError::into_inner).remove(service_id) {
            Some(cell) => {
                let existed = cell.load().is_some();
                cell.clear();
                existed
            }
            None => false,
        }
    }

    /// Ids of services that currently have a snapshot, sorted
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, cell)| cell.load().is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.service_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
