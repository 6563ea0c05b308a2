use std::time::Duration;

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;

use crate::app::{classify_status, AppSnapshot, StatusReport};
use crate::errors::WaitError;
use crate::logger::LogEventLogger;
use crate::store::{AppStore, SnapshotCell, SnapshotSource};
use crate::utils::plural_str;
use crate::wait::{WaitCoordinator, WaitTarget};

/// Shared state of the HTTP handlers
pub struct AppState {
    pub store: AppStore,
    pub coordinator: WaitCoordinator,
    pub max_wait_timeout: Duration,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(store: AppStore, coordinator: WaitCoordinator, max_wait_timeout: Duration) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        AppState {
            store,
            coordinator,
            max_wait_timeout,
            cancel_tx,
            cancel_rx,
        }
    }

    /// Cancel every wait in flight and every wait started afterwards
    pub fn cancel_waits(&self) {
        if !self.cancel_tx.send_replace(true) {
            warn!("Cancelling all waits");
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").to(health))
        .service(web::resource("/apps").route(web::get().to(apps)))
        .service(
            web::resource("/apps/{service_id}")
                .route(web::get().to(get_app))
                .route(web::delete().to(delete_app)),
        )
        .service(web::resource("/apps/{service_id}/snapshot").route(web::put().to(put_snapshot)))
        .service(web::resource("/apps/{service_id}/wait/{target}").route(web::post().to(wait)));
}

// Simple health check endpoint
pub async fn health(_req: HttpRequest) -> HttpResponse {
    HttpResponse::new(StatusCode::OK)
}

// List the status of every known app service
pub async fn apps(data: web::Data<AppState>) -> web::Json<Vec<StatusReport>> {
    let reports: Vec<StatusReport> = data
        .store
        .service_ids()
        .iter()
        .filter_map(|service_id| data.store.get(service_id))
        .map(|snapshot| snapshot.status_report())
        .collect();
    debug!("Reporting {} {}", reports.len(), plural_str(reports.len(), "apps"));
    web::Json(reports)
}

pub async fn get_app(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let service_id = path.into_inner();
    match data.store.get(&service_id) {
        Some(snapshot) => HttpResponse::Ok().json(snapshot.status_report()),
        None => HttpResponse::NotFound().json(json!({ "serviceId": service_id, "status": classify_status(None) })),
    }
}

// Ingest a fresh snapshot from the watcher
pub async fn put_snapshot(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AppSnapshot>,
) -> HttpResponse {
    let service_id = path.into_inner();
    let mut snapshot = body.into_inner();
    snapshot.service_id = service_id.clone();
    let report = snapshot.status_report();
    data.store.publish(&service_id, snapshot);
    HttpResponse::Ok().json(report)
}

pub async fn delete_app(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let service_id = path.into_inner();
    if data.store.remove(&service_id) {
        info!("Removed snapshot of service '{}'", service_id);
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().finish()
    }
}

#[derive(Deserialize, Debug)]
pub struct WaitQuery {
    pub timeout_secs: Option<u64>,
}

// Block until the service reaches the requested condition
pub async fn wait(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<WaitQuery>,
) -> HttpResponse {
    let (service_id, target) = path.into_inner();
    let target = match target.parse::<WaitTarget>() {
        Ok(target) => target,
        Err(err) => return HttpResponse::BadRequest().json(json!({ "error": err })),
    };

    let cell = match data.store.get(&service_id) {
        Some(_) => data.store.cell(&service_id),
        None if target == WaitTarget::Ready => {
            return HttpResponse::NotFound().json(json!({ "serviceId": service_id, "target": target }))
        }
        None => SnapshotCell::default(),
    };

    let timeout = query
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(data.max_wait_timeout)
        .min(data.max_wait_timeout);
    let logger = LogEventLogger::new(&service_id);
    let mut cancel = data.cancel_rx.clone();
    info!("Waiting up to {:?} for service '{}' to be {}", timeout, service_id, target);

    let result = data
        .coordinator
        .wait_for(target, &cell, timeout, &logger, &mut cancel)
        .await;
    let status = classify_status(cell.load().as_deref());
    match result {
        Ok(()) => HttpResponse::Ok().json(json!({ "serviceId": service_id, "target": target, "status": status })),
        Err(err) => {
            let code = match err {
                WaitError::TimedOut => StatusCode::GATEWAY_TIMEOUT,
                WaitError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            };
            HttpResponse::build(code).json(json!({
                "serviceId": service_id,
                "target": target,
                "status": status,
                "error": err.to_string(),
            }))
        }
    }
}
