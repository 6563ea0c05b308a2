use actix_web::{middleware, web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use app_runtime_status::{errors, metrics, views, AppStore, Config, WaitCoordinator};
use log::{info, warn};
use prometheus::Registry;

#[actix_rt::main]
async fn main() -> Result<(), errors::Error> {
    env_logger::init();

    let config = Config::from_env()?;
    info!("Starting with config: {:?}", config);

    let bind_address = format!("{}:{}", &config.server_host, config.server_port);

    let registry = Registry::new();
    metrics::custom_metrics(&registry)?;
    let prometheus = PrometheusMetricsBuilder::new(metrics::METRICS_NAMESPACE)
        .registry(registry)
        .endpoint("/metrics")
        .build()
        .map_err(|err| errors::Error::Metrics(err.to_string()))?;

    let state = web::Data::new(views::AppState::new(
        AppStore::new(),
        WaitCoordinator::new(config.wait_poll_mode),
        config.max_wait_timeout,
    ));

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_state.clone())
            .wrap(prometheus.clone())
            .wrap(middleware::Logger::default()
                    .exclude("/health")
                    .exclude("/metrics"))
            .wrap(middleware::Compress::default())
            .configure(views::configure)
        })
        .disable_signals()
        .bind(&bind_address)?
        .run();
    let handle = server.handle();

    tokio::select! {
        result = server => {
            result?;
            info!("actix exited");
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Shutting down, cancelling pending waits");
            state.cancel_waits();
            handle.stop(true).await;
        }
    }
    Ok(())
}
