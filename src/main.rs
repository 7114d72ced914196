use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing::info;

use live_session_service::config::Config;
use live_session_service::recordings::{RecordingStore, S3RecordingStore};
use live_session_service::routes;
use live_session_service::session::{IdentityRegistry, SessionCoordinator, SessionRegistry};
use live_session_service::state::AppState;
use live_session_service::websocket::ConnectionRegistry;
use live_session_service::{logging, metrics};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = Arc::new(Config::from_env().context("failed to load configuration")?);

    let connections = ConnectionRegistry::new();
    let coordinator = Arc::new(SessionCoordinator::new(
        SessionRegistry::new(),
        IdentityRegistry::new(),
        Arc::new(connections.clone()),
    ));

    let recordings: Option<Arc<dyn RecordingStore>> = match &config.recordings {
        Some(cfg) => {
            info!(bucket = %cfg.bucket, "recording store enabled");
            Some(Arc::new(S3RecordingStore::from_config(cfg).await))
        }
        None => {
            info!("recording store disabled (no RECORDINGS_S3_BUCKET)");
            None
        }
    };

    let state = AppState {
        coordinator,
        connections,
        config: config.clone(),
        recordings,
    };

    let bind_addr = format!("{}:{}", config.host, config.port);
    info!(%bind_addr, "starting live-session-service");

    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::PayloadConfig::new(
                routes::recordings::MAX_RECORDING_BYTES,
            ))
            .wrap(Logger::default())
            .wrap(cors)
            .service(routes::wsroute::ws_handler)
            .service(routes::recordings::upload_recording)
            .route("/health", web::get().to(routes::health))
            .route("/metrics", web::get().to(metrics::serve_metrics))
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind on {bind_addr}"))?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
