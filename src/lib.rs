use std::sync::Arc;

use actix_web::web::{self, Data, JsonConfig, PathConfig};
use actix_web::{App, HttpServer, ResponseError};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub mod campaign;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod typedid;

use config::{PublishSettings, Settings};
use database::{Database, MongoDatabase};
use error::Error;
use gateway::AdsGateway;

/// Registers extractor error formatting and every route. Expects a
/// `Data<dyn Database>`, a `Data<dyn AdsGateway>` and a
/// `Data<PublishSettings>` in the app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        // format json errors with custom format
        Error::InvalidJson(err).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, req| {
        // an id that can't be parsed can't name an existing resource
        tracing::debug!(path = %req.path(), "unparseable path segment: {}", err);
        Error::PathNotFound.into()
    }))
    .service(
        web::scope("/api")
            .service(campaign::create_campaign)
            .service(campaign::get_campaigns)
            .service(campaign::get_campaign_by_id)
            .service(campaign::publish_campaign)
            .service(campaign::pause_campaign),
    )
    .default_service(web::to(|| async { Error::PathNotFound.error_response() }));
}

pub fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},reqwest=warn,hyper=warn,mongodb=warn",
            settings.log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NEW)
        .compact()
        .init();
}

pub async fn run(settings: Settings) -> Result<(), Error> {
    init_logging(&settings);

    info!("connecting to db: {}", settings.mongodb_database);
    let db: Arc<dyn Database> = Arc::new(
        MongoDatabase::connect(&settings.mongodb_uri, &settings.mongodb_database).await?,
    );
    let gateway: Arc<dyn AdsGateway> = gateway::connect(&settings.google_ads);
    let publish: Data<PublishSettings> = Data::new(settings.publish);

    info!("listening on {}", settings.bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(Data::from(Arc::clone(&db)))
            .app_data(Data::from(Arc::clone(&gateway)))
            .app_data(publish.clone())
            .wrap(TracingLogger::default())
            .configure(configure)
    })
    .bind(&settings.bind_address)?
    .run()
    .await?;

    Ok(())
}
