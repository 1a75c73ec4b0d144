use std::sync::Mutex;

use actix_web::{middleware, web, App, HttpServer};

mod business;
mod config;
mod models;
mod routes;
mod storage;

use crate::business::BusinessLogicLayer;
use crate::config::Config;
use crate::storage::InMemoryStorage;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().expect("invalid configuration");

    // restore the previous run's storage if there is one
    let storage = match &config.snapshot_path {
        Some(path) => storage::load_snapshot(path)
            .expect("Failed to load snapshot.")
            .unwrap_or_default(),
        None => InMemoryStorage::new(),
    };
    let layer: web::Data<routes::SharedLayer> =
        web::Data::new(Mutex::new(BusinessLogicLayer::new(storage, config.layer.clone())));

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    // Start HTTP server
    let app_layer = layer.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(app_layer.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    if let Some(path) = &config.snapshot_path {
        match layer.lock() {
            Ok(layer) => {
                if let Err(err) = storage::save_snapshot(layer.storage(), path) {
                    log::error!("failed to write snapshot: {}", err);
                }
            }
            Err(_) => log::error!("storage lock poisoned, snapshot not written"),
        }
    }
    Ok(())
}
