use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod schema;
mod api;
mod config;
mod dark_colors;
mod error;
mod mail;
mod models;
mod utils;

use crate::config::Config;
use crate::mail::{Mailer, SmtpMailer};

pub type DbConnection = PgConnection;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub struct AppState {
    pub db_pool: Pool<ConnectionManager<DbConnection>>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Config,
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let config = Config::from_env();
    let mut connection =
        PgConnection::establish(&config.database_url).expect("Failed to connect to the database.");
    connection
        .run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations.");
    drop(connection);
    let manager = ConnectionManager::<DbConnection>::new(config.database_url.clone());
    let db_pool = Pool::new(manager).expect("Failed to create pool.");
    let mailer: Arc<dyn Mailer> =
        Arc::new(SmtpMailer::from_config(&config).expect("Failed to set up the mail transport."));
    let bind_address = config.bind_address.clone();
    info!(address = %bind_address, "starting catalog backend");
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://localhost:3000")
            .allowed_methods(vec!["GET", "POST"])
            .allowed_header("Content-Type")
            .max_age(3600);
        App::new()
            .app_data(web::Data::new(AppState {
                db_pool: db_pool.clone(),
                mailer: mailer.clone(),
                config: config.clone(),
            }))
            .wrap(cors)
            .wrap(middleware::NormalizePath::trim())
            .service(api::courses::get_service())
            .service(api::organizations::get_service())
            .service(api::teachers::get_service())
            .service(api::favorites::get_service())
            .service(api::users::get_service())
    })
    .bind(&bind_address)?
    .run()
    .await
}
