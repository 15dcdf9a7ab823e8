// marketplace/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use marketplace::config::AppConfig;
use marketplace::db::{MemoryStore, PgStore};
use marketplace::errors::Result as AppResult;
use marketplace::services::build_gateway;
use marketplace::state::AppState;
use marketplace::telemetry::init_tracing;
use marketplace::web::configure_app_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Configuration error: {}", e);
      std::process::exit(1);
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!("Starting marketplace server...");

  let app_state = match build_state(app_config).await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise application state.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let server_address = format!("{}:{}", app_state.config.server_host, app_state.config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}

async fn build_state(app_config: AppConfig) -> AppResult<AppState> {
  let gateway = build_gateway(&app_config.payment, &app_config.app_base_url)?;

  match app_config.database_url.clone() {
    Some(database_url) => {
      let store = PgStore::connect(&database_url, app_config.database_max_connections).await?;
      if app_config.run_migrations {
        store.run_migrations().await?;
      }
      Ok(AppState::new(app_config, store, gateway))
    }
    None => {
      tracing::warn!("DATABASE_URL not set, using the in-memory store. Data is lost on restart.");
      Ok(AppState::new(app_config, MemoryStore::new(), gateway))
    }
  }
}
