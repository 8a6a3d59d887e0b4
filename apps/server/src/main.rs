#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use keepalive::ticker::fire_once;
use keepalive::{Config, HttpFetcher, IntervalTicker, TaskRunner, TickHandler};
use tracing::{info, warn};

mod cli;
mod error;
mod routes;
mod state;

use cli::{Cli, Command};
use error::AppError;
use state::AppState;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    // Loaded first so RUST_LOG and friends can come from .env
    let dotenv = dotenvy::dotenv();
    logger::init();
    match dotenv {
        Err(e) if !e.not_found() => warn!("Ignoring unreadable .env file: {}", e),
        _ => {}
    }

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_deref())?.with_env();
    info!("Loaded configuration:\n{}", config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Tick => tick(config).await,
        Command::Reset => reset(config).await,
    }
}

async fn build_runner(config: &Config) -> Result<Arc<TaskRunner>, AppError> {
    let fetcher = HttpFetcher::new(config.request_timeout())?;
    let source = config.domain_source().await;

    Ok(Arc::new(TaskRunner::new(Arc::new(fetcher), config.probe_settings(), source)))
}

async fn serve(config: Config) -> Result<(), AppError> {
    let schedule = config.tick_schedule()?;
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let runner = build_runner(&config).await?;

    let handler: Arc<dyn TickHandler> = runner.clone();
    let ticker = IntervalTicker::new(schedule).spawn(handler);

    let state = web::Data::new(AppState::new(runner));
    info!("Listening on http://{}", addr);

    let served = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(routes::json_config())
            .configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await;

    ticker.abort();
    served?;

    Ok(())
}

async fn tick(config: Config) -> Result<(), AppError> {
    let runner = build_runner(&config).await?;
    fire_once(runner.as_ref()).await;

    Ok(())
}

async fn reset(config: Config) -> Result<(), AppError> {
    let store = config.open_store().await.ok_or(AppError::NoStore)??;

    warn!("Flushing every key from the configured store");
    store.flush().await?;
    info!("Store reset");

    Ok(())
}
