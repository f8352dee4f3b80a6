//! `jarvis-server` entry point.

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use jarvis_core::db::open_db;
use jarvis_core::init_logging_with;
use jarvis_server::{configure, AppState, ServerConfig};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(version, about = "Serve Jarvis notes over HTTP")]
struct Cli {
    /// JSON config file; defaults apply to every absent key.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("jarvis-server: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::load(cli.config.as_deref())?;
    init_logging_with(config.log_settings()?)?;

    let conn = open_db(&config.db_path)?;
    let state = web::Data::new(AppState::new(conn)?);

    info!(
        "event=server_start module=server status=ok host={} port={} db_path={}",
        config.host,
        config.port,
        config.db_path.display()
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::new(
                "event=http_request module=server status=%s request=\"%r\" duration_ms=%D",
            ))
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}
