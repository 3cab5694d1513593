use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pageit_members::config::AppConfig;
use pageit_members::http::{router, AppState};
use pageit_members::logging::init_logging;
use pageit_members::{db, MemberRepository};
use tokio::net::TcpListener;

/// Serves paged member listings from a SQLite database.
#[derive(Debug, Parser)]
#[command(name = "pageit-members", version, about)]
struct Cli {
    /// Extra configuration file layered over config/default and config/local.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Insert member1..member100 when the members table is empty.
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config.logging);

    let database = db::connect(&config.database.path)
        .await
        .with_context(|| format!("opening database {}", config.database.path))?;
    let members = MemberRepository::new(database);
    if cli.seed {
        db::seed_members(&members).await.context("seeding members")?;
    }

    let app = router(AppState::new(members, config.paging.clone()));
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
