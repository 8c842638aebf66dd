use anyhow::Result;
use clap::Parser;
use shopfront::tracing::init_tracing;
use shopfront::util::db::Db;
use shopfront::util::env;
use tracing::info;

/// Applies pending SQL migrations and exits. Useful for deploys that
/// run with AUTO_MIGRATE disabled on the serving processes.
#[derive(Parser, Debug)]
#[command(name = "db_migrate", version, about = "Apply pending schema migrations")]
struct Cli {
    /// Override for the database URL (defaults to DATABASE_URL)
    #[arg(long)]
    db_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,sqlx=warn")?;
    env::init_env();

    let cli = Cli::parse();
    let database_url = match cli.db_url {
        Some(url) => url,
        None => env::db_url()?,
    };

    let db = Db::connect_no_migrate(&database_url, 2).await?;
    Db::run_migrations(&db.pool).await?;
    info!("migrations complete");
    Ok(())
}
