use anyhow::Result;
use clap::Parser;
use shopfront::api::server::ApiServer;
use shopfront::tracing::init_tracing;
use shopfront::util::db::Db;
use shopfront::util::env;

#[derive(Parser, Debug)]
#[command(name = "api_server", version, about = "Shopfront HTTP API server")]
struct Cli {
    /// Override for the database URL (defaults to DATABASE_URL)
    #[arg(long)]
    db_url: Option<String>,
    /// Maximum database connections in the pool
    #[arg(long, default_value_t = 10)]
    max_connections: u32,
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

    let db = Db::connect(&database_url, cli.max_connections).await?;
    ApiServer::from_env().run(db).await
}
