use std::sync::Arc;

use anyhow::{Context, Result};

use summon_clients::{PgSummonStore, PostgresClient};
use summon_common::ModuleClient;
use summon_engine::SummonConfig;
use summon_sandbox::{setup_tracing, SeedFile};

/// Loads heroes and banners from a JSON seed file into PostgreSQL.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing("info")?;

    let path = std::env::args()
        .nth(1)
        .context("usage: seed <seed.json>")?;
    let seed = SeedFile::load(&path)?;

    let config = SummonConfig::from_env()?;
    let client = PostgresClient::setup_connection().await?;
    let store = Arc::new(PgSummonStore::from_client(&client, config.commit_timeout_ms));
    seed.apply(store).await?;

    println!(
        "Seeded {} heroes and {} banners from {}",
        seed.heroes.len(),
        seed.banners.len(),
        path
    );
    Ok(())
}
