use anyhow::Result;

use summon_clients::init_schema;
use summon_common::parse_env;
use summon_sandbox::setup_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing("info")?;

    let drop_tables = parse_env::<bool>("SUMMON_DROP_TABLES").unwrap_or(false);
    if drop_tables {
        tracing::warn!("dropping existing summon tables");
    }
    init_schema(drop_tables).await;

    println!("Database initialized successfully");
    Ok(())
}
