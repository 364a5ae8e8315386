use anyhow::{Context, Result};

use summon_sandbox::{setup_tracing, simulate, SeedFile};

/// Monte-Carlo pulls against an in-memory store.
///
/// usage: simulate <seed.json> <banner_id> [batches] [rng_seed]
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing("warn")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let path = args
        .first()
        .context("usage: simulate <seed.json> <banner_id> [batches] [rng_seed]")?;
    let banner_id = args.get(1).context("missing banner id")?;
    let batches: u32 = match args.get(2) {
        Some(raw) => raw.parse().with_context(|| format!("invalid batch count {}", raw))?,
        None => 10_000,
    };
    let rng_seed: u64 = match args.get(3) {
        Some(raw) => raw.parse().with_context(|| format!("invalid seed {}", raw))?,
        None => 0x5eed,
    };

    let seed = SeedFile::load(path)?;
    let report = simulate(&seed, banner_id, batches, rng_seed).await?;
    println!("{}", report);
    Ok(())
}
