use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};

use summon_engine::{
    MemorySummonStore, PullRequest, RateTable, Rarity, RarityTable, StaticRotation, SummonConfig,
    SummonEngine,
};

use crate::SeedFile;

const PLAYER: &str = "sim-player";
const SERVER: &str = "sim";

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub banner_id: String,
    pub seed: u64,
    pub pulls: u64,
    pub by_rarity: RarityTable<u64>,
    pub pity_hits: u64,
    pub focus_hits: u64,
    pub scrolls_earned: u32,
    pub configured: RateTable,
}

impl SimulationReport {
    /// Observed share of `rarity`, in percent.
    pub fn observed_rate(&self, rarity: Rarity) -> f64 {
        if self.pulls == 0 {
            return 0.0;
        }
        self.by_rarity.get(rarity) as f64 * 100.0 / self.pulls as f64
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "banner {} | {} pulls | seed {}", self.banner_id, self.pulls, self.seed)?;
        writeln!(f, "{:<10} {:>10} {:>10} {:>10}", "rarity", "count", "observed", "configured")?;
        for rarity in Rarity::ALL {
            writeln!(
                f,
                "{:<10} {:>10} {:>9.3}% {:>9.3}%",
                rarity.as_str(),
                self.by_rarity.get(rarity),
                self.observed_rate(rarity),
                self.configured.rate(rarity),
            )?;
        }
        writeln!(f, "pity hits: {}", self.pity_hits)?;
        writeln!(f, "focus hits: {}", self.focus_hits)?;
        write!(f, "scrolls earned: {}", self.scrolls_earned)
    }
}

/// Runs `batches` free multi-pulls of one player on `banner_id` against a
/// fresh in-memory store.
pub async fn simulate(
    seed_file: &SeedFile,
    banner_id: &str,
    batches: u32,
    seed: u64,
) -> Result<SimulationReport> {
    let store = Arc::new(MemorySummonStore::new());
    seed_file.apply(store.clone()).await?;

    let rotation = Arc::new(StaticRotation::default());
    rotation.set(StaticRotation::ALL_SERVERS, banner_id);
    let engine = SummonEngine::new(store, SummonConfig::default())?
        .with_seed(seed)
        .with_rotation(rotation);

    let banner = engine.catalog().get_banner(banner_id).await?;
    let mut report = SimulationReport {
        banner_id: banner_id.to_string(),
        seed,
        pulls: 0,
        by_rarity: RarityTable::default(),
        pity_hits: 0,
        focus_hits: 0,
        scrolls_earned: 0,
        configured: banner.rates,
    };

    for i in 0..batches {
        let batch = engine
            .pull(PullRequest::new(PLAYER, SERVER, banner_id, 10).free())
            .await
            .with_context(|| format!("batch {} on {}", i, banner_id))?;
        for result in &batch.results {
            report.pulls += 1;
            *report.by_rarity.get_mut(result.rarity) += 1;
            report.pity_hits += result.is_pity_triggered as u64;
            report.focus_hits += result.is_focus_hero as u64;
        }
        report.scrolls_earned += batch.scrolls_granted;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use summon_engine::{Banner, BannerKind, Currency, Hero, HeroPool, PityConfig, PullCost};

    fn seed_file() -> SeedFile {
        SeedFile {
            heroes: vec![
                Hero::new("c1", "Footman", Rarity::Common),
                Hero::new("r1", "Archer", Rarity::Rare),
                Hero::new("e1", "Mage", Rarity::Epic),
                Hero::new("l1", "Paladin", Rarity::Legendary),
            ],
            banners: vec![Banner {
                id: "std".into(),
                name: "Standard".into(),
                kind: BannerKind::Standard,
                enabled: true,
                starts_at: 0,
                ends_at: None,
                servers: vec![],
                hero_pool: HeroPool::default(),
                pool_rarities: vec![],
                rates: RateTable {
                    common: 50.0,
                    rare: 30.0,
                    epic: 15.0,
                    legendary: 5.0,
                    mythic: 0.0,
                },
                focus_heroes: vec![],
                pity: PityConfig::default(),
                costs: vec![PullCost { currency: Currency::Gems, single: 160, multi: 1600 }],
            }],
        }
    }

    #[tokio::test]
    async fn report_accounts_for_every_pull() {
        let report = simulate(&seed_file(), "std", 40, 7).await.unwrap();
        assert_eq!(report.pulls, 400);
        let total: u64 = Rarity::ALL.iter().map(|r| report.by_rarity.get(*r)).sum();
        assert_eq!(total, 400);
        assert_eq!(report.scrolls_earned, 5);
        assert_eq!(report.by_rarity.mythic, 0);
        assert!(report.to_string().contains("Legendary"));
    }

    #[tokio::test]
    async fn unknown_banner_fails() {
        assert!(simulate(&seed_file(), "missing", 1, 7).await.is_err());
    }
}
