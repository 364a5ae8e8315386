use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use summon_engine::{Banner, BannerCatalog, Hero, SummonStore};

/// Content to load into a store: the hero catalog first, then banners, each
/// validated against it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub heroes: Vec<Hero>,
    #[serde(default)]
    pub banners: Vec<Banner>,
}

impl SeedFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
    }

    pub async fn apply(&self, store: Arc<dyn SummonStore>) -> Result<()> {
        for hero in &self.heroes {
            store.save_hero(hero.clone()).await?;
        }
        info!("seeded {} heroes", self.heroes.len());

        let catalog = BannerCatalog::new(store);
        for banner in &self.banners {
            catalog
                .save_banner(banner.clone())
                .await
                .with_context(|| format!("seeding banner {}", banner.id))?;
        }
        info!("seeded {} banners", self.banners.len());
        Ok(())
    }
}
