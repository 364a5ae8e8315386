use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hero::HeroId;
use crate::rarity::{Rarity, RarityTable};

/// Global per-banner counters. Only ever incremented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerStats {
    pub banner_id: String,
    pub total_pulls: u64,
    pub by_rarity: RarityTable<u64>,
}

impl BannerStats {
    pub fn new(banner_id: impl Into<String>) -> Self {
        Self {
            banner_id: banner_id.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, rarity: Rarity) {
        self.total_pulls += 1;
        *self.by_rarity.get_mut(rarity) += 1;
    }

    pub fn absorb(&mut self, delta: &BannerStats) {
        self.total_pulls += delta.total_pulls;
        for rarity in Rarity::ALL {
            *self.by_rarity.get_mut(rarity) += delta.by_rarity.get(rarity);
        }
    }

    pub fn legendary_count(&self) -> u64 {
        self.by_rarity.legendary
    }

    pub fn epic_count(&self) -> u64 {
        self.by_rarity.epic
    }
}

/// Audit row for one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRecord {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub player_id: String,
    pub server_id: String,
    pub banner_id: String,
    pub draw_index: u32,
    pub hero_id: HeroId,
    pub rarity: Rarity,
    pub is_new: bool,
    pub fragments_gained: i64,
    pub is_focus_hero: bool,
    pub is_pity_triggered: bool,
    pub created_at: i64,
}
