use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{SummonError, SummonResult};
use crate::hero::HeroId;
use crate::rarity::Rarity;
use crate::wallet::Currency;

/// Per player and server: the fused pull ledger that mints mythic scrolls and
/// the pity counter of the Mythic banner those scrolls are spent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MythicPity {
    /// Regular pulls not yet converted into a scroll. Always below the
    /// pulls-per-scroll constant.
    pub fused_pull_counter: u32,
    pub total_fused_pulls: u64,

    pub scrolls_earned: u32,
    pub scrolls_used: u32,

    pub mythic_pulls_since_last: u32,
    pub total_mythic_pulls: u64,
    pub mythic_pity_threshold: u32,

    /// Lifetime record, append-only.
    pub mythic_heroes_obtained: BTreeSet<HeroId>,
}

impl MythicPity {
    pub fn new(mythic_pity_threshold: u32) -> Self {
        Self {
            fused_pull_counter: 0,
            total_fused_pulls: 0,
            scrolls_earned: 0,
            scrolls_used: 0,
            mythic_pulls_since_last: 0,
            total_mythic_pulls: 0,
            mythic_pity_threshold,
            mythic_heroes_obtained: BTreeSet::new(),
        }
    }

    pub fn scrolls_available(&self) -> u32 {
        self.scrolls_earned.saturating_sub(self.scrolls_used)
    }

    /// Counts one pull made on a regular banner. Returns the number of
    /// scrolls minted by it.
    pub fn record_fused_pull(&mut self, pulls_per_scroll: u32) -> SummonResult<u32> {
        if pulls_per_scroll == 0 {
            return Err(SummonError::config("fused_pulls_per_scroll must be at least 1"));
        }
        self.fused_pull_counter += 1;
        self.total_fused_pulls += 1;

        let granted = self.fused_pull_counter / pulls_per_scroll;
        if granted > 0 {
            self.scrolls_earned += granted;
            self.fused_pull_counter %= pulls_per_scroll;
        }
        Ok(granted)
    }

    pub fn spend_scrolls(&mut self, amount: u32) -> SummonResult<()> {
        let available = self.scrolls_available();
        if available < amount {
            return Err(SummonError::InsufficientResources {
                currency: Currency::Scrolls,
                required: amount as i64,
                available: available as i64,
            });
        }
        self.scrolls_used += amount;
        Ok(())
    }

    /// True when the next Mythic banner pull is forced to Mythic.
    pub fn mythic_due(&self) -> bool {
        self.mythic_pulls_since_last + 1 >= self.mythic_pity_threshold
    }

    /// Counts one Mythic banner draw, pity-forced or not.
    pub fn record_mythic_pull(&mut self, rarity: Rarity, hero_id: &str) {
        self.total_mythic_pulls += 1;
        if rarity == Rarity::Mythic {
            self.mythic_pulls_since_last = 0;
            self.mythic_heroes_obtained.insert(hero_id.to_string());
        } else {
            self.mythic_pulls_since_last += 1;
        }
    }
}
