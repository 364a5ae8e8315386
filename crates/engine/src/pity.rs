use std::fmt;

use serde::{Deserialize, Serialize};

use crate::banner::PityConfig;
use crate::rarity::Rarity;

/// Key under which a player's pity counters are stored: either a single
/// banner or a declared group of banners sharing one counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PityGroupKey {
    Banner(String),
    Shared(String),
}

impl fmt::Display for PityGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PityGroupKey::Banner(id) => write!(f, "banner:{}", id),
            PityGroupKey::Shared(group) => write!(f, "group:{}", group),
        }
    }
}

/// Pulls since the last Legendary and Epic (or better) within one pity group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPityState {
    pub pulls_since_legendary: u32,
    pub pulls_since_epic: u32,
}

impl PlayerPityState {
    /// True when the next pull is the `legendary_threshold`-th without a Legendary.
    pub fn legendary_due(&self, config: &PityConfig) -> bool {
        self.pulls_since_legendary + 1 >= config.legendary_threshold
    }

    pub fn epic_due(&self, config: &PityConfig) -> bool {
        config
            .epic_threshold
            .map_or(false, |threshold| self.pulls_since_epic + 1 >= threshold)
    }

    /// Applies the outcome of one pull.
    pub fn record(&mut self, rarity: Rarity) {
        if rarity >= Rarity::Legendary {
            self.pulls_since_legendary = 0;
        } else {
            self.pulls_since_legendary += 1;
        }

        if rarity >= Rarity::Epic {
            self.pulls_since_epic = 0;
        } else {
            self.pulls_since_epic += 1;
        }
    }
}
