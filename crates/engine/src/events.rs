use serde::{Deserialize, Serialize};

use crate::hero::HeroId;
use crate::rarity::Rarity;

/// Read-only notifications emitted for every committed batch, consumed by
/// achievement, notification and analytics systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SummonEvent {
    NewHero {
        player_id: String,
        server_id: String,
        hero_id: HeroId,
        rarity: Rarity,
    },
    /// A Legendary or Mythic draw.
    RareDrop {
        player_id: String,
        server_id: String,
        banner_id: String,
        hero_id: HeroId,
        rarity: Rarity,
        pity_triggered: bool,
    },
    ScrollsEarned {
        player_id: String,
        server_id: String,
        amount: u32,
        scrolls_available: u32,
    },
}
