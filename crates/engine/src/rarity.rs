use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hero rarity tiers, ordered from most common to rarest so that `>=`
/// comparisons read as "at least this rare".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythic,
    ];

    /// The four tiers covered by the 100% rate table of regular banners.
    pub const STANDARD: [Rarity; 4] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
            Rarity::Mythic => "Mythic",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown rarity: {}", s))
    }
}

/// One value per rarity. Used for anything the engine looks up by tier,
/// e.g. duplicate fragment amounts or base stars of a new hero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RarityTable<T> {
    pub common: T,
    pub rare: T,
    pub epic: T,
    pub legendary: T,
    pub mythic: T,
}

impl<T: Copy> RarityTable<T> {
    pub fn get(&self, rarity: Rarity) -> T {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
            Rarity::Mythic => self.mythic,
        }
    }
}

impl<T> RarityTable<T> {
    pub fn get_mut(&mut self, rarity: Rarity) -> &mut T {
        match rarity {
            Rarity::Common => &mut self.common,
            Rarity::Rare => &mut self.rare,
            Rarity::Epic => &mut self.epic,
            Rarity::Legendary => &mut self.legendary,
            Rarity::Mythic => &mut self.mythic,
        }
    }
}
