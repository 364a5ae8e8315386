use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mythic::MythicPity;
use crate::ownership::Roster;
use crate::pity::{PityGroupKey, PlayerPityState};
use crate::wallet::Wallet;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub player_id: String,
    pub server_id: String,
}

impl PlayerKey {
    pub fn new(player_id: impl Into<String>, server_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            server_id: server_id.into(),
        }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.player_id, self.server_id)
    }
}

/// Everything a pull reads about one player, as of `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub key: PlayerKey,
    /// Bumped by every committed change to the player. A commit prepared
    /// against an older version is rejected as a conflict.
    pub version: i64,
    pub wallet: Wallet,
    pub roster: Roster,
    /// Keyed by the string form of [`PityGroupKey`].
    pub pity: BTreeMap<String, PlayerPityState>,
    /// Created lazily by the first pull that touches it.
    pub mythic: Option<MythicPity>,
}

impl PlayerSnapshot {
    pub fn empty(key: PlayerKey) -> Self {
        Self {
            key,
            version: 0,
            wallet: Wallet::default(),
            roster: Roster::default(),
            pity: BTreeMap::new(),
            mythic: None,
        }
    }

    pub fn pity_for(&self, group: &PityGroupKey) -> PlayerPityState {
        self.pity.get(&group.to_string()).copied().unwrap_or_default()
    }

    pub fn scrolls_available(&self) -> u32 {
        self.mythic.as_ref().map_or(0, |m| m.scrolls_available())
    }
}
