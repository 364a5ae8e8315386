use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SummonError, SummonResult};
use crate::events::SummonEvent;
use crate::hero::HeroId;
use crate::mythic::MythicPity;
use crate::pity::PlayerPityState;
use crate::rarity::Rarity;
use crate::wallet::Currency;
use crate::wallet::Charge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PullCount {
    #[default]
    Single,
    Multi,
}

impl PullCount {
    pub const MULTI_DRAWS: u32 = 10;

    pub fn draws(&self) -> u32 {
        match self {
            PullCount::Single => 1,
            PullCount::Multi => Self::MULTI_DRAWS,
        }
    }
}

impl TryFrom<u32> for PullCount {
    type Error = SummonError;

    fn try_from(count: u32) -> SummonResult<Self> {
        match count {
            1 => Ok(PullCount::Single),
            10 => Ok(PullCount::Multi),
            other => Err(SummonError::invalid(format!(
                "pull count must be 1 or 10, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub player_id: String,
    pub server_id: String,
    pub banner_id: String,
    pub count: u32,
    /// Pay with this currency. `None` takes the first cost option the
    /// player can afford.
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Granted by the free-pull service: skips the debit, nothing else.
    #[serde(default)]
    pub free: bool,
}

impl PullRequest {
    pub fn new(
        player_id: impl Into<String>,
        server_id: impl Into<String>,
        banner_id: impl Into<String>,
        count: u32,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            server_id: server_id.into(),
            banner_id: banner_id.into(),
            count,
            currency: None,
            free: false,
        }
    }

    pub fn paying_with(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn free(mut self) -> Self {
        self.free = true;
        self
    }
}

/// Outcome of one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResult {
    pub hero_id: HeroId,
    pub hero_name: String,
    pub rarity: Rarity,
    pub is_new: bool,
    pub fragments_gained: i64,
    pub is_focus_hero: bool,
    pub is_pity_triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitySnapshot {
    pub group: String,
    pub pulls_since_legendary: u32,
    pub pulls_since_epic: u32,
}

impl PitySnapshot {
    pub fn new(group: String, state: &PlayerPityState) -> Self {
        Self {
            group,
            pulls_since_legendary: state.pulls_since_legendary,
            pulls_since_epic: state.pulls_since_epic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MythicSnapshot {
    pub fused_pull_counter: u32,
    pub scrolls_earned: u32,
    pub scrolls_used: u32,
    pub scrolls_available: u32,
    pub mythic_pulls_since_last: u32,
    pub total_mythic_pulls: u64,
    pub mythic_pity_threshold: u32,
}

impl From<&MythicPity> for MythicSnapshot {
    fn from(ledger: &MythicPity) -> Self {
        Self {
            fused_pull_counter: ledger.fused_pull_counter,
            scrolls_earned: ledger.scrolls_earned,
            scrolls_used: ledger.scrolls_used,
            scrolls_available: ledger.scrolls_available(),
            mythic_pulls_since_last: ledger.mythic_pulls_since_last,
            total_mythic_pulls: ledger.total_mythic_pulls,
            mythic_pity_threshold: ledger.mythic_pity_threshold,
        }
    }
}

/// Stages a pull request moves through. `Rejected` is only reachable from
/// `Validating`; failures later on roll the batch back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullStage {
    Validating,
    Rolling,
    Resolving,
    Persisting,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullBatchResult {
    pub batch_id: Uuid,
    pub player_id: String,
    pub server_id: String,
    pub banner_id: String,
    /// Seed of the batch RNG; replaying it against the pre-batch snapshot
    /// reproduces the draws.
    pub seed: u64,
    pub results: Vec<PullResult>,
    /// Counters of the banner's pity group. `None` for Mythic banners.
    pub pity: Option<PitySnapshot>,
    pub mythic: MythicSnapshot,
    pub scrolls_granted: u32,
    pub scrolls_spent: u32,
    pub charge: Option<Charge>,
    pub events: Vec<SummonEvent>,
    pub attempts: u32,
}
