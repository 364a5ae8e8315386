use uuid::Uuid;

use crate::hero::HeroId;
use crate::mythic::MythicPity;
use crate::ownership::OwnedHero;
use crate::pity::PlayerPityState;
use crate::player::PlayerKey;
use crate::stats::{BannerStats, PullRecord};
use crate::wallet::Charge;

/// Everything one batch changes, applied by a store as a single unit.
///
/// Prepared against the player snapshot at `expected_version`; a store must
/// refuse it once the player has moved on, and must apply all operations or
/// none.
#[derive(Debug, Clone, PartialEq)]
pub struct PullCommit {
    pub batch_id: Uuid,
    pub player: PlayerKey,
    pub expected_version: i64,
    pub charge: Option<Charge>,
    /// Final counters of the banner's pity group.
    pub pity: Option<(String, PlayerPityState)>,
    /// Final ledger state. Scroll spending of the batch is already included.
    pub mythic: MythicPity,
    pub new_heroes: Vec<OwnedHero>,
    pub fragment_credits: Vec<(HeroId, i64)>,
    pub stats: BannerStats,
    pub history: Vec<PullRecord>,
}

/// A single write of a [`PullCommit`], in the order stores apply them.
#[derive(Debug, Clone, Copy)]
pub enum CommitOp<'a> {
    Charge(Charge),
    Pity(&'a str, PlayerPityState),
    Mythic(&'a MythicPity),
    AddHero(&'a OwnedHero),
    CreditFragments(&'a str, i64),
    Stats(&'a BannerStats),
    History(&'a PullRecord),
}

impl PullCommit {
    pub fn operations(&self) -> Vec<CommitOp<'_>> {
        let mut ops = Vec::with_capacity(
            3 + self.new_heroes.len() + self.fragment_credits.len() + self.history.len(),
        );
        if let Some(charge) = self.charge {
            ops.push(CommitOp::Charge(charge));
        }
        if let Some((group, state)) = &self.pity {
            ops.push(CommitOp::Pity(group.as_str(), *state));
        }
        ops.push(CommitOp::Mythic(&self.mythic));
        ops.extend(self.new_heroes.iter().map(CommitOp::AddHero));
        ops.extend(
            self.fragment_credits
                .iter()
                .map(|(hero_id, amount)| CommitOp::CreditFragments(hero_id.as_str(), *amount)),
        );
        ops.push(CommitOp::Stats(&self.stats));
        ops.extend(self.history.iter().map(CommitOp::History));
        ops
    }
}
