use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::banner::Banner;
use crate::commit::{CommitOp, PullCommit};
use crate::error::{SummonError, SummonResult};
use crate::hero::{Hero, HeroId};
use crate::player::{PlayerKey, PlayerSnapshot};
use crate::stats::{BannerStats, PullRecord};
use crate::store::SummonStore;
use crate::wallet::{Currency, Wallet};

#[derive(Default)]
struct MemoryState {
    heroes: BTreeMap<HeroId, Hero>,
    banners: BTreeMap<String, Banner>,
    players: HashMap<PlayerKey, PlayerSnapshot>,
    stats: HashMap<String, BannerStats>,
    history: Vec<PullRecord>,
}

#[derive(Default)]
struct Faults {
    fail_after_ops: Option<usize>,
    forced_conflicts: u32,
    commits: u64,
}

/// Process-local store. Commits are staged on copies and swapped in only
/// once every operation applied, so a failed commit leaves no trace.
///
/// Carries fault injection hooks for exercising rollback and retry paths.
#[derive(Default)]
pub struct MemorySummonStore {
    state: RwLock<MemoryState>,
    faults: Mutex<Faults>,
}

impl MemorySummonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next commit fails after applying `ops` of its operations.
    pub fn fail_next_commit_after(&self, ops: usize) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).fail_after_ops = Some(ops);
    }

    /// The next `n` commits are refused as if another writer got there first.
    pub fn force_conflicts(&self, n: u32) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).forced_conflicts = n;
    }

    /// Successfully applied commits so far.
    pub fn commit_count(&self) -> u64 {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).commits
    }

    fn take_faults(&self) -> (Option<usize>, bool) {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        let conflict = faults.forced_conflicts > 0;
        if conflict {
            faults.forced_conflicts -= 1;
            return (None, true);
        }
        (faults.fail_after_ops.take(), false)
    }

    fn record_commit(&self) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).commits += 1;
    }
}

fn apply_charge(player: &mut PlayerSnapshot, currency: Currency, amount: i64) -> SummonResult<()> {
    match currency {
        // spending is already part of the committed ledger; only re-check it
        Currency::Scrolls => {
            let available = player.scrolls_available() as i64;
            if available < amount {
                return Err(SummonError::InsufficientResources {
                    currency,
                    required: amount,
                    available,
                });
            }
            Ok(())
        }
        _ => player.wallet.debit(currency, amount),
    }
}

#[async_trait]
impl SummonStore for MemorySummonStore {
    async fn load_heroes(&self) -> SummonResult<Vec<Hero>> {
        Ok(self.state.read().await.heroes.values().cloned().collect())
    }

    async fn save_hero(&self, hero: Hero) -> SummonResult<()> {
        self.state.write().await.heroes.insert(hero.id.clone(), hero);
        Ok(())
    }

    async fn load_banner(&self, banner_id: &str) -> SummonResult<Option<Banner>> {
        Ok(self.state.read().await.banners.get(banner_id).cloned())
    }

    async fn save_banner(&self, banner: Banner) -> SummonResult<()> {
        self.state.write().await.banners.insert(banner.id.clone(), banner);
        Ok(())
    }

    async fn list_banners(&self) -> SummonResult<Vec<Banner>> {
        Ok(self.state.read().await.banners.values().cloned().collect())
    }

    async fn load_player(&self, key: &PlayerKey) -> SummonResult<PlayerSnapshot> {
        let state = self.state.read().await;
        Ok(state
            .players
            .get(key)
            .cloned()
            .unwrap_or_else(|| PlayerSnapshot::empty(key.clone())))
    }

    async fn commit(&self, commit: &PullCommit) -> SummonResult<()> {
        let (fail_after, forced_conflict) = self.take_faults();
        let mut state = self.state.write().await;

        let mut player = state
            .players
            .get(&commit.player)
            .cloned()
            .unwrap_or_else(|| PlayerSnapshot::empty(commit.player.clone()));
        if forced_conflict || player.version != commit.expected_version {
            return Err(SummonError::PersistenceConflict {
                player: commit.player.to_string(),
            });
        }

        let mut stats = state
            .stats
            .get(&commit.stats.banner_id)
            .cloned()
            .unwrap_or_else(|| BannerStats::new(commit.stats.banner_id.clone()));
        let mut history = Vec::with_capacity(commit.history.len());

        for (applied, op) in commit.operations().into_iter().enumerate() {
            if fail_after == Some(applied) {
                return Err(SummonError::Storage(format!(
                    "injected failure after {} writes of batch {}",
                    applied, commit.batch_id
                )));
            }
            match op {
                CommitOp::Charge(charge) => {
                    apply_charge(&mut player, charge.currency, charge.amount)?
                }
                CommitOp::Pity(group, pity) => {
                    player.pity.insert(group.to_string(), pity);
                }
                CommitOp::Mythic(ledger) => player.mythic = Some(ledger.clone()),
                CommitOp::AddHero(hero) => player.roster.add_hero(hero.clone()),
                CommitOp::CreditFragments(hero_id, amount) => {
                    player.roster.credit_fragments(hero_id, amount)
                }
                CommitOp::Stats(delta) => stats.absorb(delta),
                CommitOp::History(record) => history.push(record.clone()),
            }
        }

        player.version += 1;
        state.players.insert(commit.player.clone(), player);
        state.stats.insert(stats.banner_id.clone(), stats);
        state.history.extend(history);
        drop(state);

        self.record_commit();
        Ok(())
    }

    async fn credit_wallet(
        &self,
        key: &PlayerKey,
        currency: Currency,
        amount: i64,
    ) -> SummonResult<Wallet> {
        let mut state = self.state.write().await;
        let player = state
            .players
            .entry(key.clone())
            .or_insert_with(|| PlayerSnapshot::empty(key.clone()));
        player.wallet.credit(currency, amount)?;
        player.version += 1;
        Ok(player.wallet.clone())
    }

    async fn banner_stats(&self, banner_id: &str) -> SummonResult<BannerStats> {
        let state = self.state.read().await;
        Ok(state
            .stats
            .get(banner_id)
            .cloned()
            .unwrap_or_else(|| BannerStats::new(banner_id)))
    }

    async fn pull_history(&self, key: &PlayerKey, limit: usize) -> SummonResult<Vec<PullRecord>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|r| r.player_id == key.player_id && r.server_id == key.server_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
