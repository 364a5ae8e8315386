use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use summon_common::get_current_timestamp;

use crate::banner::{Banner, BannerCatalog, ResolvedBanner};
use crate::commit::PullCommit;
use crate::config::SummonConfig;
use crate::error::{SummonError, SummonResult};
use crate::events::SummonEvent;
use crate::mythic::MythicPity;
use crate::ownership::{resolve_ownership, Ownership};
use crate::player::{PlayerKey, PlayerSnapshot};
use crate::pull::{
    MythicSnapshot, PitySnapshot, PullBatchResult, PullCount, PullRequest, PullResult, PullStage,
};
use crate::rarity::Rarity;
use crate::roll::{roll_mythic, roll_standard};
use crate::rotation::{NoRotation, RotationSchedule};
use crate::select::select_hero;
use crate::stats::{BannerStats, PullRecord};
use crate::store::SummonStore;
use crate::wallet::{Charge, Currency};

type PlayerLock = Arc<tokio::sync::Mutex<()>>;

/// Serializes batches of the same player inside this process.
#[derive(Default)]
struct PlayerLocks {
    locks: Mutex<HashMap<PlayerKey, PlayerLock>>,
}

impl PlayerLocks {
    fn get(&self, key: &PlayerKey) -> PlayerLock {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // drop locks nobody waits on any more
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key.clone()).or_default().clone()
    }
}

/// Validated request, ready to be rolled.
struct PreparedPull {
    key: PlayerKey,
    count: PullCount,
    banner: ResolvedBanner,
    snapshot: PlayerSnapshot,
    charge: Option<Charge>,
}

pub struct SummonEngine {
    store: Arc<dyn SummonStore>,
    catalog: BannerCatalog,
    config: SummonConfig,
    rotation: Arc<dyn RotationSchedule>,
    seeder: Mutex<StdRng>,
    locks: PlayerLocks,
    events: Option<mpsc::Sender<SummonEvent>>,
}

impl SummonEngine {
    /// Fails with a configuration error when `config` does not validate.
    pub fn new(store: Arc<dyn SummonStore>, config: SummonConfig) -> SummonResult<Self> {
        config.validate().map_err(|e| {
            error!("rejected summon config: {:#}", e);
            SummonError::config(e.to_string())
        })?;
        Ok(Self {
            catalog: BannerCatalog::new(store.clone()),
            store,
            config,
            rotation: Arc::new(NoRotation),
            seeder: Mutex::new(StdRng::from_os_rng()),
            locks: PlayerLocks::default(),
            events: None,
        })
    }

    /// Derives every batch seed from `seed`, making a run reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seeder = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_rotation(mut self, rotation: Arc<dyn RotationSchedule>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_event_sender(mut self, events: mpsc::Sender<SummonEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn catalog(&self) -> &BannerCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SummonConfig {
        &self.config
    }

    pub async fn snapshot(&self, key: &PlayerKey) -> SummonResult<PlayerSnapshot> {
        self.store.load_player(key).await
    }

    /// Banners a player on `server_id` can pull from right now.
    pub async fn active_banners(&self, server_id: &str) -> SummonResult<Vec<Banner>> {
        self.catalog
            .active_banners(server_id, get_current_timestamp(), self.rotation.as_ref())
            .await
    }

    /// Runs one batch of pulls and commits it atomically.
    ///
    /// A commit that loses a race on the player is retried from validation
    /// with a fresh snapshot and fresh rolls, at most `max_commit_attempts`
    /// times in total.
    pub async fn pull(&self, request: PullRequest) -> SummonResult<PullBatchResult> {
        let count = PullCount::try_from(request.count)?;
        let key = PlayerKey::new(request.player_id.clone(), request.server_id.clone());

        let lock = self.locks.get(&key);
        let _guard = lock.lock().await;

        let max_attempts = self.config.max_commit_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.try_pull(&request, &key, count, attempt).await {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "pull on {} for {} lost a commit race (attempt {}/{}), retrying",
                        request.banner_id, key, attempt, max_attempts
                    );
                    attempt += 1;
                }
                Err(SummonError::Configuration(msg)) => {
                    error!("banner {} is misconfigured: {}", request.banner_id, msg);
                    return Err(SummonError::Configuration(msg));
                }
                other => return other,
            }
        }
    }

    async fn try_pull(
        &self,
        request: &PullRequest,
        key: &PlayerKey,
        count: PullCount,
        attempt: u32,
    ) -> SummonResult<PullBatchResult> {
        let now = get_current_timestamp();

        debug!("{:?} {} on {} x{}", PullStage::Validating, key, request.banner_id, count.draws());
        let prepared = self.validate(request, key, count, now).await.map_err(|e| {
            debug!("{:?} {}: {}", PullStage::Rejected, key, e);
            e
        })?;

        let seed = self.next_seed();
        let (commit, mut result) = self.roll_batch(prepared, seed, now)?;

        debug!("{:?} batch {} for {}", PullStage::Persisting, commit.batch_id, key);
        self.store.commit(&commit).await?;

        result.attempts = attempt;
        info!(
            "batch {} committed: {} pulled {} x{} on {} (seed {}, legendary+ {})",
            result.batch_id,
            key,
            request.banner_id,
            count.draws(),
            result.charge.map_or("free".to_string(), |c| format!("{} {}", c.amount, c.currency)),
            seed,
            result.results.iter().filter(|r| r.rarity >= Rarity::Legendary).count(),
        );
        self.publish(&result.events);
        debug!("{:?} batch {}", PullStage::Completed, result.batch_id);
        Ok(result)
    }

    async fn validate(
        &self,
        request: &PullRequest,
        key: &PlayerKey,
        count: PullCount,
        now: i64,
    ) -> SummonResult<PreparedPull> {
        let banner = self.catalog.get_banner(&request.banner_id).await?;
        banner.check_available(&request.server_id, now)?;

        if !banner.in_rotation(self.rotation.as_ref(), &request.server_id, now) {
            return Err(SummonError::invalid(format!(
                "elemental banner {} is not in rotation on {}",
                banner.id, request.server_id
            )));
        }

        let banner = self.catalog.resolve(&banner).await?;
        let snapshot = self.store.load_player(key).await?;

        let options = banner.banner.cost_options(count, request.currency)?;
        let charge = if request.free {
            None
        } else {
            Some(pick_charge(&options, &snapshot)?)
        };

        Ok(PreparedPull { key: key.clone(), count, banner, snapshot, charge })
    }

    /// Rolls every draw of the batch and stages the resulting commit. Draws
    /// depend only on the snapshot and `seed`.
    fn roll_batch(
        &self,
        prepared: PreparedPull,
        seed: u64,
        now: i64,
    ) -> SummonResult<(PullCommit, PullBatchResult)> {
        let PreparedPull { key, count, banner, snapshot, charge } = prepared;
        let mut rng = StdRng::seed_from_u64(seed);
        let batch_id = Uuid::new_v4();
        debug!("{:?} batch {} for {} (seed {})", PullStage::Rolling, batch_id, key, seed);
        let is_mythic = banner.banner.is_mythic();

        let group = banner.banner.pity_group_key();
        let mut pity = snapshot.pity_for(&group);
        let mut ledger = snapshot
            .mythic
            .clone()
            .unwrap_or_else(|| MythicPity::new(self.config.mythic_pity_threshold));
        let mut roster = snapshot.roster.clone();

        let mut scrolls_spent = 0;
        if is_mythic {
            if let Some(charge) = charge.filter(|c| c.currency == Currency::Scrolls) {
                let amount = u32::try_from(charge.amount).map_err(|_| {
                    SummonError::config(format!("banner {}: bad scroll cost", banner.banner.id))
                })?;
                ledger.spend_scrolls(amount)?;
                scrolls_spent = amount;
            }
        }

        let mut results = Vec::with_capacity(count.draws() as usize);
        let mut new_heroes = Vec::new();
        let mut fragment_credits = Vec::new();
        let mut stats = BannerStats::new(banner.banner.id.clone());
        let mut history = Vec::with_capacity(count.draws() as usize);
        let mut events = Vec::new();
        let mut scrolls_granted = 0;

        for draw_index in 0..count.draws() {
            let outcome = if is_mythic {
                roll_mythic(&banner.banner.rates, &ledger, &mut rng)
            } else {
                roll_standard(&banner.banner.rates, &pity, &banner.banner.pity, &mut rng)
            };
            let selection = select_hero(&banner, outcome.rarity, outcome.pity_triggered, &mut rng)?;
            let hero = &selection.hero;

            debug!("{:?} draw {} for {}: {}", PullStage::Resolving, draw_index + 1, key, hero.id);
            let ownership = resolve_ownership(&mut roster, hero, &self.config, now);
            match &ownership {
                Ownership::NewHero(owned) => new_heroes.push(owned.clone()),
                Ownership::Duplicate { hero_id, fragments } => {
                    fragment_credits.push((hero_id.clone(), *fragments))
                }
            }

            if is_mythic {
                ledger.record_mythic_pull(outcome.rarity, &hero.id);
            } else {
                pity.record(outcome.rarity);
                scrolls_granted += ledger.record_fused_pull(self.config.fused_pulls_per_scroll)?;
            }
            stats.record(outcome.rarity);

            debug!(
                "draw {}/{} for {}: {} {}{}{}",
                draw_index + 1,
                count.draws(),
                key,
                outcome.rarity,
                hero.id,
                if outcome.pity_triggered { " (pity)" } else { "" },
                if selection.is_focus { " (focus)" } else { "" },
            );

            if ownership.is_new() {
                events.push(SummonEvent::NewHero {
                    player_id: key.player_id.clone(),
                    server_id: key.server_id.clone(),
                    hero_id: hero.id.clone(),
                    rarity: hero.rarity,
                });
            }
            if outcome.rarity >= Rarity::Legendary {
                events.push(SummonEvent::RareDrop {
                    player_id: key.player_id.clone(),
                    server_id: key.server_id.clone(),
                    banner_id: banner.banner.id.clone(),
                    hero_id: hero.id.clone(),
                    rarity: outcome.rarity,
                    pity_triggered: outcome.pity_triggered,
                });
            }

            history.push(PullRecord {
                id: Uuid::new_v4(),
                batch_id,
                player_id: key.player_id.clone(),
                server_id: key.server_id.clone(),
                banner_id: banner.banner.id.clone(),
                draw_index,
                hero_id: hero.id.clone(),
                rarity: outcome.rarity,
                is_new: ownership.is_new(),
                fragments_gained: ownership.fragments_gained(),
                is_focus_hero: selection.is_focus,
                is_pity_triggered: outcome.pity_triggered,
                created_at: now,
            });
            results.push(PullResult {
                hero_id: hero.id.clone(),
                hero_name: hero.name.clone(),
                rarity: outcome.rarity,
                is_new: ownership.is_new(),
                fragments_gained: ownership.fragments_gained(),
                is_focus_hero: selection.is_focus,
                is_pity_triggered: outcome.pity_triggered,
            });
        }

        if scrolls_granted > 0 {
            events.push(SummonEvent::ScrollsEarned {
                player_id: key.player_id.clone(),
                server_id: key.server_id.clone(),
                amount: scrolls_granted,
                scrolls_available: ledger.scrolls_available(),
            });
        }

        let pity_entry = (!is_mythic).then(|| (group.to_string(), pity));
        let result = PullBatchResult {
            batch_id,
            player_id: key.player_id.clone(),
            server_id: key.server_id.clone(),
            banner_id: banner.banner.id.clone(),
            seed,
            results,
            pity: pity_entry.as_ref().map(|(g, state)| PitySnapshot::new(g.clone(), state)),
            mythic: MythicSnapshot::from(&ledger),
            scrolls_granted,
            scrolls_spent,
            charge,
            events,
            attempts: 1,
        };
        let commit = PullCommit {
            batch_id,
            player: key,
            expected_version: snapshot.version,
            charge,
            pity: pity_entry,
            mythic: ledger,
            new_heroes,
            fragment_credits,
            stats,
            history,
        };
        Ok((commit, result))
    }

    fn next_seed(&self) -> u64 {
        self.seeder.lock().unwrap_or_else(|e| e.into_inner()).random()
    }

    fn publish(&self, events: &[SummonEvent]) {
        let Some(sender) = &self.events else {
            return;
        };
        for event in events {
            if let Err(e) = sender.try_send(event.clone()) {
                warn!("dropping summon event: {}", e);
            }
        }
    }
}

/// First option the player can afford, in the banner's order. Reports the
/// first option when none is affordable.
fn pick_charge(options: &[(Currency, i64)], snapshot: &PlayerSnapshot) -> SummonResult<Charge> {
    let available = |currency: Currency| match currency {
        Currency::Scrolls => snapshot.scrolls_available() as i64,
        other => snapshot.wallet.balance(other).unwrap_or(0),
    };

    let affordable = options.iter().copied().find(|(c, amount)| available(*c) >= *amount);
    if let Some((currency, amount)) = affordable {
        return Ok(Charge { currency, amount });
    }
    let (currency, required) = options[0];
    Err(SummonError::InsufficientResources {
        currency,
        required,
        available: available(currency),
    })
}
