mod memory;

use async_trait::async_trait;

use crate::banner::Banner;
use crate::commit::PullCommit;
use crate::error::SummonResult;
use crate::hero::Hero;
use crate::player::{PlayerKey, PlayerSnapshot};
use crate::stats::{BannerStats, PullRecord};
use crate::wallet::{Currency, Wallet};

pub use memory::MemorySummonStore;

/// Persistence seam of the engine.
///
/// `commit` is the only write on the pull path and must be atomic: either
/// every operation of the [`PullCommit`] lands or none does. It must reject a
/// commit whose `expected_version` no longer matches the player with
/// [`SummonError::PersistenceConflict`](crate::SummonError::PersistenceConflict),
/// and re-check the charge against current balances.
#[async_trait]
pub trait SummonStore: Send + Sync {
    async fn load_heroes(&self) -> SummonResult<Vec<Hero>>;
    async fn save_hero(&self, hero: Hero) -> SummonResult<()>;

    async fn load_banner(&self, banner_id: &str) -> SummonResult<Option<Banner>>;
    /// Stores a banner as is. Validation belongs to [`BannerCatalog`](crate::BannerCatalog).
    async fn save_banner(&self, banner: Banner) -> SummonResult<()>;
    async fn list_banners(&self) -> SummonResult<Vec<Banner>>;

    /// Current state of a player; an empty snapshot at version 0 when the
    /// player never pulled.
    async fn load_player(&self, key: &PlayerKey) -> SummonResult<PlayerSnapshot>;
    async fn commit(&self, commit: &PullCommit) -> SummonResult<()>;

    async fn credit_wallet(
        &self,
        key: &PlayerKey,
        currency: Currency,
        amount: i64,
    ) -> SummonResult<Wallet>;

    async fn banner_stats(&self, banner_id: &str) -> SummonResult<BannerStats>;
    /// Most recent draws first.
    async fn pull_history(&self, key: &PlayerKey, limit: usize) -> SummonResult<Vec<PullRecord>>;
}
