mod banner;
mod commit;
mod config;
mod engine;
mod error;
mod events;
mod hero;
mod mythic;
mod ownership;
mod pity;
mod player;
mod pull;
mod rarity;
mod roll;
mod rotation;
mod select;
mod stats;
mod store;
mod wallet;

pub use banner::{
    validate_banner, Banner, BannerCatalog, BannerKind, FocusEntry, FocusHero, HeroPool, PityConfig,
    PullCost, RarityPool, RateTable, ResolvedBanner, RATE_SUM_TOLERANCE,
};
pub use commit::{CommitOp, PullCommit};
pub use config::{SummonConfig, SummonEnv, DEFAULT_MYTHIC_PITY_THRESHOLD, FUSED_PULLS_PER_SCROLL};
pub use engine::SummonEngine;
pub use error::{ErrorKind, SummonError, SummonResult};
pub use events::SummonEvent;
pub use hero::{Hero, HeroCatalog, HeroId};
pub use mythic::MythicPity;
pub use ownership::{resolve_ownership, OwnedHero, Ownership, Roster};
pub use pity::{PityGroupKey, PlayerPityState};
pub use player::{PlayerKey, PlayerSnapshot};
pub use pull::{
    MythicSnapshot, PitySnapshot, PullBatchResult, PullCount, PullRequest, PullResult, PullStage,
};
pub use rarity::{Rarity, RarityTable};
pub use roll::{rarity_at, roll_mythic, roll_standard, RollOutcome};
pub use rotation::{NoRotation, RotationSchedule, StaticRotation};
pub use select::{select_hero, Selection};
pub use stats::{BannerStats, PullRecord};
pub use store::{MemorySummonStore, SummonStore};
pub use wallet::{Charge, Currency, Wallet};
