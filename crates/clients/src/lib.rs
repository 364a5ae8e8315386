#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
mod rows;
#[cfg(feature = "postgres")]
mod store;

#[cfg(feature = "postgres")]
pub use postgres::{init_schema, PostgresClient};
#[cfg(feature = "postgres")]
pub use rows::{
    BannerRow, BannerStatsRow, HeroRow, MythicPityRow, PlayerAccountRow, PlayerFragmentRow,
    PlayerHeroRow, PlayerPityRow, PullHistoryRow,
};
#[cfg(feature = "postgres")]
pub use store::PgSummonStore;
