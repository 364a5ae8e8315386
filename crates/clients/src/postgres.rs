use sqlx::PgPool;

use summon_common::define_module_client;
use summon_database::init_databases;

use crate::rows::{
    BannerRow, BannerStatsRow, HeroRow, MythicPityRow, PlayerAccountRow, PlayerFragmentRow,
    PlayerHeroRow, PlayerPityRow, PullHistoryRow,
};

init_databases!(
    default: [
        HeroRow,
        BannerRow,
        PlayerAccountRow,
        PlayerPityRow,
        MythicPityRow,
        PlayerHeroRow,
        PlayerFragmentRow,
        BannerStatsRow,
        PullHistoryRow,
    ]
);

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: &'static PgPool,
    env: ["DATABASE_URL"],
    setup: async {
        connect(false, false).await
    }
}

/// Connects to `DATABASE_URL` and creates every summon table, dropping the
/// existing ones first when `drop_tables` is set.
pub async fn init_schema(drop_tables: bool) -> &'static PgPool {
    connect(drop_tables, true).await
}
