use std::collections::BTreeSet;

use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use summon_database::SqlxSchema;
use summon_engine::{
    Banner, BannerStats, Hero, MythicPity, OwnedHero, PlayerPityState, PullRecord, Rarity,
    RarityTable, SummonError, SummonResult,
};

fn out_of_range(column: &str, value: i64) -> SummonError {
    SummonError::Storage(format!("{} out of range: {}", column, value))
}

pub(crate) fn to_u32(value: i64, column: &str) -> SummonResult<u32> {
    u32::try_from(value).map_err(|_| out_of_range(column, value))
}

pub(crate) fn to_u64(value: i64, column: &str) -> SummonResult<u64> {
    u64::try_from(value).map_err(|_| out_of_range(column, value))
}

fn parse_rarity(raw: &str) -> SummonResult<Rarity> {
    raw.parse::<Rarity>().map_err(SummonError::Storage)
}

#[derive(Debug, Clone, FromRow)]
pub struct HeroRow {
    pub id: String,
    pub name: String,
    pub rarity: String,
    pub element: Option<String>,
}

impl SqlxSchema for HeroRow {
    const TABLE_NAME: &'static str = "heroes";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS heroes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            rarity TEXT NOT NULL,
            element TEXT
        );"
        .to_string()
    }
}

impl HeroRow {
    pub fn into_hero(self) -> SummonResult<Hero> {
        Ok(Hero {
            id: self.id,
            name: self.name,
            rarity: parse_rarity(&self.rarity)?,
            element: self.element,
        })
    }
}

/// Banners are stored whole as JSONB; `kind` and `enabled` are copied out for
/// ad-hoc queries.
#[derive(Debug, Clone, FromRow)]
pub struct BannerRow {
    pub id: String,
    pub kind: String,
    pub enabled: bool,
    pub config: Json<Banner>,
    pub updated_at: i64,
}

impl SqlxSchema for BannerRow {
    const TABLE_NAME: &'static str = "banners";
    const INDEXES_SQL: &'static [&'static str] =
        &["CREATE INDEX IF NOT EXISTS banners_kind_idx ON banners (kind);"];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS banners (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            enabled BOOLEAN NOT NULL,
            config JSONB NOT NULL,
            updated_at BIGINT NOT NULL
        );"
        .to_string()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlayerAccountRow {
    pub player_id: String,
    pub server_id: String,
    pub gems: i64,
    pub tickets: i64,
    pub version: i64,
    pub updated_at: i64,
}

impl SqlxSchema for PlayerAccountRow {
    const TABLE_NAME: &'static str = "player_accounts";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS player_accounts (
            player_id TEXT NOT NULL,
            server_id TEXT NOT NULL,
            gems BIGINT NOT NULL DEFAULT 0 CHECK (gems >= 0),
            tickets BIGINT NOT NULL DEFAULT 0 CHECK (tickets >= 0),
            version BIGINT NOT NULL DEFAULT 0,
            updated_at BIGINT NOT NULL,
            PRIMARY KEY (player_id, server_id)
        );"
        .to_string()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlayerPityRow {
    pub player_id: String,
    pub server_id: String,
    pub pity_group: String,
    pub pulls_since_legendary: i64,
    pub pulls_since_epic: i64,
}

impl SqlxSchema for PlayerPityRow {
    const TABLE_NAME: &'static str = "player_pity";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS player_pity (
            player_id TEXT NOT NULL,
            server_id TEXT NOT NULL,
            pity_group TEXT NOT NULL,
            pulls_since_legendary BIGINT NOT NULL CHECK (pulls_since_legendary >= 0),
            pulls_since_epic BIGINT NOT NULL CHECK (pulls_since_epic >= 0),
            PRIMARY KEY (player_id, server_id, pity_group)
        );"
        .to_string()
    }
}

impl PlayerPityRow {
    pub fn into_state(self) -> SummonResult<(String, PlayerPityState)> {
        Ok((
            self.pity_group,
            PlayerPityState {
                pulls_since_legendary: to_u32(self.pulls_since_legendary, "pulls_since_legendary")?,
                pulls_since_epic: to_u32(self.pulls_since_epic, "pulls_since_epic")?,
            },
        ))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MythicPityRow {
    pub player_id: String,
    pub server_id: String,
    pub fused_pull_counter: i64,
    pub total_fused_pulls: i64,
    pub scrolls_earned: i64,
    pub scrolls_used: i64,
    pub mythic_pulls_since_last: i64,
    pub total_mythic_pulls: i64,
    pub mythic_pity_threshold: i64,
    pub mythic_heroes_obtained: Json<BTreeSet<String>>,
}

impl SqlxSchema for MythicPityRow {
    const TABLE_NAME: &'static str = "mythic_pity";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS mythic_pity (
            player_id TEXT NOT NULL,
            server_id TEXT NOT NULL,
            fused_pull_counter BIGINT NOT NULL CHECK (fused_pull_counter >= 0),
            total_fused_pulls BIGINT NOT NULL,
            scrolls_earned BIGINT NOT NULL,
            scrolls_used BIGINT NOT NULL
                CHECK (scrolls_used >= 0 AND scrolls_used <= scrolls_earned),
            mythic_pulls_since_last BIGINT NOT NULL,
            total_mythic_pulls BIGINT NOT NULL,
            mythic_pity_threshold BIGINT NOT NULL,
            mythic_heroes_obtained JSONB NOT NULL DEFAULT '[]',
            PRIMARY KEY (player_id, server_id)
        );"
        .to_string()
    }
}

impl MythicPityRow {
    pub fn into_ledger(self) -> SummonResult<MythicPity> {
        Ok(MythicPity {
            fused_pull_counter: to_u32(self.fused_pull_counter, "fused_pull_counter")?,
            total_fused_pulls: to_u64(self.total_fused_pulls, "total_fused_pulls")?,
            scrolls_earned: to_u32(self.scrolls_earned, "scrolls_earned")?,
            scrolls_used: to_u32(self.scrolls_used, "scrolls_used")?,
            mythic_pulls_since_last: to_u32(
                self.mythic_pulls_since_last,
                "mythic_pulls_since_last",
            )?,
            total_mythic_pulls: to_u64(self.total_mythic_pulls, "total_mythic_pulls")?,
            mythic_pity_threshold: to_u32(self.mythic_pity_threshold, "mythic_pity_threshold")?,
            mythic_heroes_obtained: self.mythic_heroes_obtained.0,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlayerHeroRow {
    pub player_id: String,
    pub server_id: String,
    pub hero_id: String,
    pub level: i64,
    pub stars: i64,
    pub obtained_at: i64,
}

impl SqlxSchema for PlayerHeroRow {
    const TABLE_NAME: &'static str = "player_heroes";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS player_heroes (
            player_id TEXT NOT NULL,
            server_id TEXT NOT NULL,
            hero_id TEXT NOT NULL,
            level BIGINT NOT NULL,
            stars BIGINT NOT NULL,
            obtained_at BIGINT NOT NULL,
            PRIMARY KEY (player_id, server_id, hero_id)
        );"
        .to_string()
    }
}

impl PlayerHeroRow {
    pub fn into_owned(self) -> SummonResult<OwnedHero> {
        Ok(OwnedHero {
            hero_id: self.hero_id,
            level: to_u32(self.level, "level")?,
            stars: to_u32(self.stars, "stars")?,
            obtained_at: self.obtained_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlayerFragmentRow {
    pub player_id: String,
    pub server_id: String,
    pub hero_id: String,
    pub amount: i64,
}

impl SqlxSchema for PlayerFragmentRow {
    const TABLE_NAME: &'static str = "player_fragments";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS player_fragments (
            player_id TEXT NOT NULL,
            server_id TEXT NOT NULL,
            hero_id TEXT NOT NULL,
            amount BIGINT NOT NULL CHECK (amount >= 0),
            PRIMARY KEY (player_id, server_id, hero_id)
        );"
        .to_string()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BannerStatsRow {
    pub banner_id: String,
    pub total_pulls: i64,
    pub common: i64,
    pub rare: i64,
    pub epic: i64,
    pub legendary: i64,
    pub mythic: i64,
}

impl SqlxSchema for BannerStatsRow {
    const TABLE_NAME: &'static str = "banner_stats";
    const INDEXES_SQL: &'static [&'static str] = &[];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS banner_stats (
            banner_id TEXT PRIMARY KEY,
            total_pulls BIGINT NOT NULL DEFAULT 0,
            common BIGINT NOT NULL DEFAULT 0,
            rare BIGINT NOT NULL DEFAULT 0,
            epic BIGINT NOT NULL DEFAULT 0,
            legendary BIGINT NOT NULL DEFAULT 0,
            mythic BIGINT NOT NULL DEFAULT 0
        );"
        .to_string()
    }
}

impl BannerStatsRow {
    pub fn into_stats(self) -> SummonResult<BannerStats> {
        Ok(BannerStats {
            banner_id: self.banner_id,
            total_pulls: to_u64(self.total_pulls, "total_pulls")?,
            by_rarity: RarityTable {
                common: to_u64(self.common, "common")?,
                rare: to_u64(self.rare, "rare")?,
                epic: to_u64(self.epic, "epic")?,
                legendary: to_u64(self.legendary, "legendary")?,
                mythic: to_u64(self.mythic, "mythic")?,
            },
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PullHistoryRow {
    pub seq: i64,
    pub id: Uuid,
    pub batch_id: Uuid,
    pub player_id: String,
    pub server_id: String,
    pub banner_id: String,
    pub draw_index: i64,
    pub hero_id: String,
    pub rarity: String,
    pub is_new: bool,
    pub fragments_gained: i64,
    pub is_focus_hero: bool,
    pub is_pity_triggered: bool,
    pub created_at: i64,
}

impl SqlxSchema for PullHistoryRow {
    const TABLE_NAME: &'static str = "pull_history";
    const INDEXES_SQL: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS pull_history_player_idx
            ON pull_history (player_id, server_id, seq DESC);",
        "CREATE INDEX IF NOT EXISTS pull_history_batch_idx ON pull_history (batch_id);",
    ];

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS pull_history (
            seq BIGSERIAL PRIMARY KEY,
            id UUID NOT NULL UNIQUE,
            batch_id UUID NOT NULL,
            player_id TEXT NOT NULL,
            server_id TEXT NOT NULL,
            banner_id TEXT NOT NULL,
            draw_index BIGINT NOT NULL,
            hero_id TEXT NOT NULL,
            rarity TEXT NOT NULL,
            is_new BOOLEAN NOT NULL,
            fragments_gained BIGINT NOT NULL,
            is_focus_hero BOOLEAN NOT NULL,
            is_pity_triggered BOOLEAN NOT NULL,
            created_at BIGINT NOT NULL
        );"
        .to_string()
    }
}

impl PullHistoryRow {
    pub fn into_record(self) -> SummonResult<PullRecord> {
        Ok(PullRecord {
            id: self.id,
            batch_id: self.batch_id,
            player_id: self.player_id,
            server_id: self.server_id,
            banner_id: self.banner_id,
            draw_index: to_u32(self.draw_index, "draw_index")?,
            hero_id: self.hero_id,
            rarity: parse_rarity(&self.rarity)?,
            is_new: self.is_new,
            fragments_gained: self.fragments_gained,
            is_focus_hero: self.is_focus_hero,
            is_pity_triggered: self.is_pity_triggered,
            created_at: self.created_at,
        })
    }
}
