use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::warn;

use summon_common::{get_current_timestamp, ModuleClient};
use summon_database::{is_transient, sqlstate, CHECK_VIOLATION, QUERY_CANCELED};
use summon_engine::{
    Banner, BannerStats, Charge, CommitOp, Currency, Hero, MythicPity, PlayerKey, PlayerPityState,
    PlayerSnapshot, PullCommit, PullRecord, Roster, SummonError, SummonResult, SummonStore, Wallet,
};

use crate::postgres::PostgresClient;
use crate::rows::{
    BannerRow, BannerStatsRow, HeroRow, MythicPityRow, PlayerAccountRow, PlayerFragmentRow,
    PlayerHeroRow, PlayerPityRow, PullHistoryRow,
};

/// [`SummonStore`] on PostgreSQL. Every commit runs in one transaction that
/// row-locks the player account, so concurrent writers on the same player
/// either wait or fail with a conflict.
#[derive(Clone)]
pub struct PgSummonStore {
    pool: PgPool,
    commit_timeout_ms: u64,
}

impl PgSummonStore {
    pub fn new(pool: PgPool, commit_timeout_ms: u64) -> Self {
        Self { pool, commit_timeout_ms }
    }

    pub fn from_client(client: &PostgresClient, commit_timeout_ms: u64) -> Self {
        let pool: &PgPool = client.get_client();
        Self::new(pool.clone(), commit_timeout_ms)
    }
}

fn storage(err: sqlx::Error) -> SummonError {
    match sqlstate(&err).as_deref() {
        Some(QUERY_CANCELED) => {
            SummonError::Storage("statement timed out, transaction rolled back".to_string())
        }
        Some(CHECK_VIOLATION) => {
            let constraint = err
                .as_database_error()
                .and_then(|e| e.constraint())
                .unwrap_or("unnamed");
            SummonError::Storage(format!(
                "ledger constraint {} rejected the commit, transaction rolled back",
                constraint
            ))
        }
        _ => SummonError::Storage(err.to_string()),
    }
}

/// Maps errors of a player transaction, turning lost serialization races into
/// retryable conflicts.
fn player_error(key: &PlayerKey) -> impl Fn(sqlx::Error) -> SummonError + '_ {
    move |err| {
        if is_transient(&err) {
            warn!("transaction on {} lost a race: {}", key, err);
            SummonError::PersistenceConflict { player: key.to_string() }
        } else {
            storage(err)
        }
    }
}

const LOCK_ACCOUNT_SQL: &str = "SELECT player_id, server_id, gems, tickets, version, updated_at
    FROM player_accounts WHERE player_id = $1 AND server_id = $2 FOR UPDATE";

const ENSURE_ACCOUNT_SQL: &str = "INSERT INTO player_accounts
    (player_id, server_id, gems, tickets, version, updated_at)
    VALUES ($1, $2, 0, 0, 0, $3) ON CONFLICT (player_id, server_id) DO NOTHING";

const PLAYER_ROWS: &str = "WHERE player_id = $1 AND server_id = $2";

async fn lock_account(
    conn: &mut PgConnection,
    key: &PlayerKey,
) -> Result<PlayerAccountRow, sqlx::Error> {
    sqlx::query(ENSURE_ACCOUNT_SQL)
        .bind(&key.player_id)
        .bind(&key.server_id)
        .bind(get_current_timestamp())
        .execute(&mut *conn)
        .await?;
    sqlx::query_as::<_, PlayerAccountRow>(LOCK_ACCOUNT_SQL)
        .bind(&key.player_id)
        .bind(&key.server_id)
        .fetch_one(&mut *conn)
        .await
}

async fn load_ledger(conn: &mut PgConnection, key: &PlayerKey) -> SummonResult<Option<MythicPity>> {
    sqlx::query_as::<_, MythicPityRow>(&format!("SELECT * FROM mythic_pity {PLAYER_ROWS}"))
        .bind(&key.player_id)
        .bind(&key.server_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage)?
        .map(MythicPityRow::into_ledger)
        .transpose()
}

/// Debits purchasable currency, or re-checks the scroll balance the ledger
/// write of the same commit spends from.
async fn apply_charge(
    conn: &mut PgConnection,
    key: &PlayerKey,
    account: &PlayerAccountRow,
    charge: Charge,
) -> SummonResult<()> {
    let (sql, available) = match charge.currency {
        Currency::Gems => (
            "UPDATE player_accounts SET gems = gems - $3
            WHERE player_id = $1 AND server_id = $2 AND gems >= $3",
            account.gems,
        ),
        Currency::Tickets => (
            "UPDATE player_accounts SET tickets = tickets - $3
            WHERE player_id = $1 AND server_id = $2 AND tickets >= $3",
            account.tickets,
        ),
        Currency::Scrolls => {
            let ledger = load_ledger(conn, key).await?;
            let available = ledger.map_or(0, |l| l.scrolls_available()) as i64;
            if available < charge.amount {
                return Err(SummonError::InsufficientResources {
                    currency: Currency::Scrolls,
                    required: charge.amount,
                    available,
                });
            }
            return Ok(());
        }
    };

    let result = sqlx::query(sql)
        .bind(&key.player_id)
        .bind(&key.server_id)
        .bind(charge.amount)
        .execute(&mut *conn)
        .await
        .map_err(player_error(key))?;
    if result.rows_affected() == 0 {
        return Err(SummonError::InsufficientResources {
            currency: charge.currency,
            required: charge.amount,
            available,
        });
    }
    Ok(())
}

async fn apply_op(
    conn: &mut PgConnection,
    key: &PlayerKey,
    account: &PlayerAccountRow,
    op: CommitOp<'_>,
) -> SummonResult<()> {
    let on_err = player_error(key);
    match op {
        CommitOp::Charge(charge) => return apply_charge(conn, key, account, charge).await,
        CommitOp::Pity(group, state) => {
            sqlx::query(
                "INSERT INTO player_pity
                    (player_id, server_id, pity_group, pulls_since_legendary, pulls_since_epic)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (player_id, server_id, pity_group) DO UPDATE SET
                    pulls_since_legendary = EXCLUDED.pulls_since_legendary,
                    pulls_since_epic = EXCLUDED.pulls_since_epic",
            )
            .bind(&key.player_id)
            .bind(&key.server_id)
            .bind(group)
            .bind(state.pulls_since_legendary as i64)
            .bind(state.pulls_since_epic as i64)
            .execute(&mut *conn)
            .await
            .map_err(on_err)?;
        }
        CommitOp::Mythic(ledger) => {
            sqlx::query(
                "INSERT INTO mythic_pity (player_id, server_id, fused_pull_counter,
                    total_fused_pulls, scrolls_earned, scrolls_used, mythic_pulls_since_last,
                    total_mythic_pulls, mythic_pity_threshold, mythic_heroes_obtained)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (player_id, server_id) DO UPDATE SET
                    fused_pull_counter = EXCLUDED.fused_pull_counter,
                    total_fused_pulls = EXCLUDED.total_fused_pulls,
                    scrolls_earned = EXCLUDED.scrolls_earned,
                    scrolls_used = EXCLUDED.scrolls_used,
                    mythic_pulls_since_last = EXCLUDED.mythic_pulls_since_last,
                    total_mythic_pulls = EXCLUDED.total_mythic_pulls,
                    mythic_pity_threshold = EXCLUDED.mythic_pity_threshold,
                    mythic_heroes_obtained = EXCLUDED.mythic_heroes_obtained",
            )
            .bind(&key.player_id)
            .bind(&key.server_id)
            .bind(ledger.fused_pull_counter as i64)
            .bind(ledger.total_fused_pulls as i64)
            .bind(ledger.scrolls_earned as i64)
            .bind(ledger.scrolls_used as i64)
            .bind(ledger.mythic_pulls_since_last as i64)
            .bind(ledger.total_mythic_pulls as i64)
            .bind(ledger.mythic_pity_threshold as i64)
            .bind(Json(&ledger.mythic_heroes_obtained))
            .execute(&mut *conn)
            .await
            .map_err(on_err)?;
        }
        CommitOp::AddHero(hero) => {
            sqlx::query(
                "INSERT INTO player_heroes
                    (player_id, server_id, hero_id, level, stars, obtained_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (player_id, server_id, hero_id) DO NOTHING",
            )
            .bind(&key.player_id)
            .bind(&key.server_id)
            .bind(&hero.hero_id)
            .bind(hero.level as i64)
            .bind(hero.stars as i64)
            .bind(hero.obtained_at)
            .execute(&mut *conn)
            .await
            .map_err(on_err)?;
        }
        CommitOp::CreditFragments(hero_id, amount) => {
            sqlx::query(
                "INSERT INTO player_fragments (player_id, server_id, hero_id, amount)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (player_id, server_id, hero_id) DO UPDATE
                SET amount = player_fragments.amount + EXCLUDED.amount",
            )
            .bind(&key.player_id)
            .bind(&key.server_id)
            .bind(hero_id)
            .bind(amount)
            .execute(&mut *conn)
            .await
            .map_err(on_err)?;
        }
        CommitOp::Stats(stats) => {
            sqlx::query(
                "INSERT INTO banner_stats
                    (banner_id, total_pulls, common, rare, epic, legendary, mythic)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (banner_id) DO UPDATE SET
                    total_pulls = banner_stats.total_pulls + EXCLUDED.total_pulls,
                    common = banner_stats.common + EXCLUDED.common,
                    rare = banner_stats.rare + EXCLUDED.rare,
                    epic = banner_stats.epic + EXCLUDED.epic,
                    legendary = banner_stats.legendary + EXCLUDED.legendary,
                    mythic = banner_stats.mythic + EXCLUDED.mythic",
            )
            .bind(&stats.banner_id)
            .bind(stats.total_pulls as i64)
            .bind(stats.by_rarity.common as i64)
            .bind(stats.by_rarity.rare as i64)
            .bind(stats.by_rarity.epic as i64)
            .bind(stats.by_rarity.legendary as i64)
            .bind(stats.by_rarity.mythic as i64)
            .execute(&mut *conn)
            .await
            .map_err(on_err)?;
        }
        CommitOp::History(record) => {
            sqlx::query(
                "INSERT INTO pull_history (id, batch_id, player_id, server_id, banner_id,
                    draw_index, hero_id, rarity, is_new, fragments_gained, is_focus_hero,
                    is_pity_triggered, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            )
            .bind(record.id)
            .bind(record.batch_id)
            .bind(&record.player_id)
            .bind(&record.server_id)
            .bind(&record.banner_id)
            .bind(record.draw_index as i64)
            .bind(&record.hero_id)
            .bind(record.rarity.as_str())
            .bind(record.is_new)
            .bind(record.fragments_gained)
            .bind(record.is_focus_hero)
            .bind(record.is_pity_triggered)
            .bind(record.created_at)
            .execute(&mut *conn)
            .await
            .map_err(on_err)?;
        }
    }
    Ok(())
}

#[async_trait]
impl SummonStore for PgSummonStore {
    async fn load_heroes(&self) -> SummonResult<Vec<Hero>> {
        sqlx::query_as::<_, HeroRow>("SELECT id, name, rarity, element FROM heroes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?
            .into_iter()
            .map(HeroRow::into_hero)
            .collect()
    }

    async fn save_hero(&self, hero: Hero) -> SummonResult<()> {
        sqlx::query(
            "INSERT INTO heroes (id, name, rarity, element) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, rarity = EXCLUDED.rarity, element = EXCLUDED.element",
        )
        .bind(&hero.id)
        .bind(&hero.name)
        .bind(hero.rarity.as_str())
        .bind(&hero.element)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn load_banner(&self, banner_id: &str) -> SummonResult<Option<Banner>> {
        let row = sqlx::query_as::<_, BannerRow>("SELECT * FROM banners WHERE id = $1")
            .bind(banner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(|r| r.config.0))
    }

    async fn save_banner(&self, banner: Banner) -> SummonResult<()> {
        sqlx::query(
            "INSERT INTO banners (id, kind, enabled, config, updated_at) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET kind = EXCLUDED.kind, enabled = EXCLUDED.enabled,
                config = EXCLUDED.config, updated_at = EXCLUDED.updated_at",
        )
        .bind(&banner.id)
        .bind(format!("{:?}", banner.kind))
        .bind(banner.enabled)
        .bind(Json(&banner))
        .bind(get_current_timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn list_banners(&self) -> SummonResult<Vec<Banner>> {
        let rows = sqlx::query_as::<_, BannerRow>("SELECT * FROM banners ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(|r| r.config.0).collect())
    }

    async fn load_player(&self, key: &PlayerKey) -> SummonResult<PlayerSnapshot> {
        // one read-only transaction so the parts belong to the same version
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let mut snapshot = PlayerSnapshot::empty(key.clone());
        let account_sql = format!("SELECT * FROM player_accounts {PLAYER_ROWS}");
        let account = sqlx::query_as::<_, PlayerAccountRow>(&account_sql)
            .bind(&key.player_id)
            .bind(&key.server_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        if let Some(account) = account {
            snapshot.version = account.version;
            snapshot.wallet = Wallet { gems: account.gems, tickets: account.tickets };
        }

        let pity_sql = format!("SELECT * FROM player_pity {PLAYER_ROWS}");
        let pity = sqlx::query_as::<_, PlayerPityRow>(&pity_sql)
            .bind(&key.player_id)
            .bind(&key.server_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage)?;
        snapshot.pity = pity
            .into_iter()
            .map(PlayerPityRow::into_state)
            .collect::<SummonResult<BTreeMap<String, PlayerPityState>>>()?;

        snapshot.mythic = load_ledger(&mut tx, key).await?;

        let heroes_sql = format!("SELECT * FROM player_heroes {PLAYER_ROWS}");
        let heroes = sqlx::query_as::<_, PlayerHeroRow>(&heroes_sql)
            .bind(&key.player_id)
            .bind(&key.server_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage)?;
        let fragments = sqlx::query_as::<_, PlayerFragmentRow>(&format!(
            "SELECT * FROM player_fragments {PLAYER_ROWS}"
        ))
        .bind(&key.player_id)
        .bind(&key.server_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(storage)?;

        let mut roster = Roster::default();
        for row in heroes {
            roster.add_hero(row.into_owned()?);
        }
        for row in fragments {
            roster.credit_fragments(&row.hero_id, row.amount);
        }
        snapshot.roster = roster;

        tx.commit().await.map_err(storage)?;
        Ok(snapshot)
    }

    async fn commit(&self, commit: &PullCommit) -> SummonResult<()> {
        let key = &commit.player;
        let on_err = player_error(key);

        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", self.commit_timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let account = lock_account(&mut tx, key).await.map_err(&on_err)?;
        if account.version != commit.expected_version {
            return Err(SummonError::PersistenceConflict { player: key.to_string() });
        }

        for op in commit.operations() {
            apply_op(&mut tx, key, &account, op).await?;
        }

        sqlx::query(&format!(
            "UPDATE player_accounts SET version = version + 1, updated_at = $3 {PLAYER_ROWS}"
        ))
        .bind(&key.player_id)
        .bind(&key.server_id)
        .bind(get_current_timestamp())
        .execute(&mut *tx)
        .await
        .map_err(&on_err)?;

        tx.commit().await.map_err(on_err)
    }

    async fn credit_wallet(
        &self,
        key: &PlayerKey,
        currency: Currency,
        amount: i64,
    ) -> SummonResult<Wallet> {
        let column = match currency {
            Currency::Gems => "gems",
            Currency::Tickets => "tickets",
            Currency::Scrolls => {
                return Err(SummonError::InvalidRequest(
                    "scrolls are only earned through pulls".to_string(),
                ));
            }
        };
        if amount < 0 {
            return Err(SummonError::InvalidRequest(
                "credit amount must be non-negative".to_string(),
            ));
        }

        let on_err = player_error(key);
        let mut tx = self.pool.begin().await.map_err(storage)?;
        lock_account(&mut tx, key).await.map_err(&on_err)?;
        let account = sqlx::query_as::<_, PlayerAccountRow>(&format!(
            "UPDATE player_accounts
            SET {column} = {column} + $3, version = version + 1, updated_at = $4
            {PLAYER_ROWS} RETURNING *"
        ))
        .bind(&key.player_id)
        .bind(&key.server_id)
        .bind(amount)
        .bind(get_current_timestamp())
        .fetch_one(&mut *tx)
        .await
        .map_err(&on_err)?;
        tx.commit().await.map_err(on_err)?;

        Ok(Wallet { gems: account.gems, tickets: account.tickets })
    }

    async fn banner_stats(&self, banner_id: &str) -> SummonResult<BannerStats> {
        let row =
            sqlx::query_as::<_, BannerStatsRow>("SELECT * FROM banner_stats WHERE banner_id = $1")
                .bind(banner_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
        match row {
            Some(row) => row.into_stats(),
            None => Ok(BannerStats::new(banner_id)),
        }
    }

    async fn pull_history(
        &self,
        key: &PlayerKey,
        limit: usize,
    ) -> SummonResult<Vec<PullRecord>> {
        sqlx::query_as::<_, PullHistoryRow>(&format!(
            "SELECT * FROM pull_history {PLAYER_ROWS} ORDER BY seq DESC LIMIT $3"
        ))
        .bind(&key.player_id)
        .bind(&key.server_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?
        .into_iter()
        .map(PullHistoryRow::into_record)
        .collect()
    }
}
