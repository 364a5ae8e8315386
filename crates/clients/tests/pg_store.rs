//! Runs against the database in `DATABASE_URL`:
//! `cargo test -p summon-clients -- --ignored`

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::OnceCell;

use summon_clients::{init_schema, PgSummonStore};
use summon_engine::{
    Banner, BannerKind, BannerStats, Charge, Currency, ErrorKind, Hero, HeroPool, MythicPity,
    PityConfig, PlayerKey, PullCommit, PullCost, PullRequest, RateTable, Rarity, SummonConfig,
    SummonEngine, SummonStore,
};

static POOL: OnceCell<&'static PgPool> = OnceCell::const_new();

async fn store() -> Arc<PgSummonStore> {
    let pool = POOL
        .get_or_init(|| async {
            dotenv::dotenv().ok();
            init_schema(false).await
        })
        .await;
    Arc::new(PgSummonStore::new((*pool).clone(), 5_000))
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

const HEROES: [(&str, Rarity); 4] = [
    ("pg-c1", Rarity::Common),
    ("pg-r1", Rarity::Rare),
    ("pg-e1", Rarity::Epic),
    ("pg-l1", Rarity::Legendary),
];

async fn seed(store: &PgSummonStore, banner_id: &str) {
    for (id, rarity) in HEROES {
        store.save_hero(Hero::new(id, id, rarity)).await.unwrap();
    }
    let banner = Banner {
        id: banner_id.to_string(),
        name: banner_id.to_string(),
        kind: BannerKind::Standard,
        enabled: true,
        starts_at: 0,
        ends_at: None,
        servers: vec![],
        hero_pool: HeroPool::Explicit {
            hero_ids: HEROES.iter().map(|(id, _)| id.to_string()).collect(),
        },
        pool_rarities: vec![],
        rates: RateTable { common: 50.0, rare: 30.0, epic: 15.0, legendary: 5.0, mythic: 0.0 },
        focus_heroes: vec![],
        pity: PityConfig::default(),
        costs: vec![PullCost { currency: Currency::Gems, single: 160, multi: 1600 }],
    };
    store.save_banner(banner).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn pull_round_trips_through_postgres() {
    let store = store().await;
    let banner_id = unique("pg-std");
    seed(&store, &banner_id).await;

    let key = PlayerKey::new(unique("player"), "eu-1");
    store.credit_wallet(&key, Currency::Gems, 1600).await.unwrap();

    let engine = SummonEngine::new(store.clone(), SummonConfig::default()).unwrap();
    let batch = engine
        .pull(PullRequest::new(key.player_id.clone(), "eu-1", banner_id.clone(), 10))
        .await
        .unwrap();

    let snapshot = store.load_player(&key).await.unwrap();
    assert_eq!(snapshot.wallet.gems, 0);
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.mythic.unwrap().fused_pull_counter, 10);
    let fragments: i64 = batch.results.iter().map(|r| r.fragments_gained).sum();
    let held: i64 = snapshot.roster.fragments.values().sum();
    assert_eq!(fragments, held);

    let stats = store.banner_stats(&banner_id).await.unwrap();
    assert_eq!(stats.total_pulls, 10);
    let history = store.pull_history(&key, 20).await.unwrap();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].draw_index, 9);
}

#[tokio::test]
#[ignore]
async fn stale_commit_is_a_conflict() {
    let store = store().await;
    let banner_id = unique("pg-std");
    seed(&store, &banner_id).await;
    let key = PlayerKey::new(unique("player"), "eu-1");
    store.credit_wallet(&key, Currency::Gems, 320).await.unwrap();

    let stale = store.load_player(&key).await.unwrap();
    // another writer moves the player on before the commit lands
    store.credit_wallet(&key, Currency::Gems, 10).await.unwrap();

    let commit = PullCommit {
        batch_id: uuid::Uuid::new_v4(),
        player: key.clone(),
        expected_version: stale.version,
        charge: Some(Charge { currency: Currency::Gems, amount: 160 }),
        pity: None,
        mythic: MythicPity::new(35),
        new_heroes: vec![],
        fragment_credits: vec![],
        stats: BannerStats::new(banner_id.clone()),
        history: vec![],
    };
    let err = store.commit(&commit).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceConflict);

    let player = store.load_player(&key).await.unwrap();
    assert_eq!(player.wallet.gems, 330);
    assert_eq!(player.version, stale.version + 1);
    assert_eq!(store.banner_stats(&banner_id).await.unwrap().total_pulls, 0);
}

#[tokio::test]
#[ignore]
async fn overdraft_is_rejected_without_changes() {
    let store = store().await;
    let banner_id = unique("pg-std");
    seed(&store, &banner_id).await;
    let key = PlayerKey::new(unique("player"), "eu-1");
    store.credit_wallet(&key, Currency::Gems, 100).await.unwrap();

    let engine = SummonEngine::new(store.clone(), SummonConfig::default()).unwrap();
    let err = engine
        .pull(PullRequest::new(key.player_id.clone(), "eu-1", banner_id.clone(), 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientResources);
    assert_eq!(store.load_player(&key).await.unwrap().wallet.gems, 100);
    assert!(store.pull_history(&key, 5).await.unwrap().is_empty());
}
