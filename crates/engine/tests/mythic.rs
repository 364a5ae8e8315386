mod common;

use std::sync::Arc;

use futures::future::join_all;

use common::*;
use summon_engine::{
    BannerKind, Currency, ErrorKind, PullRequest, Rarity, SummonConfig, SummonEngine, SummonError,
    SummonStore,
};

/// One scroll per regular pull keeps the setup short.
fn fast_scrolls() -> SummonConfig {
    SummonConfig { fused_pulls_per_scroll: 1, ..Default::default() }
}

#[tokio::test]
async fn mythic_pull_without_scrolls_is_rejected() {
    let f = fixture(fast_scrolls(), vec![mythic_banner("mythic", 5.0)]).await;
    f.fund("p1", 100_000).await;
    let before = f.engine.snapshot(&key("p1")).await.unwrap();

    let err = f.engine.pull(PullRequest::new("p1", SERVER, "mythic", 1)).await.unwrap_err();
    match err {
        SummonError::InsufficientResources { currency, required, available } => {
            assert_eq!((currency, required, available), (Currency::Scrolls, 1, 0));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(f.engine.snapshot(&key("p1")).await.unwrap(), before);
}

#[tokio::test]
async fn scrolls_buy_mythic_pulls() {
    let f = fixture(
        fast_scrolls(),
        vec![banner("std", BannerKind::Standard, standard_rates()), mythic_banner("mythic", 5.0)],
    )
    .await;
    f.fund("p1", 1600 * 2).await;
    f.engine.pull(PullRequest::new("p1", SERVER, "std", 10)).await.unwrap();
    let earned = f.engine.pull(PullRequest::new("p1", SERVER, "std", 10)).await.unwrap();
    assert_eq!(earned.mythic.scrolls_available, 20);
    let pity_before = f.engine.snapshot(&key("p1")).await.unwrap().pity;

    let batch = f.engine.pull(PullRequest::new("p1", SERVER, "mythic", 10)).await.unwrap();
    assert_eq!(batch.scrolls_spent, 10);
    assert_eq!(batch.scrolls_granted, 0);
    assert!(batch.pity.is_none());
    assert_eq!(batch.charge.unwrap().currency, Currency::Scrolls);
    for draw in &batch.results {
        assert!(matches!(draw.rarity, Rarity::Mythic | Rarity::Legendary));
    }

    let snapshot = f.engine.snapshot(&key("p1")).await.unwrap();
    let ledger = snapshot.mythic.unwrap();
    assert_eq!(ledger.scrolls_used, 10);
    assert_eq!(ledger.scrolls_available(), 10);
    assert_eq!(ledger.total_mythic_pulls, 10);
    // mythic pulls neither feed the ledger nor touch regular pity
    assert_eq!(ledger.total_fused_pulls, 20);
    assert_eq!(snapshot.pity, pity_before);

    let mythic_drawn: Vec<&str> = batch
        .results
        .iter()
        .filter(|r| r.rarity == Rarity::Mythic)
        .map(|r| r.hero_id.as_str())
        .collect();
    for hero_id in mythic_drawn {
        assert!(ledger.mythic_heroes_obtained.contains(hero_id));
    }
}

#[tokio::test]
async fn mythic_pity_forces_a_mythic() {
    let config = SummonConfig { mythic_pity_threshold: 4, ..fast_scrolls() };
    let banners =
        vec![banner("std", BannerKind::Standard, standard_rates()), mythic_banner("mythic", 0.01)];
    let f = fixture(config, banners).await;
    f.fund("p1", 1600 * 2).await;
    f.engine.pull(PullRequest::new("p1", SERVER, "std", 10)).await.unwrap();
    f.engine.pull(PullRequest::new("p1", SERVER, "std", 10)).await.unwrap();

    let mut draws = Vec::new();
    for _ in 0..2 {
        let batch = f.engine.pull(PullRequest::new("p1", SERVER, "mythic", 10)).await.unwrap();
        draws.extend(batch.results);
    }

    let mut since_last = 0;
    for draw in &draws {
        if since_last + 1 >= 4 {
            assert_eq!(draw.rarity, Rarity::Mythic);
            assert!(draw.is_pity_triggered);
        }
        since_last = if draw.rarity == Rarity::Mythic { 0 } else { since_last + 1 };
    }
    let ledger = f.engine.snapshot(&key("p1")).await.unwrap().mythic.unwrap();
    assert_eq!(ledger.mythic_pulls_since_last, since_last);
    assert_eq!(ledger.scrolls_available(), 0);
}

#[tokio::test]
async fn free_mythic_pull_keeps_scrolls() {
    let f = fixture(fast_scrolls(), vec![mythic_banner("mythic", 50.0)]).await;

    let batch = f.engine.pull(PullRequest::new("p1", SERVER, "mythic", 1).free()).await.unwrap();
    assert_eq!(batch.scrolls_spent, 0);
    assert_eq!(batch.mythic.total_mythic_pulls, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_engines_spend_a_scroll_once() {
    let f = fixture(
        fast_scrolls(),
        vec![banner("std", BannerKind::Standard, standard_rates()), mythic_banner("mythic", 5.0)],
    )
    .await;
    f.fund("p1", 160).await;
    f.engine.pull(PullRequest::new("p1", SERVER, "std", 1)).await.unwrap();

    // two processes sharing one store: no common per-player lock
    let other = SummonEngine::new(f.store.clone(), fast_scrolls()).unwrap().with_seed(7);
    let engines = [Arc::new(f.engine), Arc::new(other)];

    let pulls = (0..6).map(|i| {
        let engine = engines[i % 2].clone();
        tokio::spawn(async move { engine.pull(PullRequest::new("p1", SERVER, "mythic", 1)).await })
    });
    let outcomes: Vec<_> =
        join_all(pulls).await.into_iter().map(|joined| joined.unwrap()).collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    for failed in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert!(matches!(
            failed.kind(),
            ErrorKind::InsufficientResources | ErrorKind::PersistenceConflict
        ));
    }

    let ledger = f.store.load_player(&key("p1")).await.unwrap().mythic.unwrap();
    assert_eq!(ledger.scrolls_earned, 1);
    assert_eq!(ledger.scrolls_used, ledger.scrolls_earned);
    assert_eq!(ledger.total_mythic_pulls, 1);
    assert_eq!(f.store.pull_history(&key("p1"), 10).await.unwrap().len(), 2);
}
