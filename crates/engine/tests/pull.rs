mod common;

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;

use common::*;
use summon_engine::{
    BannerKind, Currency, ErrorKind, HeroPool, MemorySummonStore, PullCost, PullRequest, Rarity,
    StaticRotation, SummonConfig, SummonEngine, SummonError, SummonEvent, SummonStore,
};

fn request(player: &str, banner: &str, count: u32) -> PullRequest {
    PullRequest::new(player, SERVER, banner, count)
}

#[tokio::test]
async fn ninetieth_pull_is_a_pity_legendary() {
    let f = std_fixture(common_only_rates()).await;
    f.fund("p1", 1600 * 9).await;

    let mut draws = Vec::new();
    for _ in 0..9 {
        let batch = f.engine.pull(request("p1", "std", 10)).await.unwrap();
        draws.extend(batch.results);
    }

    assert_eq!(draws.len(), 90);
    for draw in &draws[..89] {
        assert_eq!(draw.rarity, Rarity::Common);
        assert!(!draw.is_pity_triggered);
    }
    assert_eq!(draws[89].rarity, Rarity::Legendary);
    assert!(draws[89].is_pity_triggered);

    let snapshot = f.engine.snapshot(&key("p1")).await.unwrap();
    let pity = snapshot.pity["banner:std"];
    assert_eq!(pity.pulls_since_legendary, 0);
    assert_eq!(snapshot.wallet.gems, 0);

    let stats = f.store.banner_stats("std").await.unwrap();
    assert_eq!(stats.total_pulls, 90);
    assert_eq!(stats.legendary_count(), 1);
    assert_eq!(stats.by_rarity.common, 89);
}

#[tokio::test]
async fn eightieth_regular_pull_mints_a_scroll() {
    let f = std_fixture(standard_rates()).await;
    f.fund("p1", 160 * 80).await;

    for _ in 0..7 {
        let batch = f.engine.pull(request("p1", "std", 10)).await.unwrap();
        assert_eq!(batch.scrolls_granted, 0);
    }
    for _ in 0..9 {
        f.engine.pull(request("p1", "std", 1)).await.unwrap();
    }
    let ledger = f.engine.snapshot(&key("p1")).await.unwrap().mythic.unwrap();
    assert_eq!(ledger.fused_pull_counter, 79);
    assert_eq!(ledger.scrolls_earned, 0);

    let batch = f.engine.pull(request("p1", "std", 1)).await.unwrap();
    assert_eq!(batch.scrolls_granted, 1);
    assert_eq!(batch.mythic.fused_pull_counter, 0);
    assert_eq!(batch.mythic.scrolls_earned, 1);
    assert_eq!(batch.mythic.scrolls_available, 1);
    assert!(batch.events.iter().any(|e| matches!(
        e,
        SummonEvent::ScrollsEarned { amount: 1, scrolls_available: 1, .. }
    )));
}

#[tokio::test]
async fn ledger_counts_pulls_across_regular_banners() {
    let f = fixture(
        SummonConfig::default(),
        vec![
            banner("std", BannerKind::Standard, standard_rates()),
            banner("limited", BannerKind::Limited, standard_rates()),
            banner("beginner", BannerKind::Beginner, standard_rates()),
        ],
    )
    .await;
    f.fund("p1", 1600 * 25).await;

    let mut total = 0u64;
    for (i, banner_id) in ["std", "limited", "beginner"].iter().cycle().take(25).enumerate() {
        let count = if i % 2 == 0 { 10 } else { 1 };
        let batch = f.engine.pull(request("p1", banner_id, count)).await.unwrap();
        total += count as u64;
        assert_eq!(batch.mythic.scrolls_earned as u64, total / 80);
        assert_eq!(batch.mythic.fused_pull_counter as u64, total % 80);
    }
}

#[tokio::test]
async fn unaffordable_pull_changes_nothing() {
    let f = std_fixture(standard_rates()).await;
    f.fund("p1", 1599).await;
    let before = f.engine.snapshot(&key("p1")).await.unwrap();

    let err = f.engine.pull(request("p1", "std", 10)).await.unwrap_err();
    match err {
        SummonError::InsufficientResources { currency, required, available } => {
            assert_eq!((currency, required, available), (Currency::Gems, 1600, 1599));
        }
        other => panic!("unexpected error {:?}", other),
    }

    assert_eq!(f.engine.snapshot(&key("p1")).await.unwrap(), before);
    assert_eq!(f.store.banner_stats("std").await.unwrap().total_pulls, 0);
    assert!(f.store.pull_history(&key("p1"), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicates_convert_into_fragments() {
    let mut narrow = banner("narrow", BannerKind::Standard, common_only_rates());
    narrow.hero_pool = HeroPool::Explicit { hero_ids: vec!["c1".into(), "l1".into()] };
    let f = fixture(SummonConfig::default(), vec![narrow]).await;
    f.fund("p1", 1600).await;

    let batch = f.engine.pull(request("p1", "narrow", 10)).await.unwrap();
    assert!(batch.results[0].is_new);
    for draw in &batch.results[1..] {
        assert_eq!(draw.hero_id, "c1");
        assert!(!draw.is_new);
        assert_eq!(draw.fragments_gained, 5);
    }

    let snapshot = f.engine.snapshot(&key("p1")).await.unwrap();
    assert_eq!(snapshot.roster.heroes.len(), 1);
    assert_eq!(snapshot.roster.fragments_of("c1"), 45);
    let new_hero_events =
        batch.events.iter().filter(|e| matches!(e, SummonEvent::NewHero { .. })).count();
    assert_eq!(new_hero_events, 1);
}

#[tokio::test]
async fn failed_commit_rolls_back_everything() {
    let f = std_fixture(standard_rates()).await;
    f.fund("p1", 3200).await;
    f.engine.pull(request("p1", "std", 10)).await.unwrap();

    let before = f.engine.snapshot(&key("p1")).await.unwrap();
    let stats_before = f.store.banner_stats("std").await.unwrap();
    let history_before = f.store.pull_history(&key("p1"), 100).await.unwrap();

    f.store.fail_next_commit_after(6);
    let err = f.engine.pull(request("p1", "std", 10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert_eq!(f.engine.snapshot(&key("p1")).await.unwrap(), before);
    assert_eq!(f.store.banner_stats("std").await.unwrap(), stats_before);
    assert_eq!(f.store.pull_history(&key("p1"), 100).await.unwrap(), history_before);
    assert_eq!(f.store.commit_count(), 1);
}

#[tokio::test]
async fn concurrent_pulls_never_overspend() {
    let f = std_fixture(standard_rates()).await;
    f.fund("p1", 160 * 3).await;
    let engine = Arc::new(f.engine);

    let pulls = (0..8).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.pull(request("p1", "std", 1)).await })
    });
    let outcomes: Vec<_> =
        join_all(pulls).await.into_iter().map(|joined| joined.unwrap()).collect();

    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(succeeded, 3);
    for failed in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert_eq!(failed.kind(), ErrorKind::InsufficientResources);
    }
    let snapshot = engine.snapshot(&key("p1")).await.unwrap();
    assert_eq!(snapshot.wallet.gems, 0);
    assert_eq!(f.store.banner_stats("std").await.unwrap().total_pulls, 3);
}

#[tokio::test]
async fn engine_refuses_config_that_cannot_mint_scrolls() {
    let store = Arc::new(MemorySummonStore::new());
    let config = SummonConfig { fused_pulls_per_scroll: 0, ..Default::default() };
    match SummonEngine::new(store, config) {
        Err(err) => assert_eq!(err.kind(), ErrorKind::Configuration),
        Ok(_) => panic!("engine accepted fused_pulls_per_scroll = 0"),
    }
}

#[tokio::test]
async fn lost_commit_race_is_retried() {
    let f = std_fixture(standard_rates()).await;
    f.fund("p1", 160).await;

    f.store.force_conflicts(2);
    let batch = f.engine.pull(request("p1", "std", 1)).await.unwrap();
    assert_eq!(batch.attempts, 3);
    assert_eq!(f.engine.snapshot(&key("p1")).await.unwrap().wallet.gems, 0);
}

#[tokio::test]
async fn retries_give_up_after_configured_attempts() {
    let f = std_fixture(standard_rates()).await;
    f.fund("p1", 160).await;

    f.store.force_conflicts(3);
    let err = f.engine.pull(request("p1", "std", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceConflict);
    assert_eq!(f.engine.snapshot(&key("p1")).await.unwrap().wallet.gems, 160);
}

#[tokio::test]
async fn shared_pity_spans_grouped_banners() {
    let mut std_banner = banner("std", BannerKind::Standard, common_only_rates());
    let mut limited = banner("limited", BannerKind::Limited, common_only_rates());
    for b in [&mut std_banner, &mut limited] {
        b.pity.shared_pity = true;
        b.pity.pity_group = Some("std+limited".into());
    }
    let f = fixture(SummonConfig::default(), vec![std_banner, limited]).await;
    f.fund("p1", 1600 * 2).await;

    f.engine.pull(request("p1", "std", 10)).await.unwrap();
    let batch = f.engine.pull(request("p1", "limited", 10)).await.unwrap();
    let pity = batch.pity.unwrap();
    assert_eq!(pity.group, "group:std+limited");
    assert_eq!(pity.pulls_since_legendary, 20);

    let snapshot = f.engine.snapshot(&key("p1")).await.unwrap();
    assert_eq!(snapshot.pity.len(), 1);
}

#[tokio::test]
async fn separate_banners_keep_separate_pity() {
    let f = fixture(
        SummonConfig::default(),
        vec![
            banner("std", BannerKind::Standard, common_only_rates()),
            banner("limited", BannerKind::Limited, common_only_rates()),
        ],
    )
    .await;
    f.fund("p1", 1600 * 2).await;

    f.engine.pull(request("p1", "std", 10)).await.unwrap();
    let batch = f.engine.pull(request("p1", "limited", 10)).await.unwrap();
    assert_eq!(batch.pity.unwrap().pulls_since_legendary, 10);
}

#[tokio::test]
async fn request_validation() {
    let mut ended = banner("ended", BannerKind::Limited, standard_rates());
    ended.ends_at = Some(1);
    let mut us_only = banner("us-only", BannerKind::Limited, standard_rates());
    us_only.servers = vec!["us-1".into()];
    let f = fixture(
        SummonConfig::default(),
        vec![banner("std", BannerKind::Standard, standard_rates()), ended, us_only],
    )
    .await;
    f.fund("p1", 10_000).await;

    for (req, what) in [
        (request("p1", "std", 5), "bad count"),
        (request("p1", "missing", 1), "unknown banner"),
        (request("p1", "ended", 1), "ended banner"),
        (request("p1", "us-only", 1), "wrong server"),
        (request("p1", "std", 1).paying_with(Currency::Tickets), "unsupported currency"),
    ] {
        let err = f.engine.pull(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest, "{}", what);
    }
    assert_eq!(f.store.commit_count(), 0);
}

#[tokio::test]
async fn elemental_banner_follows_rotation() {
    let store_banners = vec![banner("fire", BannerKind::Elemental, standard_rates())];
    let f = fixture(SummonConfig::default(), store_banners).await;
    f.fund("p1", 320).await;

    let err = f.engine.pull(request("p1", "fire", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let rotation = Arc::new(StaticRotation::default());
    rotation.set(SERVER, "fire");
    let engine = SummonEngine::new(f.store.clone(), SummonConfig::default())
        .unwrap()
        .with_rotation(rotation.clone());
    engine.pull(request("p1", "fire", 1)).await.unwrap();

    rotation.set(SERVER, "water");
    assert!(engine.pull(request("p1", "fire", 1)).await.is_err());
}

#[tokio::test]
async fn free_pull_skips_the_debit_only() {
    let f = std_fixture(standard_rates()).await;

    let batch = f.engine.pull(request("p1", "std", 10).free()).await.unwrap();
    assert_eq!(batch.charge, None);
    assert_eq!(batch.results.len(), 10);
    assert_eq!(batch.mythic.fused_pull_counter, 10);

    let snapshot = f.engine.snapshot(&key("p1")).await.unwrap();
    assert_eq!(snapshot.wallet.gems, 0);
    assert_eq!(snapshot.pity["banner:std"], summon_engine::PlayerPityState {
        pulls_since_legendary: batch.pity.as_ref().unwrap().pulls_since_legendary,
        pulls_since_epic: batch.pity.as_ref().unwrap().pulls_since_epic,
    });
    assert_eq!(f.store.pull_history(&key("p1"), 20).await.unwrap().len(), 10);
}

#[tokio::test]
async fn cheapest_listed_option_is_tried_first() {
    let mut b = banner("std", BannerKind::Standard, standard_rates());
    b.costs = vec![
        PullCost { currency: Currency::Tickets, single: 1, multi: 10 },
        PullCost { currency: Currency::Gems, single: 160, multi: 1600 },
    ];
    let f = fixture(SummonConfig::default(), vec![b]).await;
    f.fund("p1", 1600).await;
    f.store.credit_wallet(&key("p1"), Currency::Tickets, 10).await.unwrap();

    let batch = f.engine.pull(request("p1", "std", 10)).await.unwrap();
    assert_eq!(batch.charge.unwrap().currency, Currency::Tickets);
    let batch = f.engine.pull(request("p1", "std", 10)).await.unwrap();
    assert_eq!(batch.charge.unwrap().currency, Currency::Gems);
}

#[tokio::test]
async fn events_are_published_after_commit() {
    let (tx, mut rx) = mpsc::channel(64);
    let store = Arc::new(MemorySummonStore::new());
    for hero in heroes() {
        store.save_hero(hero).await.unwrap();
    }
    let engine = SummonEngine::new(store.clone(), SummonConfig::default())
        .unwrap()
        .with_event_sender(tx);
    engine
        .catalog()
        .save_banner(banner("std", BannerKind::Standard, standard_rates()))
        .await
        .unwrap();

    store.fail_next_commit_after(0);
    assert!(engine.pull(request("p1", "std", 10).free()).await.is_err());
    assert!(rx.try_recv().is_err());

    let batch = engine.pull(request("p1", "std", 10).free()).await.unwrap();
    let mut received = Vec::new();
    while let Ok(event) = rx.try_recv() {
        received.push(event);
    }
    assert_eq!(received, batch.events);
    assert!(received.iter().any(|e| matches!(e, SummonEvent::NewHero { .. })));
}

#[tokio::test]
async fn same_seed_replays_same_draws() {
    let run = || async {
        let f = std_fixture(standard_rates()).await;
        let batch = f.engine.pull(request("p1", "std", 10).free()).await.unwrap();
        (batch.seed, batch.results)
    };
    let (seed_a, draws_a) = run().await;
    let (seed_b, draws_b) = run().await;
    assert_eq!(seed_a, seed_b);
    assert_eq!(draws_a, draws_b);
}

#[tokio::test]
async fn history_is_recorded_per_draw() {
    let f = std_fixture(standard_rates()).await;
    let batch = f.engine.pull(request("p1", "std", 10).free()).await.unwrap();

    let history = f.store.pull_history(&key("p1"), 3).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|r| r.batch_id == batch.batch_id));
    assert_eq!(history[0].draw_index, 9);
    assert_eq!(history[0].hero_id, batch.results[9].hero_id);
}
