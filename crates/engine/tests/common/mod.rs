#![allow(dead_code)]

use std::sync::Arc;

use summon_engine::{
    Banner, BannerKind, Currency, Hero, HeroPool, MemorySummonStore, PityConfig, PlayerKey,
    PullCost, RateTable, Rarity, SummonConfig, SummonEngine, SummonStore,
};

pub const SERVER: &str = "eu-1";

pub fn heroes() -> Vec<Hero> {
    vec![
        Hero::new("c1", "Footman", Rarity::Common),
        Hero::new("c2", "Squire", Rarity::Common),
        Hero::new("r1", "Archer", Rarity::Rare),
        Hero::new("e1", "Mage", Rarity::Epic),
        Hero::new("l1", "Paladin", Rarity::Legendary),
        Hero::new("l2", "Warlord", Rarity::Legendary),
        Hero::new("m1", "Celestial", Rarity::Mythic),
    ]
}

pub fn standard_rates() -> RateTable {
    RateTable { common: 50.0, rare: 30.0, epic: 15.0, legendary: 5.0, mythic: 0.0 }
}

/// Every natural draw is Common; Legendary only comes from pity.
pub fn common_only_rates() -> RateTable {
    RateTable { common: 100.0, rare: 0.0, epic: 0.0, legendary: 0.0, mythic: 0.0 }
}

pub fn banner(id: &str, kind: BannerKind, rates: RateTable) -> Banner {
    Banner {
        id: id.into(),
        name: id.into(),
        kind,
        enabled: true,
        starts_at: 0,
        ends_at: None,
        servers: vec![],
        hero_pool: HeroPool::default(),
        pool_rarities: vec![],
        rates,
        focus_heroes: vec![],
        pity: PityConfig {
            legendary_threshold: 90,
            epic_threshold: None,
            shared_pity: false,
            pity_group: None,
        },
        costs: vec![PullCost { currency: Currency::Gems, single: 160, multi: 1600 }],
    }
}

pub fn mythic_banner(id: &str, mythic_rate: f64) -> Banner {
    Banner {
        costs: vec![PullCost { currency: Currency::Scrolls, single: 1, multi: 10 }],
        ..banner(id, BannerKind::Mythic, RateTable { mythic: mythic_rate, ..Default::default() })
    }
}

pub fn key(player: &str) -> PlayerKey {
    PlayerKey::new(player, SERVER)
}

pub struct Fixture {
    pub store: Arc<MemorySummonStore>,
    pub engine: SummonEngine,
}

pub async fn fixture(config: SummonConfig, banners: Vec<Banner>) -> Fixture {
    let store = Arc::new(MemorySummonStore::new());
    for hero in heroes() {
        store.save_hero(hero).await.unwrap();
    }
    let engine = SummonEngine::new(store.clone(), config).unwrap().with_seed(42);
    for banner in banners {
        engine.catalog().save_banner(banner).await.unwrap();
    }
    Fixture { store, engine }
}

/// Default config with a single standard banner `std`.
pub async fn std_fixture(rates: RateTable) -> Fixture {
    fixture(SummonConfig::default(), vec![banner("std", BannerKind::Standard, rates)]).await
}

impl Fixture {
    pub async fn fund(&self, player: &str, gems: i64) {
        self.store.credit_wallet(&key(player), Currency::Gems, gems).await.unwrap();
    }
}
