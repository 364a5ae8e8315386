use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SummonConfig;
use crate::hero::{Hero, HeroId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedHero {
    pub hero_id: HeroId,
    pub level: u32,
    pub stars: u32,
    pub obtained_at: i64,
}

/// Heroes a player owns and the fragments they hold per hero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub heroes: BTreeMap<HeroId, OwnedHero>,
    pub fragments: BTreeMap<HeroId, i64>,
}

impl Roster {
    pub fn owns(&self, hero_id: &str) -> bool {
        self.heroes.contains_key(hero_id)
    }

    pub fn fragments_of(&self, hero_id: &str) -> i64 {
        self.fragments.get(hero_id).copied().unwrap_or(0)
    }

    pub fn add_hero(&mut self, hero: OwnedHero) {
        self.heroes.entry(hero.hero_id.clone()).or_insert(hero);
    }

    pub fn credit_fragments(&mut self, hero_id: &str, amount: i64) {
        *self.fragments.entry(hero_id.to_string()).or_insert(0) += amount;
    }
}

/// What happened to a drawn hero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    NewHero(OwnedHero),
    Duplicate { hero_id: HeroId, fragments: i64 },
}

impl Ownership {
    pub fn is_new(&self) -> bool {
        matches!(self, Ownership::NewHero(_))
    }

    pub fn fragments_gained(&self) -> i64 {
        match self {
            Ownership::NewHero(_) => 0,
            Ownership::Duplicate { fragments, .. } => *fragments,
        }
    }
}

/// Adds `hero` to the roster or converts it into fragments when already
/// owned. Never fails; the roster passed in is updated in place so the next
/// draw of the same batch sees the result.
pub fn resolve_ownership(
    roster: &mut Roster,
    hero: &Hero,
    config: &SummonConfig,
    now: i64,
) -> Ownership {
    if roster.owns(&hero.id) {
        let fragments = config.fragments.get(hero.rarity);
        roster.credit_fragments(&hero.id, fragments);
        return Ownership::Duplicate { hero_id: hero.id.clone(), fragments };
    }

    let owned = OwnedHero {
        hero_id: hero.id.clone(),
        level: config.new_hero_level,
        stars: config.base_stars.get(hero.rarity),
        obtained_at: now,
    };
    roster.add_hero(owned.clone());
    Ownership::NewHero(owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rarity::Rarity;

    #[test]
    fn first_copy_joins_roster() {
        let mut roster = Roster::default();
        let hero = Hero::new("l1", "Paladin", Rarity::Legendary);
        let outcome = resolve_ownership(&mut roster, &hero, &SummonConfig::default(), 10);
        assert!(outcome.is_new());
        let owned = &roster.heroes["l1"];
        assert_eq!(owned.level, 1);
        assert_eq!(owned.stars, 4);
        assert_eq!(roster.fragments_of("l1"), 0);
    }

    #[test]
    fn duplicates_become_fragments_by_rarity() {
        let config = SummonConfig::default();
        let mut roster = Roster::default();
        let legendary = Hero::new("l1", "Paladin", Rarity::Legendary);
        let mythic = Hero::new("m1", "Celestial", Rarity::Mythic);

        resolve_ownership(&mut roster, &legendary, &config, 0);
        resolve_ownership(&mut roster, &mythic, &config, 0);
        let dup = resolve_ownership(&mut roster, &legendary, &config, 0);
        let dup_mythic = resolve_ownership(&mut roster, &mythic, &config, 0);

        assert_eq!(dup, Ownership::Duplicate { hero_id: "l1".into(), fragments: 50 });
        assert_eq!(dup_mythic.fragments_gained(), 100);
        assert_eq!(roster.heroes.len(), 2);
        assert_eq!(roster.fragments_of("l1"), 50);

        resolve_ownership(&mut roster, &legendary, &config, 0);
        assert_eq!(roster.fragments_of("l1"), 100);
        assert_eq!(roster.heroes.len(), 2);
    }
}
