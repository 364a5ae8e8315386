use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rarity::Rarity;

pub type HeroId = String;

/// A summonable hero as defined by the game's content catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub element: Option<String>,
}

impl Hero {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rarity: Rarity) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
            element: None,
        }
    }
}

/// All heroes known to the game, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct HeroCatalog {
    heroes: BTreeMap<HeroId, Hero>,
}

impl HeroCatalog {
    pub fn new(heroes: impl IntoIterator<Item = Hero>) -> Self {
        Self {
            heroes: heroes.into_iter().map(|h| (h.id.clone(), h)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Hero> {
        self.heroes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hero> {
        self.heroes.values()
    }

    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }
}
