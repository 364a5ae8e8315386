mod catalog;
mod validate;

use serde::{Deserialize, Serialize};

use crate::error::{SummonError, SummonResult};
use crate::hero::HeroId;
use crate::pity::PityGroupKey;
use crate::pull::PullCount;
use crate::rarity::Rarity;
use crate::rotation::RotationSchedule;
use crate::wallet::Currency;

pub use catalog::BannerCatalog;
pub use validate::{validate_banner, FocusEntry, RarityPool, ResolvedBanner, RATE_SUM_TOLERANCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BannerKind {
    Standard,
    Limited,
    Beginner,
    Mythic,
    Elemental,
}

/// Which heroes a banner can hand out before any rarity filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeroPool {
    All {
        #[serde(default)]
        exclude: Vec<HeroId>,
    },
    Explicit {
        hero_ids: Vec<HeroId>,
    },
}

impl Default for HeroPool {
    fn default() -> Self {
        HeroPool::All { exclude: Vec::new() }
    }
}

/// Percent chance per rarity.
///
/// Regular banners spread exactly 100% over Common..Legendary. `mythic` is a
/// separate, additive chance read only by Mythic banners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateTable {
    pub common: f64,
    pub rare: f64,
    pub epic: f64,
    pub legendary: f64,
    #[serde(default)]
    pub mythic: f64,
}

impl RateTable {
    pub fn rate(&self, rarity: Rarity) -> f64 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
            Rarity::Mythic => self.mythic,
        }
    }

    pub fn standard_sum(&self) -> f64 {
        self.common + self.rare + self.epic + self.legendary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusHero {
    pub hero_id: HeroId,
    /// Share of the hero's rarity tier reserved for this hero, in `[0, 1]`.
    pub focus_chance: f64,
    /// Pity-forced draws of this tier always land on a guaranteed focus hero.
    #[serde(default)]
    pub guaranteed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityConfig {
    pub legendary_threshold: u32,
    #[serde(default)]
    pub epic_threshold: Option<u32>,
    #[serde(default)]
    pub shared_pity: bool,
    /// Declared group key for shared pity, e.g. `"standard+limited"`.
    #[serde(default)]
    pub pity_group: Option<String>,
}

impl Default for PityConfig {
    fn default() -> Self {
        Self {
            legendary_threshold: 90,
            epic_threshold: Some(10),
            shared_pity: false,
            pity_group: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullCost {
    pub currency: Currency,
    pub single: i64,
    pub multi: i64,
}

impl PullCost {
    pub fn amount(&self, count: PullCount) -> i64 {
        match count {
            PullCount::Single => self.single,
            PullCount::Multi => self.multi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub id: String,
    pub name: String,
    pub kind: BannerKind,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub starts_at: i64,
    #[serde(default)]
    pub ends_at: Option<i64>,
    /// Servers the banner runs on. Empty means every server.
    #[serde(default)]
    pub servers: Vec<String>,

    #[serde(default)]
    pub hero_pool: HeroPool,
    /// Restricts the pool to these rarities. Empty means no restriction.
    #[serde(default)]
    pub pool_rarities: Vec<Rarity>,

    pub rates: RateTable,
    #[serde(default)]
    pub focus_heroes: Vec<FocusHero>,
    #[serde(default)]
    pub pity: PityConfig,
    pub costs: Vec<PullCost>,
}

fn default_enabled() -> bool {
    true
}

impl Banner {
    pub fn is_mythic(&self) -> bool {
        self.kind == BannerKind::Mythic
    }

    pub fn pity_group_key(&self) -> PityGroupKey {
        match (&self.pity.shared_pity, &self.pity.pity_group) {
            (true, Some(group)) => PityGroupKey::Shared(group.clone()),
            _ => PityGroupKey::Banner(self.id.clone()),
        }
    }

    pub fn is_open_at(&self, now: i64) -> bool {
        self.enabled && now >= self.starts_at && self.ends_at.map_or(true, |end| now < end)
    }

    pub fn runs_on(&self, server_id: &str) -> bool {
        self.servers.is_empty() || self.servers.iter().any(|s| s == server_id)
    }

    /// Elemental banners are only open while the rotation names them for
    /// `server_id`.
    pub fn in_rotation(&self, rotation: &dyn RotationSchedule, server_id: &str, now: i64) -> bool {
        self.kind != BannerKind::Elemental
            || rotation.active_elemental_banner(server_id, now).as_deref() == Some(self.id.as_str())
    }

    /// Rejects pulls on a banner that is disabled, outside its window or not
    /// offered on `server_id`.
    pub fn check_available(&self, server_id: &str, now: i64) -> SummonResult<()> {
        if !self.enabled {
            return Err(SummonError::invalid(format!("banner {} is disabled", self.id)));
        }
        if !self.is_open_at(now) {
            return Err(SummonError::invalid(format!("banner {} is not active", self.id)));
        }
        if !self.runs_on(server_id) {
            return Err(SummonError::invalid(format!(
                "banner {} is not available on server {}",
                self.id, server_id
            )));
        }
        Ok(())
    }

    /// Cost options for `count` pulls, in the order the banner lists them.
    /// A requested currency the banner does not accept is an invalid request.
    pub fn cost_options(
        &self,
        count: PullCount,
        currency: Option<Currency>,
    ) -> SummonResult<Vec<(Currency, i64)>> {
        let options: Vec<(Currency, i64)> = self
            .costs
            .iter()
            .filter(|c| currency.map_or(true, |wanted| c.currency == wanted))
            .map(|c| (c.currency, c.amount(count)))
            .collect();

        if options.is_empty() {
            return Err(SummonError::invalid(match currency {
                Some(wanted) => format!("banner {} does not accept {}", self.id, wanted),
                None => format!("banner {} has no cost configured", self.id),
            }));
        }
        Ok(options)
    }
}
