use std::collections::{BTreeMap, BTreeSet};

use crate::banner::{Banner, HeroPool};
use crate::error::{SummonError, SummonResult};
use crate::hero::{Hero, HeroCatalog};
use crate::rarity::Rarity;
use crate::wallet::Currency;

/// Allowed drift of the Common..Legendary sum away from 100, in percent points.
pub const RATE_SUM_TOLERANCE: f64 = 0.1;

const FOCUS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct FocusEntry {
    pub hero: Hero,
    pub chance: f64,
    pub guaranteed: bool,
}

/// The heroes of one rarity tier on a banner, split by focus.
#[derive(Debug, Clone, Default)]
pub struct RarityPool {
    pub focus: Vec<FocusEntry>,
    pub others: Vec<Hero>,
}

impl RarityPool {
    pub fn is_empty(&self) -> bool {
        self.focus.is_empty() && self.others.is_empty()
    }

    pub fn focus_total(&self) -> f64 {
        self.focus.iter().map(|f| f.chance).sum::<f64>().min(1.0)
    }

    pub fn contains(&self, hero_id: &str) -> bool {
        self.focus.iter().any(|f| f.hero.id == hero_id)
            || self.others.iter().any(|h| h.id == hero_id)
    }
}

/// A banner checked against the hero catalog, with its pool split per rarity.
#[derive(Debug, Clone)]
pub struct ResolvedBanner {
    pub banner: Banner,
    pools: BTreeMap<Rarity, RarityPool>,
}

impl ResolvedBanner {
    pub fn pool(&self, rarity: Rarity) -> Option<&RarityPool> {
        self.pools.get(&rarity).filter(|p| !p.is_empty())
    }

    pub fn pool_size(&self, rarity: Rarity) -> usize {
        self.pools.get(&rarity).map_or(0, |p| p.focus.len() + p.others.len())
    }
}

/// Every rarity a banner can produce, including tiers only reachable through
/// a pity override.
fn required_rarities(banner: &Banner) -> BTreeSet<Rarity> {
    let mut required = BTreeSet::new();
    if banner.is_mythic() {
        required.insert(Rarity::Mythic);
        if banner.rates.mythic < 100.0 {
            required.insert(Rarity::Legendary);
        }
        return required;
    }

    for rarity in Rarity::STANDARD {
        if banner.rates.rate(rarity) > 0.0 {
            required.insert(rarity);
        }
    }
    required.insert(Rarity::Legendary);
    if banner.pity.epic_threshold.is_some() {
        required.insert(Rarity::Epic);
    }
    required
}

fn check_rates(banner: &Banner) -> SummonResult<()> {
    let rates = banner.rates;
    for rarity in Rarity::ALL {
        let rate = rates.rate(rarity);
        if !rate.is_finite() || rate < 0.0 {
            return Err(SummonError::config(format!(
                "banner {}: {} rate must be a non-negative number, got {}",
                banner.id, rarity, rate
            )));
        }
    }

    if banner.is_mythic() {
        if rates.mythic <= 0.0 || rates.mythic > 100.0 {
            return Err(SummonError::config(format!(
                "banner {}: mythic rate must be in (0, 100], got {}",
                banner.id, rates.mythic
            )));
        }
        return Ok(());
    }

    let sum = rates.standard_sum();
    if (sum - 100.0).abs() > RATE_SUM_TOLERANCE {
        return Err(SummonError::config(format!(
            "banner {}: Common+Rare+Epic+Legendary rates sum to {}, expected 100",
            banner.id, sum
        )));
    }
    if rates.mythic != 0.0 {
        return Err(SummonError::config(format!(
            "banner {}: mythic rate is only valid on mythic banners",
            banner.id
        )));
    }
    Ok(())
}

fn check_pity(banner: &Banner) -> SummonResult<()> {
    let pity = &banner.pity;
    if pity.legendary_threshold == 0 {
        return Err(SummonError::config(format!(
            "banner {}: legendary pity threshold must be at least 1",
            banner.id
        )));
    }
    if pity.epic_threshold == Some(0) {
        return Err(SummonError::config(format!(
            "banner {}: epic pity threshold must be at least 1",
            banner.id
        )));
    }
    if pity.shared_pity && pity.pity_group.as_deref().map_or(true, |g| g.trim().is_empty()) {
        return Err(SummonError::config(format!(
            "banner {}: shared pity requires a pity group key",
            banner.id
        )));
    }
    Ok(())
}

fn check_costs(banner: &Banner) -> SummonResult<()> {
    if banner.costs.is_empty() {
        return Err(SummonError::config(format!("banner {}: no pull cost configured", banner.id)));
    }

    let mut seen = BTreeSet::new();
    for cost in &banner.costs {
        if !seen.insert(cost.currency.as_str()) {
            return Err(SummonError::config(format!(
                "banner {}: duplicate cost for {}",
                banner.id, cost.currency
            )));
        }
        if cost.single <= 0 || cost.multi <= 0 {
            return Err(SummonError::config(format!(
                "banner {}: {} cost must be positive",
                banner.id, cost.currency
            )));
        }
    }

    if banner.is_mythic() {
        let scroll_only = banner.costs.len() == 1
            && banner.costs[0].currency == Currency::Scrolls
            && banner.costs[0].single == 1
            && banner.costs[0].multi == 10;
        if !scroll_only {
            return Err(SummonError::config(format!(
                "banner {}: mythic banners cost exactly 1 scroll per pull and 10 per multi-pull",
                banner.id
            )));
        }
    } else if seen.contains(Currency::Scrolls.as_str()) {
        return Err(SummonError::config(format!(
            "banner {}: scrolls are only spendable on mythic banners",
            banner.id
        )));
    }
    Ok(())
}

fn resolve_pool<'a>(banner: &Banner, catalog: &'a HeroCatalog) -> SummonResult<Vec<&'a Hero>> {
    let candidates: Vec<&Hero> = match &banner.hero_pool {
        HeroPool::All { exclude } => catalog.iter().filter(|h| !exclude.contains(&h.id)).collect(),
        HeroPool::Explicit { hero_ids } => hero_ids
            .iter()
            .map(|id| {
                catalog.get(id).ok_or_else(|| {
                    SummonError::config(format!(
                        "banner {}: pool hero {} does not exist",
                        banner.id, id
                    ))
                })
            })
            .collect::<SummonResult<_>>()?,
    };

    Ok(candidates
        .into_iter()
        .filter(|h| banner.pool_rarities.is_empty() || banner.pool_rarities.contains(&h.rarity))
        .collect())
}

/// Checks a banner against the hero catalog and splits its pool per rarity.
///
/// Runs when a banner is saved and again on every pull, so a catalog change
/// that breaks a live banner surfaces as a configuration error instead of a
/// silently skewed draw.
pub fn validate_banner(banner: &Banner, catalog: &HeroCatalog) -> SummonResult<ResolvedBanner> {
    if banner.id.trim().is_empty() {
        return Err(SummonError::config("banner id must not be empty"));
    }
    if let Some(end) = banner.ends_at {
        if end <= banner.starts_at {
            return Err(SummonError::config(format!("banner {}: ends before it starts", banner.id)));
        }
    }
    check_rates(banner)?;
    check_pity(banner)?;
    check_costs(banner)?;

    let pool = resolve_pool(banner, catalog)?;
    let mut pools: BTreeMap<Rarity, RarityPool> = BTreeMap::new();
    let mut focus_ids = BTreeSet::new();

    for focus in &banner.focus_heroes {
        if !focus.focus_chance.is_finite() || !(0.0..=1.0).contains(&focus.focus_chance) {
            return Err(SummonError::config(format!(
                "banner {}: focus chance of {} must be within [0, 1]",
                banner.id, focus.hero_id
            )));
        }
        if !focus_ids.insert(focus.hero_id.as_str()) {
            return Err(SummonError::config(format!(
                "banner {}: focus hero {} listed twice",
                banner.id, focus.hero_id
            )));
        }
        let hero = pool.iter().find(|h| h.id == focus.hero_id).ok_or_else(|| {
            SummonError::config(format!(
                "banner {}: focus hero {} is not in the pool",
                banner.id, focus.hero_id
            ))
        })?;
        pools.entry(hero.rarity).or_default().focus.push(FocusEntry {
            hero: (*hero).clone(),
            chance: focus.focus_chance,
            guaranteed: focus.guaranteed,
        });
    }

    for hero in pool {
        if !focus_ids.contains(hero.id.as_str()) {
            pools.entry(hero.rarity).or_default().others.push(hero.clone());
        }
    }

    let required = required_rarities(banner);
    for rarity in &required {
        if pools.get(rarity).map_or(true, |p| p.is_empty()) {
            return Err(SummonError::config(format!(
                "banner {}: no {} heroes in the pool",
                banner.id, rarity
            )));
        }
    }

    for (rarity, rarity_pool) in &pools {
        if rarity_pool.focus.is_empty() {
            continue;
        }
        if !required.contains(rarity) {
            return Err(SummonError::config(format!(
                "banner {}: focus heroes of rarity {} can never be drawn",
                banner.id, rarity
            )));
        }
        let total: f64 = rarity_pool.focus.iter().map(|f| f.chance).sum();
        if total > 1.0 + FOCUS_EPSILON {
            return Err(SummonError::config(format!(
                "banner {}: {} focus chances sum to {}, above 1",
                banner.id, rarity, total
            )));
        }
        if total < 1.0 - FOCUS_EPSILON && rarity_pool.others.is_empty() {
            return Err(SummonError::config(format!(
                "banner {}: {} focus chances sum to {} but there are no other {} heroes",
                banner.id, rarity, total, rarity
            )));
        }
    }

    Ok(ResolvedBanner {
        banner: banner.clone(),
        pools,
    })
}
