use rand::Rng;

use crate::banner::{FocusEntry, ResolvedBanner};
use crate::error::{SummonError, SummonResult};
use crate::hero::Hero;
use crate::rarity::Rarity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub hero: Hero,
    pub is_focus: bool,
}

/// Picks from `entries` proportionally to their focus chance. All-zero
/// weights degrade to a uniform pick.
fn pick_weighted<'a, R: Rng + ?Sized>(entries: &[&'a FocusEntry], rng: &mut R) -> &'a FocusEntry {
    let total: f64 = entries.iter().map(|e| e.chance).sum();
    if total <= 0.0 {
        return entries[rng.random_range(0..entries.len())];
    }

    let mut target = rng.random_range(0.0..total);
    for entry in entries.iter().copied() {
        if target < entry.chance {
            return entry;
        }
        target -= entry.chance;
    }
    entries[entries.len() - 1]
}

/// Resolves the hero for an already rolled rarity.
pub fn select_hero<R: Rng + ?Sized>(
    banner: &ResolvedBanner,
    rarity: Rarity,
    pity_triggered: bool,
    rng: &mut R,
) -> SummonResult<Selection> {
    let pool = banner.pool(rarity).ok_or_else(|| {
        SummonError::config(format!(
            "banner {}: no {} heroes to select from",
            banner.banner.id, rarity
        ))
    })?;

    if pity_triggered {
        let guaranteed: Vec<&FocusEntry> = pool.focus.iter().filter(|f| f.guaranteed).collect();
        if !guaranteed.is_empty() {
            let entry = pick_weighted(&guaranteed, rng);
            return Ok(Selection { hero: entry.hero.clone(), is_focus: true });
        }
    }

    if !pool.focus.is_empty() {
        let y: f64 = rng.random_range(0.0..1.0);
        if y < pool.focus_total() || pool.others.is_empty() {
            let focus: Vec<&FocusEntry> = pool.focus.iter().collect();
            let entry = pick_weighted(&focus, rng);
            return Ok(Selection { hero: entry.hero.clone(), is_focus: true });
        }
    }

    if pool.others.is_empty() {
        return Err(SummonError::config(format!(
            "banner {}: no non-focus {} heroes to select from",
            banner.banner.id, rarity
        )));
    }
    let hero = &pool.others[rng.random_range(0..pool.others.len())];
    Ok(Selection { hero: hero.clone(), is_focus: false })
}
