use rand::Rng;

use crate::banner::{PityConfig, RateTable};
use crate::mythic::MythicPity;
use crate::pity::PlayerPityState;
use crate::rarity::Rarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollOutcome {
    pub rarity: Rarity,
    pub pity_triggered: bool,
}

/// Maps `x` in `[0, 100)` onto the rate table, rarest tier first. Whatever a
/// tolerated rounding gap leaves above the table's sum falls to Common.
pub fn rarity_at(rates: &RateTable, x: f64) -> Rarity {
    let mut upper = 0.0;
    for rarity in [Rarity::Legendary, Rarity::Epic, Rarity::Rare] {
        upper += rates.rate(rarity);
        if x < upper {
            return rarity;
        }
    }
    Rarity::Common
}

/// One draw on a regular banner.
///
/// A due Legendary pity overrides the roll entirely. A due Epic pity only
/// lifts a natural Common or Rare up to Epic.
pub fn roll_standard<R: Rng + ?Sized>(
    rates: &RateTable,
    pity: &PlayerPityState,
    config: &PityConfig,
    rng: &mut R,
) -> RollOutcome {
    if pity.legendary_due(config) {
        return RollOutcome { rarity: Rarity::Legendary, pity_triggered: true };
    }

    let rarity = rarity_at(rates, rng.random_range(0.0..100.0));
    if rarity < Rarity::Epic && pity.epic_due(config) {
        return RollOutcome { rarity: Rarity::Epic, pity_triggered: true };
    }
    RollOutcome { rarity, pity_triggered: false }
}

/// One draw on the Mythic banner: Mythic with `rates.mythic` percent,
/// otherwise Legendary. Independent of the regular rate table.
pub fn roll_mythic<R: Rng + ?Sized>(
    rates: &RateTable,
    ledger: &MythicPity,
    rng: &mut R,
) -> RollOutcome {
    if ledger.mythic_due() {
        return RollOutcome { rarity: Rarity::Mythic, pity_triggered: true };
    }

    let x: f64 = rng.random_range(0.0..100.0);
    let rarity = if x < rates.mythic { Rarity::Mythic } else { Rarity::Legendary };
    RollOutcome { rarity, pity_triggered: false }
}
