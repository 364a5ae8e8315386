use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SummonError, SummonResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Gems,
    Tickets,
    /// Mythic scrolls. Earned through the fused pull ledger, never bought.
    Scrolls,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Gems => "gems",
            Currency::Tickets => "tickets",
            Currency::Scrolls => "scrolls",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An amount taken from the player for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub currency: Currency,
    pub amount: i64,
}

/// Purchasable balances of a player on one server. Scrolls live in the
/// mythic ledger instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub gems: i64,
    pub tickets: i64,
}

impl Wallet {
    pub fn balance(&self, currency: Currency) -> Option<i64> {
        match currency {
            Currency::Gems => Some(self.gems),
            Currency::Tickets => Some(self.tickets),
            Currency::Scrolls => None,
        }
    }

    pub fn credit(&mut self, currency: Currency, amount: i64) -> SummonResult<()> {
        if amount < 0 {
            return Err(SummonError::invalid("credit amount must be non-negative"));
        }
        match currency {
            Currency::Gems => self.gems += amount,
            Currency::Tickets => self.tickets += amount,
            Currency::Scrolls => {
                return Err(SummonError::invalid("scrolls are only earned through pulls"));
            }
        }
        Ok(())
    }

    /// Takes `amount` of `currency` or leaves the wallet untouched.
    pub fn debit(&mut self, currency: Currency, amount: i64) -> SummonResult<()> {
        let slot = match currency {
            Currency::Gems => &mut self.gems,
            Currency::Tickets => &mut self.tickets,
            Currency::Scrolls => {
                return Err(SummonError::invalid("scrolls are not held in the wallet"));
            }
        };
        if *slot < amount {
            return Err(SummonError::InsufficientResources {
                currency,
                required: amount,
                available: *slot,
            });
        }
        *slot -= amount;
        Ok(())
    }
}
