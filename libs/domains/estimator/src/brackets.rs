//! Tier bracket resolution
//!
//! One primitive serves every tiered dimension: AO packs, internal and
//! external user tiers, AppShield volume tiers and quantity-tiered add-ons.

use serde::{Deserialize, Serialize};

use crate::error::{EstimatorError, EstimatorResult};
use crate::models::Money;

/// How a bracket turns a quantity into an amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BracketPrice {
    /// `ceil(quantity / pack_size) × price_per_pack`
    PerPack { price_per_pack: Money, pack_size: u32 },
    /// Fixed fee for any quantity inside the bracket
    Flat { amount: Money },
}

/// Inclusive quantity range with its price. `max: None` is the terminal
/// "and above" bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBracket {
    pub min: u64,
    pub max: Option<u64>,
    pub price: BracketPrice,
}

impl TierBracket {
    pub fn per_pack(min: u64, max: Option<u64>, price_per_pack: Money, pack_size: u32) -> Self {
        Self {
            min,
            max,
            price: BracketPrice::PerPack {
                price_per_pack,
                pack_size,
            },
        }
    }

    pub fn flat(min: u64, max: Option<u64>, amount: Money) -> Self {
        Self {
            min,
            max,
            price: BracketPrice::Flat { amount },
        }
    }

    pub fn contains(&self, quantity: u64) -> bool {
        quantity >= self.min && self.max.is_none_or(|max| quantity <= max)
    }
}

/// Outcome of [`resolve_bracket`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketResolution {
    /// Position of the chosen bracket in the table
    pub index: usize,
    pub bracket: TierBracket,
    pub pack_count: u64,
    pub amount: Money,
}

/// Price `quantity` against an ordered bracket table.
///
/// Picks the first bracket whose inclusive range holds the quantity and falls
/// back to the last bracket when the quantity is past every maximum. Only an
/// empty table is an error.
pub fn resolve_bracket(quantity: u64, brackets: &[TierBracket]) -> EstimatorResult<BracketResolution> {
    let last = brackets
        .len()
        .checked_sub(1)
        .ok_or_else(|| EstimatorError::table("brackets", "bracket table is empty"))?;
    let index = brackets
        .iter()
        .position(|b| b.contains(quantity))
        .unwrap_or(last);
    let bracket = brackets[index];

    let (pack_count, amount) = match bracket.price {
        BracketPrice::PerPack {
            price_per_pack,
            pack_size,
        } => {
            let packs = pack_count(quantity, pack_size);
            (packs, price_per_pack.times(packs))
        }
        BracketPrice::Flat { amount } => (1, amount),
    };

    Ok(BracketResolution {
        index,
        bracket,
        pack_count,
        amount,
    })
}

/// Whole packs needed for `quantity`; partial packs round up
pub fn pack_count(quantity: u64, pack_size: u32) -> u64 {
    quantity.div_ceil(u64::from(pack_size.max(1)))
}

/// Check that a bracket table partitions `0..` into contiguous ranges.
pub fn validate_brackets(table: &str, brackets: &[TierBracket]) -> EstimatorResult<()> {
    let Some(first) = brackets.first() else {
        return Err(EstimatorError::table(table, "bracket table is empty"));
    };
    if first.min != 0 {
        return Err(EstimatorError::table(
            table,
            format!("first bracket must start at 0, starts at {}", first.min),
        ));
    }

    for (i, bracket) in brackets.iter().enumerate() {
        match bracket.price {
            BracketPrice::PerPack {
                price_per_pack,
                pack_size,
            } => {
                if pack_size == 0 {
                    return Err(EstimatorError::table(
                        table,
                        format!("bracket {i} has a zero pack size"),
                    ));
                }
                if price_per_pack.amount < 0 {
                    return Err(EstimatorError::table(table, format!("bracket {i} has a negative price")));
                }
            }
            BracketPrice::Flat { amount } => {
                if amount.amount < 0 {
                    return Err(EstimatorError::table(table, format!("bracket {i} has a negative price")));
                }
            }
        }

        match (bracket.max, brackets.get(i + 1)) {
            (Some(max), _) if max < bracket.min => {
                return Err(EstimatorError::table(
                    table,
                    format!("bracket {i} ends ({max}) before it starts ({})", bracket.min),
                ));
            }
            (Some(max), Some(next)) if next.min != max + 1 => {
                return Err(EstimatorError::table(
                    table,
                    format!(
                        "bracket {} must start at {} to follow bracket {i}, starts at {}",
                        i + 1,
                        max + 1,
                        next.min
                    ),
                ));
            }
            (None, Some(_)) => {
                return Err(EstimatorError::table(
                    table,
                    format!("open-ended bracket {i} must be the last one"),
                ));
            }
            _ => {}
        }
    }

    Ok(())
}
