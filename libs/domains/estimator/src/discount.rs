//! Discount & total aggregation.
//!
//! Works on resolved annual subtotals only; bracket resolution never sees a
//! discount.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{EstimatorError, EstimatorResult};
use crate::models::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
}

/// Subtotal(s) a discount applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscountScope {
    #[default]
    Total,
    LicenseOnly,
    AddOnsOnly,
    ServicesOnly,
}

/// A single discount. `value` is a percentage for [`DiscountKind::Percentage`]
/// and an amount in currency units for [`DiscountKind::FixedAmount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    #[serde(default)]
    pub scope: DiscountScope,
    pub value: f64,
    #[serde(default)]
    pub description: Option<String>,
}

impl Discount {
    pub fn percentage(value: f64, scope: DiscountScope) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            scope,
            value,
            description: None,
        }
    }

    pub fn fixed(value: f64, scope: DiscountScope) -> Self {
        Self {
            kind: DiscountKind::FixedAmount,
            scope,
            value,
            description: None,
        }
    }

    pub fn validate_config(&self) -> EstimatorResult<()> {
        let ok = match self.kind {
            DiscountKind::Percentage => (0.0..=100.0).contains(&self.value),
            DiscountKind::FixedAmount => self.value >= 0.0 && self.value.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(EstimatorError::invalid(
                "discount.value",
                match self.kind {
                    DiscountKind::Percentage => "percentage must be between 0 and 100",
                    DiscountKind::FixedAmount => "fixed amount cannot be negative",
                },
            ))
        }
    }

    fn label(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }
        let target = match self.scope {
            DiscountScope::Total => "total",
            DiscountScope::LicenseOnly => "license",
            DiscountScope::AddOnsOnly => "add-ons",
            DiscountScope::ServicesOnly => "services",
        };
        match self.kind {
            DiscountKind::Percentage => format!("{}% off {target}", self.value),
            DiscountKind::FixedAmount => {
                format!("{} off {target}", Money::from_decimal(self.value))
            }
        }
    }
}

/// Annual subtotals per cost category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Subtotals {
    pub license: Money,
    pub add_ons: Money,
    pub services: Money,
    pub infrastructure: Money,
}

impl Subtotals {
    pub fn gross(&self) -> Money {
        self.license + self.add_ons + self.services + self.infrastructure
    }

    pub fn scoped(&self, scope: DiscountScope) -> Money {
        match scope {
            DiscountScope::Total => self.gross(),
            DiscountScope::LicenseOnly => self.license,
            DiscountScope::AddOnsOnly => self.add_ons,
            DiscountScope::ServicesOnly => self.services,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub amount: Money,
    pub description: Option<String>,
}

/// Discount amount for the given subtotals, capped at the scoped subtotal
/// and never negative.
pub fn apply_discount(subtotals: &Subtotals, discount: Option<&Discount>) -> EstimatorResult<AppliedDiscount> {
    let Some(discount) = discount else {
        return Ok(AppliedDiscount::default());
    };
    discount.validate_config()?;

    let scoped = subtotals.scoped(discount.scope).max(Money::ZERO);
    let raw = match discount.kind {
        DiscountKind::Percentage => scoped.scale(discount.value / 100.0),
        DiscountKind::FixedAmount => Money::from_decimal(discount.value),
    };

    Ok(AppliedDiscount {
        amount: raw.clamp(Money::ZERO, scoped),
        description: Some(discount.label()),
    })
}

/// Gross / net totals and flat multi-year roll-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub gross: Money,
    pub discount: Money,
    pub net: Money,
    pub per_month: Money,
    pub annual: Money,
    pub three_year: Money,
    pub five_year: Money,
}

impl Totals {
    pub fn new(subtotals: &Subtotals, discount: Money) -> Self {
        let gross = subtotals.gross();
        let net = gross - discount;
        Self {
            gross,
            discount,
            net,
            per_month: net.divide(12),
            annual: net,
            three_year: net.times(3),
            five_year: net.times(5),
        }
    }
}
