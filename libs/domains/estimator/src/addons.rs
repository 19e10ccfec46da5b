//! Add-on catalogue and resolution.
//!
//! Selections are resolved in three passes so an inconsistent form still
//! prices deterministically:
//!
//! 1. eligibility: cloud-only / self-managed-only add-ons under the other
//!    hosting model cost nothing and raise a warning
//! 2. exclusive groups: of several selections sharing a group only the
//!    highest-priced one is charged
//! 3. subsumption: an add-on included by another active selection is shown at
//!    zero cost with the includer named

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;
use validator::Validate;

use crate::brackets::{TierBracket, resolve_bracket, validate_brackets};
use crate::error::{EstimatorError, EstimatorResult};
use crate::models::{Hosting, Money};
use crate::pricing::{CostCategory, LineItem, LineItemStatus};
use crate::warnings::{Warning, WarningCode};

/// Hosting models an add-on can be bought under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Eligibility {
    #[default]
    Any,
    CloudOnly,
    SelfManagedOnly,
}

impl Eligibility {
    pub fn allows(self, hosting: Hosting) -> bool {
        match self {
            Eligibility::Any => true,
            Eligibility::CloudOnly => hosting == Hosting::Cloud,
            Eligibility::SelfManagedOnly => hosting == Hosting::SelfManaged,
        }
    }
}

/// Quantity a tiered add-on is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TierBasis {
    /// The selection's own quantity
    Selection,
    /// Internal plus external users
    TotalUsers,
    ApplicationObjects,
}

/// Annual price model of an add-on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddOnPricing {
    /// Fixed fee per selected unit
    Flat { amount: Money },
    /// Fee per AO pack per selected unit
    PerAoPack { price_per_pack: Money },
    /// Share of the license subtotal
    PercentOfLicense { percent: f64 },
    Tiered {
        basis: TierBasis,
        brackets: Vec<TierBracket>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOnDefinition {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub eligibility: Eligibility,
    pub pricing: AddOnPricing,
    /// Add-ons sharing a group are mutually exclusive
    #[serde(default)]
    pub exclusive_group: Option<String>,
    /// Add-on ids whose cost this one already covers
    #[serde(default)]
    pub includes: Vec<String>,
}

impl AddOnDefinition {
    pub fn validate_definition(&self) -> EstimatorResult<()> {
        let table = format!("add_ons.{}", self.id);
        match &self.pricing {
            AddOnPricing::Flat { amount } if amount.amount < 0 => {
                Err(EstimatorError::table(table, "flat price cannot be negative"))
            }
            AddOnPricing::PerAoPack { price_per_pack } if price_per_pack.amount < 0 => {
                Err(EstimatorError::table(table, "pack price cannot be negative"))
            }
            AddOnPricing::PercentOfLicense { percent } if !(*percent >= 0.0 && percent.is_finite()) => {
                Err(EstimatorError::table(table, "license percentage must be a non-negative number"))
            }
            AddOnPricing::Tiered { brackets, .. } => validate_brackets(&table, brackets),
            _ => Ok(()),
        }
    }
}

/// A caller's pick from the add-on catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AddOnSelection {
    #[validate(length(min = 1, message = "add-on id cannot be empty"))]
    pub id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl AddOnSelection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            quantity: 1,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

/// Deployment facts an add-on price can depend on
#[derive(Debug, Clone, Copy)]
pub struct AddOnContext {
    pub hosting: Hosting,
    pub ao_packs: u64,
    pub application_objects: u64,
    pub total_users: u64,
    pub license_subtotal: Money,
}

/// Priced add-on line items plus the warnings raised while resolving them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddOnResolution {
    pub items: Vec<LineItem>,
    pub warnings: Vec<Warning>,
}

struct Candidate<'a> {
    definition: &'a AddOnDefinition,
    quantity: u32,
    list_price: Money,
    status: LineItemStatus,
}

impl Candidate<'_> {
    fn is_active(&self) -> bool {
        self.status == LineItemStatus::Charged
    }
}

/// Resolve catalogue selections into add-on line items, in selection order.
pub fn resolve_add_ons(
    selections: &[AddOnSelection],
    catalogue: &[AddOnDefinition],
    ctx: &AddOnContext,
) -> EstimatorResult<AddOnResolution> {
    let mut warnings = Vec::new();
    let mut candidates = Vec::with_capacity(selections.len());

    for (i, selection) in selections.iter().enumerate() {
        if selections[..i].iter().any(|s| s.id == selection.id) {
            return Err(EstimatorError::invalid(
                format!("add_ons[{i}].id"),
                format!("add-on `{}` is selected more than once", selection.id),
            ));
        }
        let definition = catalogue
            .iter()
            .find(|d| d.id == selection.id)
            .ok_or_else(|| EstimatorError::UnknownAddOn(selection.id.clone()))?;

        let list_price = list_price(definition, selection.quantity, ctx)?;
        let status = if definition.eligibility.allows(ctx.hosting) {
            LineItemStatus::Charged
        } else {
            debug!(add_on = %definition.id, hosting = %ctx.hosting, "Add-on not eligible");
            warnings.push(Warning::warn(
                WarningCode::AddOnIneligible,
                format!(
                    "{} is not available for {} hosting and was not charged",
                    definition.display_name, ctx.hosting
                ),
            ));
            LineItemStatus::Ineligible
        };

        candidates.push(Candidate {
            definition,
            quantity: selection.quantity,
            list_price,
            status,
        });
    }

    suppress_exclusive(&mut candidates, &mut warnings);
    apply_inclusions(&mut candidates);

    let items = candidates
        .into_iter()
        .map(|c| {
            let amount = if c.is_active() { c.list_price } else { Money::ZERO };
            LineItem {
                category: CostCategory::AddOns,
                id: c.definition.id.clone(),
                description: c.definition.display_name.clone(),
                quantity: u64::from(c.quantity),
                list_price: c.list_price,
                amount,
                status: c.status,
            }
        })
        .collect();

    Ok(AddOnResolution { items, warnings })
}

fn list_price(definition: &AddOnDefinition, quantity: u32, ctx: &AddOnContext) -> EstimatorResult<Money> {
    let quantity = u64::from(quantity);
    let price = match &definition.pricing {
        AddOnPricing::Flat { amount } => amount.times(quantity),
        AddOnPricing::PerAoPack { price_per_pack } => price_per_pack.times(ctx.ao_packs).times(quantity),
        AddOnPricing::PercentOfLicense { percent } => ctx.license_subtotal.scale(percent / 100.0),
        AddOnPricing::Tiered { basis, brackets } => {
            let basis_quantity = match basis {
                TierBasis::Selection => quantity,
                TierBasis::TotalUsers => ctx.total_users,
                TierBasis::ApplicationObjects => ctx.application_objects,
            };
            resolve_bracket(basis_quantity, brackets)
                .map_err(|_| EstimatorError::table(format!("add_ons.{}", definition.id), "bracket table is empty"))?
                .amount
        }
    };
    Ok(price)
}

/// Keep the highest-priced active member of each exclusive group; earlier
/// selections win ties.
fn suppress_exclusive(candidates: &mut [Candidate<'_>], warnings: &mut Vec<Warning>) {
    for i in 0..candidates.len() {
        let Some(group) = candidates[i].definition.exclusive_group.clone() else {
            continue;
        };
        if !candidates[i].is_active() {
            continue;
        }

        let winner = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_active() && c.definition.exclusive_group.as_deref() == Some(group.as_str()))
            .fold(None::<(usize, Money)>, |best, (j, c)| match best {
                Some((_, price)) if price >= c.list_price => best,
                _ => Some((j, c.list_price)),
            })
            .map(|(j, _)| j);

        if let Some(winner) = winner {
            let winner_id = candidates[winner].definition.id.clone();
            let winner_name = candidates[winner].definition.display_name.clone();
            for (j, candidate) in candidates.iter_mut().enumerate() {
                if j == winner
                    || !candidate.is_active()
                    || candidate.definition.exclusive_group.as_deref() != Some(group.as_str())
                {
                    continue;
                }
                debug!(add_on = %candidate.definition.id, by = %winner_id, "Add-on suppressed");
                warnings.push(Warning::warn(
                    WarningCode::AddOnSuppressed,
                    format!(
                        "{} and {} cannot be combined; {} was dropped in favour of {}",
                        candidate.definition.display_name,
                        winner_name,
                        candidate.definition.display_name,
                        winner_name
                    ),
                ));
                candidate.status = LineItemStatus::Suppressed {
                    by: winner_id.clone(),
                };
            }
        }
    }
}

fn apply_inclusions(candidates: &mut [Candidate<'_>]) {
    let includers: Vec<(String, Vec<String>)> = candidates
        .iter()
        .filter(|c| c.is_active() && !c.definition.includes.is_empty())
        .map(|c| (c.definition.id.clone(), c.definition.includes.clone()))
        .collect();

    for candidate in candidates.iter_mut().filter(|c| c.is_active()) {
        if let Some((by, _)) = includers
            .iter()
            .find(|(id, includes)| *id != candidate.definition.id && includes.contains(&candidate.definition.id))
        {
            debug!(add_on = %candidate.definition.id, by = %by, "Add-on included");
            candidate.status = LineItemStatus::Included { by: by.clone() };
        }
    }
}
