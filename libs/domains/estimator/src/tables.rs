//! Pricing tables supplied by the settings surface.
//!
//! The engine treats the shape as fixed and every value as external data; it
//! never mutates a table. [`PricingTables::standard`] is the shipped default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::addons::{AddOnDefinition, AddOnPricing, Eligibility, TierBasis};
use crate::brackets::{TierBracket, validate_brackets};
use crate::catalogue::Distribution;
use crate::error::{EstimatorError, EstimatorResult};
use crate::models::{Currency, Hosting, Money};

/// Annual platform edition fee per hosting model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditionFees {
    pub cloud: Money,
    pub self_managed: Money,
}

impl EditionFees {
    pub fn fee(&self, hosting: Hosting) -> Money {
        match hosting {
            Hosting::Cloud => self.cloud,
            Hosting::SelfManaged => self.self_managed,
        }
    }
}

/// License pricing: edition fee, AO packs and user tiers (all annual)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseTable {
    pub edition: EditionFees,
    pub ao_pack_size: u32,
    pub ao_pack_price: Money,
    pub unlimited_users_per_ao_pack: Money,
    pub internal_users: Vec<TierBracket>,
    pub external_users: Vec<TierBracket>,
}

/// Annual rate card entry for a professional or managed service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRate {
    pub id: String,
    pub display_name: String,
    pub unit: String,
    #[serde(default)]
    pub regional_rates: BTreeMap<String, Money>,
    #[serde(default)]
    pub default_rate: Option<Money>,
}

impl ServiceRate {
    /// Regional rate, falling back to the default rate
    pub fn rate(&self, region: &str) -> EstimatorResult<Money> {
        self.regional_rates
            .get(region)
            .copied()
            .or(self.default_rate)
            .ok_or_else(|| EstimatorError::MissingServiceRate {
                service: self.id.clone(),
                region: region.to_string(),
            })
    }
}

/// Monthly unit rates for self-managed infrastructure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureRates {
    pub vcpu_monthly: f64,
    pub ram_gb_monthly: f64,
    pub disk_gb_monthly: f64,
    pub backup_gb_monthly: f64,
    #[serde(default)]
    pub region_multipliers: BTreeMap<String, f64>,
    /// Monthly fee per managed control plane cluster
    #[serde(default)]
    pub managed_cluster_fees: BTreeMap<Distribution, Money>,
}

impl InfrastructureRates {
    /// Multiplier for `region`.
    ///
    /// A region missing from the table prices at 1.0; the second element is
    /// `false` in that case so the caller can report it.
    pub fn region_multiplier(&self, region: &str) -> (f64, bool) {
        match self.region_multipliers.get(region) {
            Some(multiplier) => (*multiplier, true),
            None => (1.0, false),
        }
    }

    pub fn managed_cluster_fee(&self, distribution: Distribution) -> Money {
        self.managed_cluster_fees
            .get(&distribution)
            .copied()
            .unwrap_or(Money::ZERO)
    }
}

/// Complete pricing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTables {
    pub currency: Currency,
    pub license: LicenseTable,
    pub add_ons: Vec<AddOnDefinition>,
    pub services: Vec<ServiceRate>,
    pub infrastructure: InfrastructureRates,
}

impl Default for PricingTables {
    fn default() -> Self {
        Self::standard()
    }
}

impl PricingTables {
    pub fn add_on(&self, id: &str) -> Option<&AddOnDefinition> {
        self.add_ons.iter().find(|a| a.id == id)
    }

    pub fn service(&self, id: &str) -> Option<&ServiceRate> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Reject tables that cannot be priced against.
    pub fn validate(&self) -> EstimatorResult<()> {
        let license = &self.license;
        if license.ao_pack_size == 0 {
            return Err(EstimatorError::table("license.ao_pack_size", "pack size must be at least 1"));
        }
        for (name, money) in [
            ("license.edition.cloud", license.edition.cloud),
            ("license.edition.self_managed", license.edition.self_managed),
            ("license.ao_pack_price", license.ao_pack_price),
            ("license.unlimited_users_per_ao_pack", license.unlimited_users_per_ao_pack),
        ] {
            if money.amount < 0 {
                return Err(EstimatorError::table(name, "price cannot be negative"));
            }
        }
        validate_brackets("license.internal_users", &license.internal_users)?;
        validate_brackets("license.external_users", &license.external_users)?;

        for (i, add_on) in self.add_ons.iter().enumerate() {
            if self.add_ons[..i].iter().any(|a| a.id == add_on.id) {
                return Err(EstimatorError::table("add_ons", format!("duplicate add-on id `{}`", add_on.id)));
            }
            add_on.validate_definition()?;
            if let Some(missing) = add_on.includes.iter().find(|id| self.add_on(id).is_none()) {
                return Err(EstimatorError::table(
                    format!("add_ons.{}", add_on.id),
                    format!("includes unknown add-on `{missing}`"),
                ));
            }
        }

        for service in &self.services {
            let negative = service
                .regional_rates
                .values()
                .chain(service.default_rate.iter())
                .any(|rate| rate.amount < 0);
            if negative {
                return Err(EstimatorError::table(
                    format!("services.{}", service.id),
                    "rate cannot be negative",
                ));
            }
        }

        let infra = &self.infrastructure;
        for (name, rate) in [
            ("infrastructure.vcpu_monthly", infra.vcpu_monthly),
            ("infrastructure.ram_gb_monthly", infra.ram_gb_monthly),
            ("infrastructure.disk_gb_monthly", infra.disk_gb_monthly),
            ("infrastructure.backup_gb_monthly", infra.backup_gb_monthly),
        ] {
            if !(rate >= 0.0 && rate.is_finite()) {
                return Err(EstimatorError::table(name, "rate must be a non-negative number"));
            }
        }
        if let Some((region, _)) = infra
            .region_multipliers
            .iter()
            .find(|(_, m)| !(**m > 0.0 && m.is_finite()))
        {
            return Err(EstimatorError::table(
                "infrastructure.region_multipliers",
                format!("multiplier for `{region}` must be positive"),
            ));
        }

        debug!(
            add_ons = self.add_ons.len(),
            services = self.services.len(),
            "Pricing tables validated"
        );
        Ok(())
    }

    /// Default catalogue in USD
    pub fn standard() -> Self {
        let usd = Money::from_decimal;

        Self {
            currency: Currency::Usd,
            license: LicenseTable {
                edition: EditionFees {
                    cloud: usd(36_300.0),
                    self_managed: usd(30_250.0),
                },
                ao_pack_size: 150,
                ao_pack_price: usd(18_150.0),
                unlimited_users_per_ao_pack: usd(60_500.0),
                internal_users: vec![
                    TierBracket::flat(0, Some(100), Money::ZERO),
                    TierBracket::per_pack(101, Some(1_000), usd(6_050.0), 100),
                    TierBracket::per_pack(1_001, None, usd(3_025.0), 100),
                ],
                external_users: vec![
                    TierBracket::per_pack(0, Some(10_000), usd(4_840.0), 1_000),
                    TierBracket::per_pack(10_001, Some(100_000), usd(2_420.0), 1_000),
                    TierBracket::per_pack(100_001, None, usd(1_210.0), 1_000),
                ],
            },
            add_ons: standard_add_ons(),
            services: vec![
                ServiceRate {
                    id: "success_program".to_string(),
                    display_name: "Customer Success Program".to_string(),
                    unit: "program".to_string(),
                    regional_rates: BTreeMap::from([
                        ("us-east".to_string(), usd(24_200.0)),
                        ("eu-west".to_string(), usd(26_620.0)),
                    ]),
                    default_rate: Some(usd(24_200.0)),
                },
                ServiceRate {
                    id: "expert_days".to_string(),
                    display_name: "Expert services".to_string(),
                    unit: "day".to_string(),
                    regional_rates: BTreeMap::from([
                        ("us-east".to_string(), usd(2_200.0)),
                        ("eu-west".to_string(), usd(1_980.0)),
                        ("ap-southeast".to_string(), usd(1_760.0)),
                    ]),
                    default_rate: Some(usd(2_200.0)),
                },
                ServiceRate {
                    id: "training_seats".to_string(),
                    display_name: "Instructor-led training".to_string(),
                    unit: "seat".to_string(),
                    regional_rates: BTreeMap::from([
                        ("us-east".to_string(), usd(1_500.0)),
                        ("eu-west".to_string(), usd(1_350.0)),
                    ]),
                    default_rate: None,
                },
            ],
            infrastructure: InfrastructureRates {
                vcpu_monthly: 25.0,
                ram_gb_monthly: 3.5,
                disk_gb_monthly: 0.10,
                backup_gb_monthly: 0.05,
                region_multipliers: BTreeMap::from([
                    ("us-east".to_string(), 1.0),
                    ("us-west".to_string(), 1.05),
                    ("eu-west".to_string(), 1.1),
                    ("eu-central".to_string(), 1.12),
                    ("ap-southeast".to_string(), 1.2),
                ]),
                managed_cluster_fees: BTreeMap::from([
                    (Distribution::Eks, usd(73.0)),
                    (Distribution::Aks, usd(73.0)),
                    (Distribution::Gke, usd(73.0)),
                ]),
            },
        }
    }
}

fn standard_add_ons() -> Vec<AddOnDefinition> {
    let usd = Money::from_decimal;
    let add_on = |id: &str, name: &str, eligibility: Eligibility, pricing: AddOnPricing| AddOnDefinition {
        id: id.to_string(),
        display_name: name.to_string(),
        eligibility,
        pricing,
        exclusive_group: None,
        includes: Vec::new(),
    };

    vec![
        AddOnDefinition {
            exclusive_group: Some("support".to_string()),
            ..add_on(
                "premium_support",
                "Premium Support",
                Eligibility::Any,
                AddOnPricing::PercentOfLicense { percent: 10.0 },
            )
        },
        AddOnDefinition {
            exclusive_group: Some("support".to_string()),
            ..add_on(
                "elite_support",
                "Elite Support",
                Eligibility::Any,
                AddOnPricing::PercentOfLicense { percent: 20.0 },
            )
        },
        add_on(
            "high_availability",
            "High Availability",
            Eligibility::CloudOnly,
            AddOnPricing::PerAoPack {
                price_per_pack: usd(4_840.0),
            },
        ),
        AddOnDefinition {
            includes: vec!["high_availability".to_string(), "app_shield".to_string()],
            ..add_on(
                "sentry",
                "Sentry",
                Eligibility::CloudOnly,
                AddOnPricing::PerAoPack {
                    price_per_pack: usd(12_100.0),
                },
            )
        },
        add_on(
            "app_shield",
            "AppShield",
            Eligibility::Any,
            AddOnPricing::Tiered {
                basis: TierBasis::TotalUsers,
                brackets: vec![
                    TierBracket::flat(0, Some(1_000), usd(18_150.0)),
                    TierBracket::flat(1_001, Some(5_000), usd(36_300.0)),
                    TierBracket::flat(5_001, Some(20_000), usd(60_500.0)),
                    TierBracket::flat(20_001, None, usd(121_000.0)),
                ],
            },
        ),
        add_on(
            "log_streaming",
            "Log Streaming",
            Eligibility::CloudOnly,
            AddOnPricing::Flat { amount: usd(7_260.0) },
        ),
        add_on(
            "database_replica",
            "Database Replica",
            Eligibility::CloudOnly,
            AddOnPricing::Flat {
                amount: usd(12_100.0),
            },
        ),
        add_on(
            "load_test_environment",
            "Load Test Environment",
            Eligibility::CloudOnly,
            AddOnPricing::Flat { amount: usd(9_680.0) },
        ),
        add_on(
            "private_gateway",
            "Private Gateway",
            Eligibility::CloudOnly,
            AddOnPricing::Flat { amount: usd(6_050.0) },
        ),
        add_on(
            "extra_environment",
            "Additional Environment",
            Eligibility::Any,
            AddOnPricing::Tiered {
                basis: TierBasis::Selection,
                brackets: vec![
                    TierBracket::per_pack(0, Some(2), usd(12_100.0), 1),
                    TierBracket::per_pack(3, None, usd(9_680.0), 1),
                ],
            },
        ),
        add_on(
            "dr_environment",
            "Disaster Recovery Environment",
            Eligibility::SelfManagedOnly,
            AddOnPricing::Flat {
                amount: usd(24_200.0),
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_tables_are_valid() {
        assert!(PricingTables::standard().validate().is_ok());
    }

    #[test]
    fn test_service_rate_falls_back_to_default() {
        let tables = PricingTables::standard();
        let expert = tables.service("expert_days").unwrap();
        assert_eq!(expert.rate("eu-west").unwrap(), Money::from_decimal(1_980.0));
        assert_eq!(expert.rate("mars-1").unwrap(), Money::from_decimal(2_200.0));

        let training = tables.service("training_seats").unwrap();
        assert_eq!(
            training.rate("mars-1").unwrap_err(),
            EstimatorError::MissingServiceRate {
                service: "training_seats".to_string(),
                region: "mars-1".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_region_multiplier_defaults_to_one() {
        let rates = PricingTables::standard().infrastructure;
        assert_eq!(rates.region_multiplier("eu-west"), (1.1, true));
        assert_eq!(rates.region_multiplier("mars-1"), (1.0, false));
    }

    #[test]
    fn test_validate_rejects_broken_user_brackets() {
        let mut tables = PricingTables::standard();
        tables.license.internal_users[1].min = 150;
        let err = tables.validate().unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::InvalidPricingTable { ref table, .. } if table == "license.internal_users"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_inclusion() {
        let mut tables = PricingTables::standard();
        tables.add_ons.retain(|a| a.id != "app_shield");
        assert!(tables.validate().is_err());
    }

    #[test]
    fn test_tables_round_trip_through_json() {
        let tables = PricingTables::standard();
        let json = serde_json::to_string(&tables).unwrap();
        let back: PricingTables = serde_json::from_str(&json).unwrap();
        assert_eq!(back.license, tables.license);
        assert_eq!(back.add_ons, tables.add_ons);
        assert_eq!(
            back.infrastructure.managed_cluster_fee(Distribution::Eks),
            Money::from_decimal(73.0)
        );
        assert!(back.validate().is_ok());
    }
}
