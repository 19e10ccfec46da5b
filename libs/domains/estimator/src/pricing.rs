//! Tiered pricing of a sized deployment.
//!
//! ```text
//! license        = edition fee + internal users + external users
//! add-ons        = AO packs + unlimited users + catalogue selections
//! services       = quantity × regional rate
//! infrastructure = 12 × region multiplier × monthly unit rates × provisioned totals
//!                  + 12 × managed cluster fee × clusters          (self-managed only)
//! ```
//!
//! All subtotals are annual. The discount is applied afterwards, see
//! [`crate::discount`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;
use tracing::{debug, instrument};
use validator::Validate;

use crate::addons::{AddOnContext, AddOnSelection, resolve_add_ons};
use crate::brackets::{pack_count, resolve_bracket};
use crate::discount::{AppliedDiscount, Discount, Subtotals, Totals, apply_discount};
use crate::error::{EstimatorError, EstimatorResult};
use crate::models::{Currency, Hosting, Money};
use crate::sizing::SizingResult;
use crate::tables::PricingTables;
use crate::warnings::{Warning, WarningCode};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Line-item id the user tiers report as their includer
pub const UNLIMITED_USERS_ID: &str = "unlimited_users";

/// Cost category of a line item, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CostCategory {
    License,
    AddOns,
    Services,
    Infrastructure,
    Discount,
}

/// Why a line item costs what it costs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItemStatus {
    #[default]
    Charged,
    /// Covered by another selection
    Included { by: String },
    /// Not available for the chosen hosting model
    Ineligible,
    /// Dropped in favour of a mutually exclusive selection
    Suppressed { by: String },
}

/// One auditable row of the cost breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub category: CostCategory,
    pub id: String,
    pub description: String,
    pub quantity: u64,
    /// Amount before inclusion / eligibility / exclusion rules
    pub list_price: Money,
    /// Amount actually charged; negative for the discount row
    pub amount: Money,
    pub status: LineItemStatus,
}

impl LineItem {
    fn charged(category: CostCategory, id: &str, description: impl Into<String>, quantity: u64, amount: Money) -> Self {
        Self {
            category,
            id: id.to_string(),
            description: description.into(),
            quantity,
            list_price: amount,
            amount,
            status: LineItemStatus::Charged,
        }
    }

    fn included(mut self, by: &str) -> Self {
        self.amount = Money::ZERO;
        self.status = LineItemStatus::Included { by: by.to_string() };
        self
    }
}

/// Quantity of a rate-card service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ServiceSelection {
    #[validate(length(min = 1, message = "service id cannot be empty"))]
    pub id: String,
    pub quantity: u32,
}

/// Platform and commercial choices of a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeploymentConfig {
    pub hosting: Hosting,
    #[validate(length(min = 1, message = "region cannot be empty"))]
    pub region: String,
    pub application_objects: u32,
    pub internal_users: u32,
    pub external_users: u32,
    pub use_unlimited_users: bool,
    #[validate(nested)]
    pub add_ons: Vec<AddOnSelection>,
    #[validate(nested)]
    pub services: Vec<ServiceSelection>,
    pub discount: Option<Discount>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            hosting: Hosting::default(),
            region: "us-east".to_string(),
            application_objects: 0,
            internal_users: 100,
            external_users: 0,
            use_unlimited_users: false,
            add_ons: Vec::new(),
            services: Vec::new(),
            discount: None,
        }
    }
}

impl DeploymentConfig {
    /// AO packs needed for the configured application objects
    pub fn ao_packs(&self, pack_size: u32) -> u64 {
        pack_count(u64::from(self.application_objects), pack_size)
    }

    pub fn total_users(&self) -> u64 {
        u64::from(self.internal_users) + u64::from(self.external_users)
    }

    pub fn validate_config(&self) -> EstimatorResult<()> {
        self.validate()
            .map_err(|e| EstimatorError::from_validation("", &e))?;
        if let Some(discount) = &self.discount {
            discount.validate_config()?;
        }
        Ok(())
    }
}

/// Per-category cost maps keyed by line-item id
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryCosts {
    pub license: BTreeMap<String, Money>,
    pub add_ons: BTreeMap<String, Money>,
    pub services: BTreeMap<String, Money>,
    pub infrastructure: BTreeMap<String, Money>,
}

impl CategoryCosts {
    fn from_items(items: &[LineItem]) -> Self {
        let mut costs = Self::default();
        for item in items {
            let map = match item.category {
                CostCategory::License => &mut costs.license,
                CostCategory::AddOns => &mut costs.add_ons,
                CostCategory::Services => &mut costs.services,
                CostCategory::Infrastructure => &mut costs.infrastructure,
                CostCategory::Discount => continue,
            };
            map.insert(item.id.clone(), item.amount);
        }
        costs
    }
}

/// Read-only pricing snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub currency: Currency,
    pub hosting: Hosting,
    pub region: String,
    pub ao_packs: u64,
    pub costs: CategoryCosts,
    pub subtotals: Subtotals,
    pub discount: AppliedDiscount,
    pub totals: Totals,
    pub warnings: Vec<Warning>,
    pub line_items: Vec<LineItem>,
}

/// Price a sized deployment against the pricing tables.
#[instrument(skip_all, fields(hosting = %deployment.hosting, region = %deployment.region))]
pub fn compute_pricing(
    sizing: &SizingResult,
    deployment: &DeploymentConfig,
    tables: &PricingTables,
) -> EstimatorResult<PricingResult> {
    tables.validate()?;
    deployment.validate_config()?;

    let mut warnings = Vec::new();
    let ao_packs = deployment.ao_packs(tables.license.ao_pack_size);

    let license_items = license_items(deployment, tables)?;
    let license_subtotal: Money = license_items.iter().map(|i| i.amount).sum();

    let mut add_on_items = pack_items(deployment, tables, ao_packs);
    let resolution = resolve_add_ons(
        &deployment.add_ons,
        &tables.add_ons,
        &AddOnContext {
            hosting: deployment.hosting,
            ao_packs,
            application_objects: u64::from(deployment.application_objects),
            total_users: deployment.total_users(),
            license_subtotal,
        },
    )?;
    add_on_items.extend(resolution.items);
    warnings.extend(resolution.warnings);

    let service_items = service_items(deployment, tables)?;
    let infrastructure_items = infrastructure_items(sizing, deployment, tables, &mut warnings);

    let mut line_items: Vec<LineItem> = license_items
        .into_iter()
        .chain(add_on_items)
        .chain(service_items)
        .chain(infrastructure_items)
        .collect();

    let subtotal = |category: CostCategory| -> Money {
        line_items
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.amount)
            .sum()
    };
    let subtotals = Subtotals {
        license: subtotal(CostCategory::License),
        add_ons: subtotal(CostCategory::AddOns),
        services: subtotal(CostCategory::Services),
        infrastructure: subtotal(CostCategory::Infrastructure),
    };

    let discount = apply_discount(&subtotals, deployment.discount.as_ref())?;
    let costs = CategoryCosts::from_items(&line_items);
    if !discount.amount.is_zero() {
        line_items.push(LineItem {
            category: CostCategory::Discount,
            id: "discount".to_string(),
            description: discount.description.clone().unwrap_or_default(),
            quantity: 1,
            list_price: Money::ZERO - discount.amount,
            amount: Money::ZERO - discount.amount,
            status: LineItemStatus::Charged,
        });
    }
    let totals = Totals::new(&subtotals, discount.amount);

    debug!(
        gross = %totals.gross,
        discount = %totals.discount,
        net = %totals.net,
        line_items = line_items.len(),
        "Computed pricing"
    );

    Ok(PricingResult {
        currency: tables.currency,
        hosting: deployment.hosting,
        region: deployment.region.clone(),
        ao_packs,
        costs,
        subtotals,
        discount,
        totals,
        warnings,
        line_items,
    })
}

fn license_items(deployment: &DeploymentConfig, tables: &PricingTables) -> EstimatorResult<Vec<LineItem>> {
    let license = &tables.license;
    let edition = LineItem::charged(
        CostCategory::License,
        "edition",
        format!("Platform edition ({})", deployment.hosting),
        1,
        license.edition.fee(deployment.hosting),
    );

    let internal = resolve_bracket(u64::from(deployment.internal_users), &license.internal_users)?;
    let external = resolve_bracket(u64::from(deployment.external_users), &license.external_users)?;
    let mut internal = LineItem::charged(
        CostCategory::License,
        "internal_users",
        "Internal users",
        u64::from(deployment.internal_users),
        internal.amount,
    );
    let mut external = LineItem::charged(
        CostCategory::License,
        "external_users",
        "External users",
        u64::from(deployment.external_users),
        external.amount,
    );
    if deployment.use_unlimited_users {
        internal = internal.included(UNLIMITED_USERS_ID);
        external = external.included(UNLIMITED_USERS_ID);
    }

    Ok(vec![edition, internal, external])
}

fn pack_items(deployment: &DeploymentConfig, tables: &PricingTables, ao_packs: u64) -> Vec<LineItem> {
    let license = &tables.license;
    let mut items = vec![LineItem::charged(
        CostCategory::AddOns,
        "ao_packs",
        format!("Application object packs ({} AOs each)", license.ao_pack_size),
        ao_packs,
        license.ao_pack_price.times(ao_packs),
    )];
    if deployment.use_unlimited_users {
        items.push(LineItem::charged(
            CostCategory::AddOns,
            UNLIMITED_USERS_ID,
            "Unlimited users",
            ao_packs,
            license.unlimited_users_per_ao_pack.times(ao_packs),
        ));
    }
    items
}

fn service_items(deployment: &DeploymentConfig, tables: &PricingTables) -> EstimatorResult<Vec<LineItem>> {
    deployment
        .services
        .iter()
        .map(|selection| {
            let service = tables
                .service(&selection.id)
                .ok_or_else(|| EstimatorError::UnknownService(selection.id.clone()))?;
            let rate = service.rate(&deployment.region)?;
            let quantity = u64::from(selection.quantity);
            Ok(LineItem::charged(
                CostCategory::Services,
                &service.id,
                format!("{} ({} × {})", service.display_name, quantity, service.unit),
                quantity,
                rate.times(quantity),
            ))
        })
        .collect()
}

fn infrastructure_items(
    sizing: &SizingResult,
    deployment: &DeploymentConfig,
    tables: &PricingTables,
    warnings: &mut Vec<Warning>,
) -> Vec<LineItem> {
    if deployment.hosting == Hosting::Cloud {
        warnings.push(Warning::info(
            WarningCode::CloudInfrastructureIncluded,
            "Infrastructure is part of the cloud subscription and is not priced separately",
        ));
        let nodes = u64::from(sizing.total_nodes());
        return vec![LineItem::charged(CostCategory::Infrastructure, "hosting", "Cloud hosting", nodes, Money::ZERO)
            .included("cloud_subscription")];
    }

    let rates = &tables.infrastructure;
    let (multiplier, known) = rates.region_multiplier(&deployment.region);
    if !known {
        warnings.push(Warning::info(
            WarningCode::MissingRegionMultiplier,
            format!(
                "No infrastructure multiplier for region {}; priced at base rates",
                deployment.region
            ),
        ));
    }

    let annual = |quantity: f64, monthly_rate: f64| {
        Money::from_decimal(quantity * monthly_rate * multiplier * MONTHS_PER_YEAR)
    };
    let capacity = sizing.capacity;
    let mut items = vec![
        LineItem::charged(
            CostCategory::Infrastructure,
            "compute",
            "vCPU",
            capacity.cpu_cores.ceil() as u64,
            annual(capacity.cpu_cores, rates.vcpu_monthly),
        ),
        LineItem::charged(
            CostCategory::Infrastructure,
            "memory",
            "Memory (GB)",
            capacity.ram_gb.ceil() as u64,
            annual(capacity.ram_gb, rates.ram_gb_monthly),
        ),
        LineItem::charged(
            CostCategory::Infrastructure,
            "storage",
            "Disk (GB)",
            capacity.disk_gb.ceil() as u64,
            annual(capacity.disk_gb, rates.disk_gb_monthly),
        ),
    ];
    if sizing.backup_storage_gb > 0.0 {
        items.push(LineItem::charged(
            CostCategory::Infrastructure,
            "backup",
            "Backup storage (GB)",
            sizing.backup_storage_gb.ceil() as u64,
            annual(sizing.backup_storage_gb, rates.backup_gb_monthly),
        ));
    }
    if sizing.managed_control_plane && sizing.clusters > 0 {
        let fee = rates.managed_cluster_fee(sizing.distribution);
        let cluster_months = u64::from(sizing.clusters) * 12;
        items.push(LineItem::charged(
            CostCategory::Infrastructure,
            "managed_control_plane",
            format!("{} control plane", sizing.distribution.profile().display_name),
            u64::from(sizing.clusters),
            fee.times(cluster_months),
        ));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{Distribution, NodeSpecs};
    use crate::discount::DiscountScope;
    use crate::ha_dr::HaDrConfig;
    use crate::models::{AppCount, EnvironmentKind};
    use crate::sizing::compute_sizing;
    use crate::workload::{EnvironmentWorkload, OvercommitConfig, WorkloadConfig};

    fn sizing(distribution: Distribution) -> SizingResult {
        let workload = WorkloadConfig {
            distribution,
            ..Default::default()
        }
        .with_environment(
            EnvironmentKind::Prod,
            EnvironmentWorkload::new(AppCount::new(10, 10, 5, 0)),
        );
        compute_sizing(
            &workload,
            &NodeSpecs::standard(),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
        )
        .unwrap()
    }

    fn price(deployment: &DeploymentConfig) -> PricingResult {
        compute_pricing(
            &sizing(Distribution::Kubeadm),
            deployment,
            &PricingTables::standard(),
        )
        .unwrap()
    }

    #[test]
    fn test_ao_packs_priced_as_add_on() {
        let deployment = DeploymentConfig {
            application_objects: 450,
            ..Default::default()
        };
        let result = price(&deployment);
        assert_eq!(result.ao_packs, 3);
        assert_eq!(result.costs.add_ons["ao_packs"], Money::from_decimal(54_450.0));
    }

    #[test]
    fn test_unlimited_users_replace_user_tiers() {
        let deployment = DeploymentConfig {
            application_objects: 300,
            internal_users: 800,
            external_users: 5_000,
            use_unlimited_users: true,
            ..Default::default()
        };
        let result = price(&deployment);

        assert_eq!(
            result.costs.add_ons[UNLIMITED_USERS_ID],
            Money::from_decimal(121_000.0)
        );
        let internal = result
            .line_items
            .iter()
            .find(|i| i.id == "internal_users")
            .unwrap();
        assert!(internal.amount.is_zero());
        assert!(!internal.list_price.is_zero());
        assert_eq!(
            internal.status,
            LineItemStatus::Included {
                by: UNLIMITED_USERS_ID.to_string()
            }
        );
    }

    #[test]
    fn test_line_items_follow_category_order() {
        let deployment = DeploymentConfig {
            hosting: Hosting::SelfManaged,
            application_objects: 150,
            add_ons: vec![AddOnSelection::new("dr_environment")],
            services: vec![ServiceSelection {
                id: "expert_days".to_string(),
                quantity: 10,
            }],
            discount: Some(Discount::percentage(5.0, DiscountScope::Total)),
            ..Default::default()
        };
        let result = price(&deployment);

        let categories: Vec<_> = result.line_items.iter().map(|i| i.category).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
        assert_eq!(categories.last(), Some(&CostCategory::Discount));
        assert_eq!(
            result.subtotals.services,
            Money::from_decimal(22_000.0)
        );
        assert!(!result.subtotals.infrastructure.is_zero());
    }

    #[test]
    fn test_cloud_hosting_has_no_infrastructure_cost() {
        let result = price(&DeploymentConfig::default());
        assert!(result.subtotals.infrastructure.is_zero());
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.code == WarningCode::CloudInfrastructureIncluded)
        );
    }

    #[test]
    fn test_unknown_region_prices_at_base_rate_with_warning() {
        let deployment = DeploymentConfig {
            hosting: Hosting::SelfManaged,
            region: "mars-1".to_string(),
            ..Default::default()
        };
        let result = price(&deployment);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.code == WarningCode::MissingRegionMultiplier)
        );

        let us = price(&DeploymentConfig {
            hosting: Hosting::SelfManaged,
            ..Default::default()
        });
        assert_eq!(result.subtotals.infrastructure, us.subtotals.infrastructure);
    }

    #[test]
    fn test_managed_cluster_fee() {
        let deployment = DeploymentConfig {
            hosting: Hosting::SelfManaged,
            ..Default::default()
        };
        let result = compute_pricing(&sizing(Distribution::Eks), &deployment, &PricingTables::standard()).unwrap();
        assert_eq!(
            result.costs.infrastructure["managed_control_plane"],
            Money::from_decimal(73.0 * 12.0)
        );
    }

    #[test]
    fn test_missing_service_rate_is_an_error() {
        let deployment = DeploymentConfig {
            region: "ap-southeast".to_string(),
            services: vec![ServiceSelection {
                id: "training_seats".to_string(),
                quantity: 4,
            }],
            ..Default::default()
        };
        let err = compute_pricing(
            &sizing(Distribution::Kubeadm),
            &deployment,
            &PricingTables::standard(),
        )
        .unwrap_err();
        assert!(matches!(err, EstimatorError::MissingServiceRate { .. }));

        let deployment = DeploymentConfig {
            services: vec![ServiceSelection {
                id: "nope".to_string(),
                quantity: 1,
            }],
            ..Default::default()
        };
        let err = compute_pricing(
            &sizing(Distribution::Kubeadm),
            &deployment,
            &PricingTables::standard(),
        )
        .unwrap_err();
        assert_eq!(err, EstimatorError::UnknownService("nope".to_string()));
    }

    #[test]
    fn test_invalid_add_on_quantity_names_field() {
        let deployment = DeploymentConfig {
            add_ons: vec![AddOnSelection::new("log_streaming").with_quantity(0)],
            ..Default::default()
        };
        let err = compute_pricing(
            &sizing(Distribution::Kubeadm),
            &deployment,
            &PricingTables::standard(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("add_ons[0].quantity"));
    }
}
