//! Growth Projector
//!
//! Stateless over the year index `t = 1..=N`. With base `B` and rate `r`:
//!
//! ```text
//! Linear       B × (1 + r·t)
//! Exponential  B × (1 + r)^t
//! SCurve       B × (1 + G·s(t)),  G = (1 + r)^N − 1,  s(N) = 1
//! Custom       B_t = B_{t−1} × (1 + rates[t])
//! ```
//!
//! `s(t)` is a logistic curve with its inflection at `N/2`, normalised to run
//! from 0 at `t = 0` to 1 at `t = N`, so S-curve and exponential agree on the
//! final year.
//!
//! Cost snapshots take the documented shortcut: every base cost category is
//! scaled by the resource growth factor and by compounded inflation rather
//! than re-pricing a re-sized deployment each year.

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, instrument};

use crate::error::{EstimatorError, EstimatorResult};
use crate::models::{EnvironmentKind, Money};
use crate::pricing::PricingResult;
use crate::sizing::{SizingResult, nodes_for};

/// Logistic steepness across the whole horizon; `k = S_CURVE_STEEPNESS / N`
pub const S_CURVE_STEEPNESS: f64 = 6.0;

/// Demand may exceed capacity by this much before it is reported
const CAPACITY_TOLERANCE: f64 = 1e-6;

/// Projection length in years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ProjectionHorizon {
    One,
    #[default]
    Three,
    Five,
}

impl ProjectionHorizon {
    pub fn years(self) -> u32 {
        match self {
            ProjectionHorizon::One => 1,
            ProjectionHorizon::Three => 3,
            ProjectionHorizon::Five => 5,
        }
    }
}

impl TryFrom<u32> for ProjectionHorizon {
    type Error = String;

    fn try_from(years: u32) -> Result<Self, Self::Error> {
        match years {
            1 => Ok(ProjectionHorizon::One),
            3 => Ok(ProjectionHorizon::Three),
            5 => Ok(ProjectionHorizon::Five),
            other => Err(format!("projection horizon must be 1, 3 or 5 years, got {other}")),
        }
    }
}

impl From<ProjectionHorizon> for u32 {
    fn from(horizon: ProjectionHorizon) -> Self {
        horizon.years()
    }
}

/// Shape of the growth curve
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthPattern {
    Linear,
    #[default]
    Exponential,
    SCurve,
    /// Per-year percentages, `rates[0]` driving year 1
    Custom { rates: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub years: ProjectionHorizon,
    pub annual_growth_rate_percent: f64,
    pub pattern: GrowthPattern,
    pub include_cost_projections: bool,
    pub inflation_rate_percent: f64,
    pub show_capacity_warnings: bool,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            years: ProjectionHorizon::default(),
            annual_growth_rate_percent: 10.0,
            pattern: GrowthPattern::default(),
            include_cost_projections: true,
            inflation_rate_percent: 3.0,
            show_capacity_warnings: true,
        }
    }
}

impl GrowthConfig {
    pub fn validate_config(&self) -> EstimatorResult<()> {
        check_rate("growth.annual_growth_rate_percent", self.annual_growth_rate_percent)?;
        check_rate("growth.inflation_rate_percent", self.inflation_rate_percent)?;

        // Linear decline must keep the final year's factor positive
        if matches!(self.pattern, GrowthPattern::Linear) {
            let horizon = f64::from(self.years.years());
            if 1.0 + self.annual_growth_rate_percent / 100.0 * horizon <= 0.0 {
                return Err(EstimatorError::invalid(
                    "growth.annual_growth_rate_percent",
                    format!("linear decline reaches zero within {horizon} years"),
                ));
            }
        }

        if let GrowthPattern::Custom { rates } = &self.pattern {
            let needed = self.years.years() as usize;
            if rates.len() < needed {
                return Err(EstimatorError::invalid(
                    "growth.pattern.rates",
                    format!(
                        "custom pattern needs {needed} yearly rates, got {}",
                        rates.len()
                    ),
                ));
            }
            for (i, rate) in rates.iter().take(needed).enumerate() {
                check_rate(&format!("growth.pattern.rates[{i}]"), *rate)?;
            }
        }
        Ok(())
    }

    /// Multiplier on the base value in year `t` (`t = 0` is the base year)
    pub fn growth_factor(&self, t: u32) -> f64 {
        let r = self.annual_growth_rate_percent / 100.0;
        let t_f = f64::from(t);
        match &self.pattern {
            GrowthPattern::Linear => 1.0 + r * t_f,
            GrowthPattern::Exponential => (1.0 + r).powf(t_f),
            GrowthPattern::SCurve => {
                let n = f64::from(self.years.years());
                let total = (1.0 + r).powf(n) - 1.0;
                1.0 + total * s_curve_progress(t_f, n)
            }
            GrowthPattern::Custom { rates } => rates
                .iter()
                .take(t as usize)
                .fold(1.0, |acc, rate| acc * (1.0 + rate / 100.0)),
        }
    }

    /// Compounded price inflation in year `t`
    pub fn inflation_factor(&self, t: u32) -> f64 {
        (1.0 + self.inflation_rate_percent / 100.0).powf(f64::from(t))
    }
}

fn check_rate(field: &str, percent: f64) -> EstimatorResult<()> {
    if percent > -100.0 && percent.is_finite() {
        Ok(())
    } else {
        Err(EstimatorError::invalid(field, "rate must be greater than -100%"))
    }
}

/// Normalised logistic progress in `[0, 1]` over a horizon of `n` years
fn s_curve_progress(t: f64, n: f64) -> f64 {
    let k = S_CURVE_STEEPNESS / n;
    let logistic = |x: f64| 1.0 / (1.0 + (-k * (x - n / 2.0)).exp());
    let start = logistic(0.0);
    (logistic(t) - start) / (logistic(n) - start)
}

/// Resource checked against sized capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CapacityResource {
    Cpu,
    Memory,
    Nodes,
}

/// Projected demand outgrowing what is sized today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityWarning {
    pub year: u32,
    pub environment: EnvironmentKind,
    pub resource: CapacityResource,
    pub demand: f64,
    pub capacity: f64,
    pub shortfall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentProjection {
    pub environment: EnvironmentKind,
    pub cpu_cores: f64,
    pub ram_gb: f64,
    pub worker_nodes_required: u32,
    pub worker_nodes_sized: u32,
}

/// Projected demand of one year against current capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingSnapshot {
    pub effective_cpu_cores: f64,
    pub effective_ram_gb: f64,
    pub worker_nodes_required: u32,
    pub worker_nodes_sized: u32,
    pub environments: Vec<EnvironmentProjection>,
}

/// Projected annual cost of one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub inflation_factor: f64,
    pub license: Money,
    pub add_ons: Money,
    pub services: Money,
    pub infrastructure: Money,
    pub discount: Money,
    pub gross: Money,
    pub net: Money,
    pub per_month: Money,
    pub cumulative_net: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u32,
    pub growth_factor: f64,
    pub sizing: SizingSnapshot,
    pub cost: Option<CostSnapshot>,
    pub capacity_warnings: Vec<CapacityWarning>,
}

/// Project sizing (and optionally cost) over the configured horizon.
#[instrument(skip_all, fields(years = growth.years.years(), pattern = ?growth.pattern))]
pub fn project_growth(
    base_sizing: &SizingResult,
    base_pricing: &PricingResult,
    growth: &GrowthConfig,
) -> EstimatorResult<Vec<YearProjection>> {
    growth.validate_config()?;

    let mut cumulative_net = Money::ZERO;
    let mut projections = Vec::with_capacity(growth.years.years() as usize);

    for year in 1..=growth.years.years() {
        let factor = growth.growth_factor(year);
        let (sizing, capacity_warnings) = project_sizing(base_sizing, year, factor);

        let cost = growth.include_cost_projections.then(|| {
            let snapshot = project_cost(base_pricing, factor, growth.inflation_factor(year), cumulative_net);
            cumulative_net = snapshot.cumulative_net;
            snapshot
        });

        debug!(
            year,
            factor,
            cpu_cores = sizing.effective_cpu_cores,
            shortfalls = capacity_warnings.len(),
            "Projected year"
        );

        projections.push(YearProjection {
            year,
            growth_factor: factor,
            sizing,
            cost,
            capacity_warnings: if growth.show_capacity_warnings {
                capacity_warnings
            } else {
                Vec::new()
            },
        });
    }

    Ok(projections)
}

fn project_sizing(base: &SizingResult, year: u32, factor: f64) -> (SizingSnapshot, Vec<CapacityWarning>) {
    let mut warnings = Vec::new();
    let mut environments = Vec::with_capacity(base.environments.len());

    for env in &base.environments {
        let cpu = env.worker_demand.cpu_cores * factor;
        let ram = env.worker_demand.ram_gb * factor;
        let required = nodes_for(cpu, env.worker_spec.cpu_cores).max(nodes_for(ram, env.worker_spec.ram_gb));
        let capacity = env.primary_worker_capacity();

        let mut check = |resource, demand: f64, capacity: f64| {
            if demand - capacity > CAPACITY_TOLERANCE {
                warnings.push(CapacityWarning {
                    year,
                    environment: env.environment,
                    resource,
                    demand,
                    capacity,
                    shortfall: demand - capacity,
                });
            }
        };
        check(CapacityResource::Cpu, cpu, capacity.cpu_cores);
        check(CapacityResource::Memory, ram, capacity.ram_gb);
        check(CapacityResource::Nodes, f64::from(required), f64::from(env.primary.worker));

        environments.push(EnvironmentProjection {
            environment: env.environment,
            cpu_cores: cpu,
            ram_gb: ram,
            worker_nodes_required: required,
            worker_nodes_sized: env.primary.worker,
        });
    }

    let snapshot = SizingSnapshot {
        effective_cpu_cores: base.effective.cpu_cores * factor,
        effective_ram_gb: base.effective.ram_gb * factor,
        worker_nodes_required: environments
            .iter()
            .fold(0, |acc: u32, e| acc.saturating_add(e.worker_nodes_required)),
        worker_nodes_sized: environments
            .iter()
            .fold(0, |acc: u32, e| acc.saturating_add(e.worker_nodes_sized)),
        environments,
    };
    (snapshot, warnings)
}

fn project_cost(base: &PricingResult, growth: f64, inflation: f64, cumulative_before: Money) -> CostSnapshot {
    let factor = growth * inflation;
    let subtotals = &base.subtotals;
    let license = subtotals.license.scale(factor);
    let add_ons = subtotals.add_ons.scale(factor);
    let services = subtotals.services.scale(factor);
    let infrastructure = subtotals.infrastructure.scale(factor);
    let gross = license + add_ons + services + infrastructure;
    let discount = base
        .totals
        .discount
        .scale(factor)
        .clamp(Money::ZERO, gross.max(Money::ZERO));
    let net = gross - discount;

    CostSnapshot {
        inflation_factor: inflation,
        license,
        add_ons,
        services,
        infrastructure,
        discount,
        gross,
        net,
        per_month: net.divide(12),
        cumulative_net: cumulative_before + net,
    }
}
