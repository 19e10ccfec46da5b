use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::catalogue::{Distribution, TierCatalogue};
use crate::error::{EstimatorError, EstimatorResult};
use crate::models::{AppCount, EnvironmentClass, EnvironmentKind};

/// Default buffer added on top of raw demand
pub const DEFAULT_HEADROOM_PERCENT: f64 = 20.0;

/// Default platform-services overhead (ingress, monitoring, registry) as a
/// share of workload demand
pub const DEFAULT_INFRA_OVERHEAD_PERCENT: f64 = 15.0;

/// Workload of a single environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EnvironmentWorkload {
    pub enabled: bool,
    pub apps: AppCount,
    #[validate(range(min = 1, message = "replica count must be at least 1"))]
    pub replicas: u32,
    #[validate(range(min = 0.0, message = "headroom cannot be negative"))]
    pub headroom_percent: f64,
}

impl Default for EnvironmentWorkload {
    fn default() -> Self {
        Self {
            enabled: true,
            apps: AppCount::default(),
            replicas: 1,
            headroom_percent: DEFAULT_HEADROOM_PERCENT,
        }
    }
}

impl EnvironmentWorkload {
    pub fn new(apps: AppCount) -> Self {
        Self {
            apps,
            ..Default::default()
        }
    }

    /// Placeholder for environments the caller never configured
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Application counts that take part in sizing; disabled environments
    /// count as zero whatever they store
    pub fn effective_apps(&self) -> AppCount {
        if self.enabled {
            self.apps
        } else {
            AppCount::default()
        }
    }
}

/// Workload description: which environments run what
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub distribution: Distribution,
    pub environments: BTreeMap<EnvironmentKind, EnvironmentWorkload>,
    pub tiers: TierCatalogue,
    pub dedicated_infra_nodes: bool,
    pub infra_overhead_percent: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            distribution: Distribution::default(),
            environments: BTreeMap::new(),
            tiers: TierCatalogue::standard(),
            dedicated_infra_nodes: true,
            infra_overhead_percent: DEFAULT_INFRA_OVERHEAD_PERCENT,
        }
    }
}

impl WorkloadConfig {
    pub fn with_environment(mut self, kind: EnvironmentKind, workload: EnvironmentWorkload) -> Self {
        self.environments.insert(kind, workload);
        self
    }

    /// Look up an environment.
    ///
    /// An environment missing from the map is reported as
    /// [`EnvironmentWorkload::disabled`], i.e. a zero-valued `AppCount`.
    pub fn environment(&self, kind: EnvironmentKind) -> EnvironmentWorkload {
        self.environments
            .get(&kind)
            .copied()
            .unwrap_or_else(EnvironmentWorkload::disabled)
    }

    /// Enabled environments in declaration order
    pub fn enabled_environments(&self) -> impl Iterator<Item = (EnvironmentKind, &EnvironmentWorkload)> {
        self.environments
            .iter()
            .filter(|(_, env)| env.enabled)
            .map(|(kind, env)| (*kind, env))
    }

    pub fn total_applications(&self) -> u32 {
        self.enabled_environments()
            .map(|(_, env)| env.apps.total())
            .sum()
    }

    pub fn validate_config(&self) -> EstimatorResult<()> {
        for (kind, env) in &self.environments {
            env.validate().map_err(|e| {
                EstimatorError::from_validation(&format!("workload.environments.{kind}"), &e)
            })?;
        }

        if !(self.infra_overhead_percent >= 0.0) {
            return Err(EstimatorError::invalid(
                "workload.infra_overhead_percent",
                "infra overhead cannot be negative",
            ));
        }

        for (name, footprint) in [
            ("small", self.tiers.small),
            ("medium", self.tiers.medium),
            ("large", self.tiers.large),
            ("xlarge", self.tiers.xlarge),
        ] {
            if !(footprint.cpu_cores >= 0.0 && footprint.ram_gb >= 0.0) {
                return Err(EstimatorError::invalid(
                    format!("workload.tiers.{name}"),
                    "tier footprint cannot be negative",
                ));
            }
        }

        Ok(())
    }
}

/// CPU / memory overcommit ratios for one environment class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OvercommitRatios {
    #[validate(range(min = 1.0, message = "overcommit ratio must be at least 1.0"))]
    pub cpu_ratio: f64,
    #[validate(range(min = 1.0, message = "overcommit ratio must be at least 1.0"))]
    pub memory_ratio: f64,
}

impl Default for OvercommitRatios {
    fn default() -> Self {
        Self {
            cpu_ratio: 1.0,
            memory_ratio: 1.0,
        }
    }
}

/// Overcommit per environment class; 1.0 means no overcommit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OvercommitConfig {
    #[validate(nested)]
    pub prod: OvercommitRatios,
    #[validate(nested)]
    pub non_prod: OvercommitRatios,
}

impl OvercommitConfig {
    pub fn ratios(&self, class: EnvironmentClass) -> OvercommitRatios {
        match class {
            EnvironmentClass::Prod => self.prod,
            EnvironmentClass::NonProd => self.non_prod,
        }
    }

    pub fn validate_config(&self) -> EstimatorResult<()> {
        self.validate()
            .map_err(|e| EstimatorError::from_validation("overcommit", &e))
    }
}
