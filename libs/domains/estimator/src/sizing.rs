//! Resource Aggregator
//!
//! Turns per-environment application counts into node counts and resource
//! totals:
//!
//! ```text
//! raw      = Σ(count × tier footprint) × replicas × (1 + headroom)
//! effective = raw / overcommit ratio
//! nodes    = ceil(effective / node capacity), at least 1 per role in use
//! prod     → rounded up to a multiple of the zone count
//! prod     → + ceil(primary × DR standby fraction) on the standby site
//! ```

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, instrument};
use validator::Validate;

use crate::catalogue::{Distribution, DistributionProfile, NodeSpecs, Runtime};
use crate::error::{EstimatorError, EstimatorResult};
use crate::ha_dr::{DrPattern, HaDrConfig};
use crate::models::{
    AppCount, EnvironmentClass, EnvironmentKind, NodeCounts, NodeRole, NodeRoleSpec,
    ResourceTotals, SizeTier,
};
use crate::workload::{EnvironmentWorkload, OvercommitConfig, WorkloadConfig};

/// Tolerance applied before rounding node counts up, so floating-point
/// noise never adds a node
pub const NODE_ROUNDING_EPSILON: f64 = 1e-9;

/// Backup footprint as a share of provisioned disk
pub const BACKUP_FOOTPRINT_RATIO: f64 = 0.5;

/// CPU / RAM demand
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceDemand {
    pub cpu_cores: f64,
    pub ram_gb: f64,
}

impl ResourceDemand {
    fn scaled(self, factor: f64) -> Self {
        Self {
            cpu_cores: self.cpu_cores * factor,
            ram_gb: self.ram_gb * factor,
        }
    }
}

/// Sizing of one enabled environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSizing {
    pub environment: EnvironmentKind,
    pub class: EnvironmentClass,
    pub applications: u32,
    /// Tier-derived demand including replicas and headroom
    pub raw: ResourceDemand,
    /// Raw demand after overcommit
    pub effective: ResourceDemand,
    /// Demand the worker pool was sized for (effective plus any shared
    /// platform overhead)
    pub worker_demand: ResourceDemand,
    pub worker_spec: NodeRoleSpec,
    pub primary: NodeCounts,
    pub standby: NodeCounts,
    pub nodes: NodeCounts,
    pub capacity: ResourceTotals,
    pub clusters: u32,
}

impl EnvironmentSizing {
    fn empty(kind: EnvironmentKind, worker_spec: NodeRoleSpec) -> Self {
        Self {
            environment: kind,
            class: kind.class(),
            applications: 0,
            raw: ResourceDemand::default(),
            effective: ResourceDemand::default(),
            worker_demand: ResourceDemand::default(),
            worker_spec,
            primary: NodeCounts::default(),
            standby: NodeCounts::default(),
            nodes: NodeCounts::default(),
            capacity: ResourceTotals::default(),
            clusters: 0,
        }
    }

    /// CPU / RAM the primary worker pool can schedule
    pub fn primary_worker_capacity(&self) -> ResourceTotals {
        ResourceTotals::of_nodes(&self.worker_spec, self.primary.worker)
    }
}

/// Aggregate sizing across all enabled environments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    pub distribution: Distribution,
    pub runtime: Runtime,
    pub managed_control_plane: bool,
    pub environments: Vec<EnvironmentSizing>,
    pub nodes: NodeCounts,
    pub capacity: ResourceTotals,
    pub raw: ResourceDemand,
    pub effective: ResourceDemand,
    pub clusters: u32,
    pub backup_storage_gb: f64,
    pub dr_pattern: DrPattern,
    /// Production capacity including the standby site, relative to the
    /// primary site alone
    pub dr_cost_multiplier: f64,
    pub rto_minutes: Option<u32>,
}

impl SizingResult {
    pub fn environment(&self, kind: EnvironmentKind) -> Option<&EnvironmentSizing> {
        self.environments.iter().find(|e| e.environment == kind)
    }

    pub fn total_nodes(&self) -> u32 {
        self.nodes.total()
    }
}

/// Compute per-environment and aggregate sizing.
///
/// Fails on configuration errors (overcommit below 1.0, zone count below the
/// distribution minimum, even etcd quorum, zero-capacity node specs).
#[instrument(skip_all, fields(distribution = %workload.distribution))]
pub fn compute_sizing(
    workload: &WorkloadConfig,
    node_specs: &NodeSpecs,
    overcommit: &OvercommitConfig,
    ha_dr: &HaDrConfig,
) -> EstimatorResult<SizingResult> {
    workload.validate_config()?;
    overcommit.validate_config()?;
    ha_dr.validate_config()?;
    node_specs
        .validate()
        .map_err(|e| EstimatorError::from_validation("node_specs", &e))?;

    let profile = workload.distribution.profile();
    let ctx = SizingContext {
        workload,
        node_specs,
        overcommit,
        ha_dr,
        profile,
    };

    let environments = workload
        .enabled_environments()
        .map(|(kind, env)| ctx.size_environment(kind, env))
        .collect::<EstimatorResult<Vec<_>>>()?;

    let nodes = environments
        .iter()
        .fold(NodeCounts::default(), |acc, e| acc + e.nodes);
    let capacity = environments
        .iter()
        .fold(ResourceTotals::default(), |acc, e| acc + e.capacity);
    let raw = sum_demand(environments.iter().map(|e| e.raw));
    let effective = sum_demand(environments.iter().map(|e| e.effective));
    let clusters = environments.iter().map(|e| e.clusters).sum();

    let backup_storage_gb = if ha_dr.backup.is_enabled() {
        capacity.disk_gb * BACKUP_FOOTPRINT_RATIO
    } else {
        0.0
    };

    debug!(
        environments = environments.len(),
        nodes = nodes.total(),
        cpu_cores = capacity.cpu_cores,
        ram_gb = capacity.ram_gb,
        clusters,
        "Computed sizing"
    );

    Ok(SizingResult {
        distribution: workload.distribution,
        runtime: profile.runtime,
        managed_control_plane: profile.managed_control_plane,
        environments,
        nodes,
        capacity,
        raw,
        effective,
        clusters,
        backup_storage_gb,
        dr_pattern: ha_dr.dr_pattern,
        dr_cost_multiplier: ha_dr.dr_cost_multiplier(),
        rto_minutes: ha_dr.rto_minutes(),
    })
}

/// Raw CPU / RAM demand of an application mix before overcommit
pub fn raw_demand(
    apps: &AppCount,
    tiers: &crate::catalogue::TierCatalogue,
    replicas: u32,
    headroom_percent: f64,
) -> ResourceDemand {
    let base = SizeTier::iter().fold(ResourceDemand::default(), |acc, tier| {
        let count = f64::from(apps.get(tier));
        let footprint = tiers.footprint(tier);
        ResourceDemand {
            cpu_cores: acc.cpu_cores + count * footprint.cpu_cores,
            ram_gb: acc.ram_gb + count * footprint.ram_gb,
        }
    });
    base.scaled(f64::from(replicas) * (1.0 + headroom_percent / 100.0))
}

/// Nodes needed to hold `demand` on nodes of `capacity`; 0 when there is no
/// demand, otherwise at least 1
pub fn nodes_for(demand: f64, capacity: f64) -> u32 {
    if demand <= 0.0 {
        return 0;
    }
    ceil_count(demand / capacity).max(1)
}

pub(crate) fn ceil_count(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value - NODE_ROUNDING_EPSILON).ceil() as u32
    }
}

fn round_up_to_multiple(count: u32, multiple: u32) -> u32 {
    if count == 0 || multiple <= 1 {
        return count;
    }
    count.div_ceil(multiple).saturating_mul(multiple)
}

fn sum_demand(items: impl Iterator<Item = ResourceDemand>) -> ResourceDemand {
    items.fold(ResourceDemand::default(), |acc, d| ResourceDemand {
        cpu_cores: acc.cpu_cores + d.cpu_cores,
        ram_gb: acc.ram_gb + d.ram_gb,
    })
}

struct SizingContext<'a> {
    workload: &'a WorkloadConfig,
    node_specs: &'a NodeSpecs,
    overcommit: &'a OvercommitConfig,
    ha_dr: &'a HaDrConfig,
    profile: DistributionProfile,
}

impl SizingContext<'_> {
    fn size_environment(
        &self,
        kind: EnvironmentKind,
        env: &EnvironmentWorkload,
    ) -> EstimatorResult<EnvironmentSizing> {
        let class = kind.class();
        let worker_spec = self.node_specs.spec(NodeRole::Worker, class);
        let apps = env.effective_apps();
        if apps.total() == 0 {
            return Ok(EnvironmentSizing::empty(kind, worker_spec));
        }

        let raw = raw_demand(&apps, &self.workload.tiers, env.replicas, env.headroom_percent);
        let ratios = self.overcommit.ratios(class);
        let effective = ResourceDemand {
            cpu_cores: raw.cpu_cores / ratios.cpu_ratio,
            ram_gb: raw.ram_gb / ratios.memory_ratio,
        };

        let overhead = self.workload.infra_overhead_percent / 100.0;
        let dedicated_infra = self.workload.dedicated_infra_nodes && overhead > 0.0;
        let worker_demand = if dedicated_infra {
            effective
        } else {
            effective.scaled(1.0 + overhead)
        };

        let mut primary = NodeCounts {
            control_plane: self.control_plane_nodes(class),
            worker: self.role_nodes(NodeRole::Worker, class, worker_demand)?,
            infra: 0,
        };
        if dedicated_infra {
            primary.infra = self.role_nodes(NodeRole::Infra, class, effective.scaled(overhead))?;
        }

        if class == EnvironmentClass::Prod {
            let zones = self.ha_dr.zones();
            primary.worker = round_up_to_multiple(primary.worker, zones);
            primary.infra = round_up_to_multiple(primary.infra, zones);
        }

        let fraction = self.ha_dr.standby_fraction();
        let standby = if kind == EnvironmentKind::Prod && fraction > 0.0 {
            NodeCounts {
                control_plane: primary.control_plane,
                worker: ceil_count(f64::from(primary.worker) * fraction),
                infra: ceil_count(f64::from(primary.infra) * fraction),
            }
        } else {
            NodeCounts::default()
        };
        let clusters = if standby.total() > 0 { 2 } else { 1 };

        let nodes = primary + standby;
        let capacity = ResourceTotals::of_nodes(
            &self.node_specs.spec(NodeRole::ControlPlane, class),
            nodes.control_plane,
        ) + ResourceTotals::of_nodes(&worker_spec, nodes.worker)
            + ResourceTotals::of_nodes(&self.node_specs.spec(NodeRole::Infra, class), nodes.infra);

        debug!(
            environment = %kind,
            raw_cpu = raw.cpu_cores,
            effective_cpu = effective.cpu_cores,
            workers = nodes.worker,
            infra = nodes.infra,
            control_plane = nodes.control_plane,
            "Sized environment"
        );

        Ok(EnvironmentSizing {
            environment: kind,
            class,
            applications: apps.total(),
            raw,
            effective,
            worker_demand,
            worker_spec,
            primary,
            standby,
            nodes,
            capacity,
            clusters,
        })
    }

    fn control_plane_nodes(&self, class: EnvironmentClass) -> u32 {
        if !self.profile.sizes_control_plane() {
            return 0;
        }
        match class {
            EnvironmentClass::Prod => self.ha_dr.prod_control_plane_nodes(),
            EnvironmentClass::NonProd => 1,
        }
    }

    fn role_nodes(
        &self,
        role: NodeRole,
        class: EnvironmentClass,
        demand: ResourceDemand,
    ) -> EstimatorResult<u32> {
        let spec = self.node_specs.spec(role, class);
        if spec.cpu_cores <= 0.0 || spec.ram_gb <= 0.0 {
            return Err(EstimatorError::invalid(
                format!("node_specs.{role}.{class}"),
                "node spec in use must have positive CPU and RAM",
            ));
        }
        Ok(nodes_for(demand.cpu_cores, spec.cpu_cores).max(nodes_for(demand.ram_gb, spec.ram_gb)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ha_dr::{BackupConfig, BackupStrategy, ControlPlaneHa, DrPattern, NodeDistribution};
    use crate::workload::OvercommitRatios;

    fn prod_only(apps: AppCount) -> WorkloadConfig {
        WorkloadConfig {
            dedicated_infra_nodes: false,
            infra_overhead_percent: 0.0,
            ..Default::default()
        }
        .with_environment(EnvironmentKind::Prod, EnvironmentWorkload::new(apps))
    }

    fn four_core_workers() -> NodeSpecs {
        let mut specs = NodeSpecs::standard();
        specs.worker.prod = NodeRoleSpec::new(4.0, 16.0, 100.0);
        specs
    }

    #[test]
    fn test_reference_kubernetes_sizing() {
        let workload = prod_only(AppCount::new(2, 2, 1, 0));
        let sizing = compute_sizing(
            &workload,
            &four_core_workers(),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
        )
        .unwrap();

        let prod = sizing.environment(EnvironmentKind::Prod).unwrap();
        assert!((prod.raw.cpu_cores - 3.0).abs() < 1e-9);
        assert_eq!(prod.raw, prod.effective);
        assert_eq!(prod.nodes.worker, 1);
        assert_eq!(prod.nodes.control_plane, 1);
        assert_eq!(sizing.clusters, 1);
    }

    #[test]
    fn test_zero_apps_yields_zero_nodes() {
        let workload = prod_only(AppCount::default());
        let sizing = compute_sizing(
            &workload,
            &NodeSpecs::standard(),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
        )
        .unwrap();

        assert_eq!(sizing.environments.len(), 1);
        assert_eq!(sizing.total_nodes(), 0);
        assert_eq!(sizing.clusters, 0);
    }

    #[test]
    fn test_huge_app_counts_size_without_overflow() {
        let workload = WorkloadConfig::default().with_environment(
            EnvironmentKind::Dev,
            EnvironmentWorkload::new(AppCount::new(3_000_000_000, 3_000_000_000, 0, 0)),
        );
        let sizing = compute_sizing(
            &workload,
            &NodeSpecs::standard(),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
        )
        .unwrap();

        let dev = sizing.environment(EnvironmentKind::Dev).unwrap();
        assert_eq!(dev.applications, u32::MAX);
        assert!(dev.nodes.worker > 0);
        assert!(sizing.total_nodes() >= dev.nodes.worker);
    }

    #[test]
    fn test_overcommit_divides_demand() {
        let workload = prod_only(AppCount::new(0, 0, 16, 0));
        let overcommit = OvercommitConfig {
            prod: OvercommitRatios {
                cpu_ratio: 2.0,
                memory_ratio: 1.0,
            },
            ..Default::default()
        };
        let sizing = compute_sizing(
            &workload,
            &four_core_workers(),
            &overcommit,
            &HaDrConfig::default(),
        )
        .unwrap();

        let prod = sizing.environment(EnvironmentKind::Prod).unwrap();
        assert!((prod.effective.cpu_cores - prod.raw.cpu_cores / 2.0).abs() < 1e-9);
        // 16 large × 1.2 = 19.2 cores → 9.6 effective → 3 nodes; RAM 38.4 GB → 3 nodes
        assert_eq!(prod.nodes.worker, 3);
    }

    #[test]
    fn test_multi_az_rounds_to_zone_multiple() {
        let workload = prod_only(AppCount::new(0, 0, 16, 0));
        let ha_dr = HaDrConfig::default().with_node_distribution(NodeDistribution::MultiAz);
        let sizing = compute_sizing(
            &workload,
            &four_core_workers(),
            &OvercommitConfig::default(),
            &ha_dr,
        )
        .unwrap();

        // 19.2 cores on 4-core nodes → 5, spread over 3 zones → 6
        let prod = sizing.environment(EnvironmentKind::Prod).unwrap();
        assert_eq!(prod.nodes.worker, 6);
    }

    #[test]
    fn test_hot_standby_doubles_production() {
        let workload = prod_only(AppCount::new(0, 0, 16, 0));
        let ha_dr = HaDrConfig {
            dr_pattern: DrPattern::HotStandby,
            control_plane_ha: ControlPlaneHa::StackedHa,
            control_plane_nodes: 3,
            ..Default::default()
        };
        let sizing = compute_sizing(
            &workload,
            &four_core_workers(),
            &OvercommitConfig::default(),
            &ha_dr,
        )
        .unwrap();

        let prod = sizing.environment(EnvironmentKind::Prod).unwrap();
        assert_eq!(prod.primary.worker, 5);
        assert_eq!(prod.standby.worker, 5);
        assert_eq!(prod.nodes.worker, 10);
        assert_eq!(prod.nodes.control_plane, 6);
        assert_eq!(sizing.clusters, 2);
        assert_eq!(sizing.dr_pattern, DrPattern::HotStandby);
        assert_eq!(sizing.dr_cost_multiplier, 2.0);
    }

    #[test]
    fn test_warm_standby_uses_configured_fraction() {
        let workload = prod_only(AppCount::new(0, 0, 16, 0));
        let ha_dr = HaDrConfig {
            dr_pattern: DrPattern::WarmStandby,
            warm_standby_percent: 40.0,
            ..Default::default()
        };
        let sizing = compute_sizing(
            &workload,
            &four_core_workers(),
            &OvercommitConfig::default(),
            &ha_dr,
        )
        .unwrap();

        let prod = sizing.environment(EnvironmentKind::Prod).unwrap();
        // ceil(5 × 0.4) = 2
        assert_eq!(prod.standby.worker, 2);
        assert!((sizing.dr_cost_multiplier - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_managed_distribution_has_no_control_plane() {
        let mut workload = prod_only(AppCount::new(4, 0, 0, 0));
        workload.distribution = Distribution::Eks;
        let sizing = compute_sizing(
            &workload,
            &NodeSpecs::standard(),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
        )
        .unwrap();

        assert!(sizing.managed_control_plane);
        assert_eq!(sizing.nodes.control_plane, 0);
        assert_eq!(sizing.nodes.worker, 1);
    }

    #[test]
    fn test_dedicated_infra_nodes() {
        let workload = WorkloadConfig::default().with_environment(
            EnvironmentKind::Dev,
            EnvironmentWorkload::new(AppCount::new(10, 0, 0, 0)),
        );
        let sizing = compute_sizing(
            &workload,
            &NodeSpecs::standard(),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
        )
        .unwrap();

        let dev = sizing.environment(EnvironmentKind::Dev).unwrap();
        assert_eq!(dev.nodes.infra, 1);
        assert_eq!(dev.nodes.worker, 1);
        assert_eq!(dev.nodes.control_plane, 1);
    }

    #[test]
    fn test_backup_footprint() {
        let workload = prod_only(AppCount::new(4, 0, 0, 0));
        let ha_dr = HaDrConfig {
            backup: BackupConfig {
                strategy: BackupStrategy::Velero,
                ..Default::default()
            },
            ..Default::default()
        };
        let sizing = compute_sizing(
            &workload,
            &NodeSpecs::standard(),
            &OvercommitConfig::default(),
            &ha_dr,
        )
        .unwrap();

        assert!(sizing.backup_storage_gb > 0.0);
        assert_eq!(
            sizing.backup_storage_gb,
            sizing.capacity.disk_gb * BACKUP_FOOTPRINT_RATIO
        );
    }

    #[test]
    fn test_zero_capacity_spec_is_rejected() {
        let workload = prod_only(AppCount::new(1, 0, 0, 0));
        let mut specs = NodeSpecs::standard();
        specs.worker.prod.cpu_cores = 0.0;
        let err = compute_sizing(
            &workload,
            &specs,
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("node_specs.worker.prod"));
    }

    #[test]
    fn test_nodes_for_tolerates_float_noise() {
        assert_eq!(nodes_for(8.000_000_000_1, 4.0), 2);
        assert_eq!(nodes_for(0.0, 4.0), 0);
        assert_eq!(nodes_for(0.1, 4.0), 1);
        assert_eq!(round_up_to_multiple(5, 3), 6);
        assert_eq!(round_up_to_multiple(0, 3), 0);
    }
}
