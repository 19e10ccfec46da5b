//! High-availability and disaster-recovery posture.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

use crate::error::{EstimatorError, EstimatorResult};

/// Default standby capacity of a warm-standby DR site, as a percentage of
/// primary production capacity
pub const DEFAULT_WARM_STANDBY_PERCENT: f64 = 50.0;

/// Minimum control-plane members for an etcd quorum
pub const MIN_HA_CONTROL_PLANE_NODES: u32 = 3;

/// Control-plane topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ControlPlaneHa {
    #[default]
    Single,
    StackedHa,
    ExternalEtcd,
    Managed,
}

/// How worker capacity is spread across failure domains
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeDistribution {
    #[default]
    SingleAz,
    DualAz,
    MultiAz,
    MultiRegion,
}

impl NodeDistribution {
    /// Smallest zone count this distribution accepts
    pub fn min_zones(self) -> u32 {
        match self {
            NodeDistribution::SingleAz => 1,
            NodeDistribution::DualAz => 2,
            NodeDistribution::MultiAz => 3,
            NodeDistribution::MultiRegion => 2,
        }
    }

    /// Zone count is fixed rather than a lower bound
    pub fn exact_zones(self) -> Option<u32> {
        match self {
            NodeDistribution::SingleAz => Some(1),
            NodeDistribution::DualAz => Some(2),
            _ => None,
        }
    }
}

/// Disaster-recovery pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DrPattern {
    #[default]
    None,
    BackupRestore,
    WarmStandby,
    HotStandby,
    ActiveActive,
}

impl DrPattern {
    /// Default recovery-time objective in minutes
    pub fn default_rto_minutes(self) -> Option<u32> {
        match self {
            DrPattern::None => None,
            DrPattern::BackupRestore => Some(24 * 60),
            DrPattern::WarmStandby => Some(4 * 60),
            DrPattern::HotStandby => Some(60),
            DrPattern::ActiveActive => Some(5),
        }
    }

    /// Standby-site capacity as a fraction of primary production capacity
    pub fn standby_fraction(self, warm_standby_percent: f64) -> f64 {
        match self {
            DrPattern::None | DrPattern::BackupRestore => 0.0,
            DrPattern::WarmStandby => warm_standby_percent / 100.0,
            DrPattern::HotStandby | DrPattern::ActiveActive => 1.0,
        }
    }

    /// Production cost multiplier implied by the standby site
    pub fn cost_multiplier(self, warm_standby_percent: f64) -> f64 {
        1.0 + self.standby_fraction(warm_standby_percent)
    }
}

/// Backup tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackupStrategy {
    #[default]
    None,
    Velero,
    Kasten,
    Portworx,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BackupConfig {
    pub strategy: BackupStrategy,
    #[validate(range(min = 1, message = "backup frequency must be at least one hour"))]
    pub frequency_hours: u32,
    #[validate(range(min = 1, message = "backup retention must be at least one day"))]
    pub retention_days: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            strategy: BackupStrategy::None,
            frequency_hours: 24,
            retention_days: 30,
        }
    }
}

impl BackupConfig {
    pub fn is_enabled(&self) -> bool {
        self.strategy != BackupStrategy::None
    }
}

/// Complete HA/DR configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HaDrConfig {
    pub control_plane_ha: ControlPlaneHa,
    /// Control-plane members when `control_plane_ha` is stacked or external etcd
    pub control_plane_nodes: u32,
    pub node_distribution: NodeDistribution,
    pub az_count: u32,
    pub dr_pattern: DrPattern,
    #[validate(range(
        min = 0.0,
        max = 100.0,
        message = "warm standby capacity must be between 0 and 100 percent"
    ))]
    pub warm_standby_percent: f64,
    pub rto_minutes_override: Option<u32>,
    #[validate(nested)]
    pub backup: BackupConfig,
}

impl Default for HaDrConfig {
    fn default() -> Self {
        Self {
            control_plane_ha: ControlPlaneHa::Single,
            control_plane_nodes: MIN_HA_CONTROL_PLANE_NODES,
            node_distribution: NodeDistribution::SingleAz,
            az_count: 1,
            dr_pattern: DrPattern::None,
            warm_standby_percent: DEFAULT_WARM_STANDBY_PERCENT,
            rto_minutes_override: None,
            backup: BackupConfig::default(),
        }
    }
}

impl HaDrConfig {
    /// Switch node distribution.
    ///
    /// Moving up raises `az_count` to the new minimum when it falls short.
    /// Moving down never raises it; fixed-zone distributions (single / dual
    /// AZ) take their exact count.
    pub fn with_node_distribution(mut self, distribution: NodeDistribution) -> Self {
        let upward = distribution > self.node_distribution;
        self.node_distribution = distribution;

        if let Some(exact) = distribution.exact_zones() {
            if upward {
                self.az_count = self.az_count.max(exact);
            } else {
                self.az_count = self.az_count.min(exact);
            }
        } else if upward {
            self.az_count = self.az_count.max(distribution.min_zones());
        }
        self
    }

    /// Zones a production environment must spread across
    pub fn zones(&self) -> u32 {
        match self.node_distribution {
            NodeDistribution::SingleAz => 1,
            NodeDistribution::DualAz => 2,
            NodeDistribution::MultiAz | NodeDistribution::MultiRegion => self.az_count.max(1),
        }
    }

    /// Control-plane members of a production cluster on a self-managed distribution
    pub fn prod_control_plane_nodes(&self) -> u32 {
        match self.control_plane_ha {
            ControlPlaneHa::Single => 1,
            ControlPlaneHa::StackedHa | ControlPlaneHa::ExternalEtcd => self.control_plane_nodes,
            ControlPlaneHa::Managed => 0,
        }
    }

    pub fn standby_fraction(&self) -> f64 {
        self.dr_pattern.standby_fraction(self.warm_standby_percent)
    }

    /// Production cost multiplier of the configured DR pattern
    pub fn dr_cost_multiplier(&self) -> f64 {
        self.dr_pattern.cost_multiplier(self.warm_standby_percent)
    }

    pub fn rto_minutes(&self) -> Option<u32> {
        self.rto_minutes_override
            .or_else(|| self.dr_pattern.default_rto_minutes())
    }

    /// Reject configurations that cannot be sized.
    pub fn validate_config(&self) -> EstimatorResult<()> {
        self.validate()
            .map_err(|e| EstimatorError::from_validation("ha_dr", &e))?;

        let min = self.node_distribution.min_zones();
        if self.az_count < min {
            return Err(EstimatorError::invalid(
                "ha_dr.az_count",
                format!(
                    "{} requires at least {} zones, got {}",
                    self.node_distribution, min, self.az_count
                ),
            ));
        }
        if let Some(exact) = self.node_distribution.exact_zones() {
            if self.az_count != exact {
                return Err(EstimatorError::invalid(
                    "ha_dr.az_count",
                    format!(
                        "{} requires exactly {} zones, got {}",
                        self.node_distribution, exact, self.az_count
                    ),
                ));
            }
        }

        if matches!(
            self.control_plane_ha,
            ControlPlaneHa::StackedHa | ControlPlaneHa::ExternalEtcd
        ) && (self.control_plane_nodes < MIN_HA_CONTROL_PLANE_NODES
            || self.control_plane_nodes % 2 == 0)
        {
            return Err(EstimatorError::invalid(
                "ha_dr.control_plane_nodes",
                format!(
                    "etcd quorum needs an odd member count of at least {}, got {}",
                    MIN_HA_CONTROL_PLANE_NODES, self.control_plane_nodes
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(HaDrConfig::default().validate_config().is_ok());
    }

    #[test]
    fn test_az_count_below_minimum_is_rejected() {
        let config = HaDrConfig {
            node_distribution: NodeDistribution::MultiAz,
            az_count: 2,
            ..Default::default()
        };
        let err = config.validate_config().unwrap_err();
        assert_eq!(err.field(), Some("ha_dr.az_count"));
    }

    #[test]
    fn test_dual_az_requires_exactly_two() {
        let config = HaDrConfig {
            node_distribution: NodeDistribution::DualAz,
            az_count: 3,
            ..Default::default()
        };
        assert!(config.validate_config().is_err());
    }

    #[test]
    fn test_even_etcd_quorum_is_rejected() {
        let config = HaDrConfig {
            control_plane_ha: ControlPlaneHa::StackedHa,
            control_plane_nodes: 4,
            ..Default::default()
        };
        let err = config.validate_config().unwrap_err();
        assert_eq!(err.field(), Some("ha_dr.control_plane_nodes"));

        let config = HaDrConfig {
            control_plane_ha: ControlPlaneHa::ExternalEtcd,
            control_plane_nodes: 5,
            ..Default::default()
        };
        assert!(config.validate_config().is_ok());
        assert_eq!(config.prod_control_plane_nodes(), 5);
    }

    #[test]
    fn test_warm_standby_percent_out_of_range() {
        let config = HaDrConfig {
            warm_standby_percent: 150.0,
            ..Default::default()
        };
        let err = config.validate_config().unwrap_err();
        assert_eq!(err.field(), Some("ha_dr.warm_standby_percent"));
    }

    #[test]
    fn test_upward_distribution_change_raises_zone_count() {
        let config = HaDrConfig::default().with_node_distribution(NodeDistribution::MultiAz);
        assert_eq!(config.az_count, 3);
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn test_downward_distribution_change_never_raises_zone_count() {
        let config = HaDrConfig {
            node_distribution: NodeDistribution::MultiRegion,
            az_count: 2,
            ..Default::default()
        }
        .with_node_distribution(NodeDistribution::MultiAz);
        // MultiAz sits below MultiRegion, so the count is left alone and the
        // shortfall surfaces as a validation error instead of a silent bump.
        assert_eq!(config.az_count, 2);
        assert!(config.validate_config().is_err());

        let config = HaDrConfig {
            node_distribution: NodeDistribution::MultiAz,
            az_count: 4,
            ..Default::default()
        }
        .with_node_distribution(NodeDistribution::DualAz);
        assert_eq!(config.az_count, 2);
    }

    #[test]
    fn test_dr_pattern_multipliers() {
        assert_eq!(DrPattern::None.cost_multiplier(50.0), 1.0);
        assert_eq!(DrPattern::BackupRestore.cost_multiplier(50.0), 1.0);
        assert_eq!(DrPattern::WarmStandby.cost_multiplier(25.0), 1.25);
        assert_eq!(DrPattern::HotStandby.cost_multiplier(25.0), 2.0);
        assert_eq!(DrPattern::ActiveActive.cost_multiplier(25.0), 2.0);
    }

    #[test]
    fn test_rto_override_wins() {
        let config = HaDrConfig {
            dr_pattern: DrPattern::WarmStandby,
            ..Default::default()
        };
        assert_eq!(config.rto_minutes(), Some(240));

        let config = HaDrConfig {
            rto_minutes_override: Some(90),
            ..config
        };
        assert_eq!(config.rto_minutes(), Some(90));
    }
}
