//! Cross-cutting configuration review.
//!
//! Rules never fail an estimate; they annotate it with [`Warning`]s the UI
//! can surface next to the totals.

use tracing::debug;

use crate::catalogue::Runtime;
use crate::ha_dr::{ControlPlaneHa, DrPattern, HaDrConfig, NodeDistribution};
use crate::models::{EnvironmentKind, Hosting};
use crate::pricing::DeploymentConfig;
use crate::warnings::{Warning, WarningCode};
use crate::workload::{OvercommitConfig, WorkloadConfig};

/// Production overcommit above this is flagged
pub const MAX_RECOMMENDED_PROD_OVERCOMMIT: f64 = 2.0;

/// Backups less frequent than this undermine any DR pattern
pub const MAX_RECOMMENDED_BACKUP_INTERVAL_HOURS: u32 = 24;

/// Everything the rules look at
#[derive(Debug, Clone, Copy)]
pub struct ReviewContext<'a> {
    pub workload: &'a WorkloadConfig,
    pub overcommit: &'a OvercommitConfig,
    pub ha_dr: &'a HaDrConfig,
    pub deployment: &'a DeploymentConfig,
}

type Rule = fn(&ReviewContext<'_>) -> Option<Warning>;

const RULES: &[Rule] = &[
    no_applications,
    single_control_plane,
    single_zone_production,
    managed_distribution_ha_ignored,
    managed_ha_on_self_managed,
    vm_control_plane_ha_ignored,
    dr_environment_double_count,
    backup_restore_without_backup,
    infrequent_backups,
    high_prod_overcommit,
    multi_region_without_dr,
    cloud_hosting_self_managed_distribution,
    unlimited_users_without_packs,
    standby_on_single_zone,
];

/// Run every rule, in a fixed order
pub fn review(ctx: &ReviewContext<'_>) -> Vec<Warning> {
    let warnings: Vec<Warning> = RULES.iter().filter_map(|rule| rule(ctx)).collect();
    debug!(warnings = warnings.len(), "Reviewed configuration");
    warnings
}

fn has_production(ctx: &ReviewContext<'_>) -> bool {
    ctx.workload
        .environment(EnvironmentKind::Prod)
        .effective_apps()
        .total()
        > 0
}

fn no_applications(ctx: &ReviewContext<'_>) -> Option<Warning> {
    (ctx.workload.total_applications() == 0).then(|| {
        Warning::warn(
            WarningCode::NoApplications,
            "No enabled environment has applications; nothing will be sized",
        )
    })
}

fn single_control_plane(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let sizes_control_plane = ctx.workload.distribution.profile().sizes_control_plane();
    (has_production(ctx) && sizes_control_plane && ctx.ha_dr.control_plane_ha == ControlPlaneHa::Single).then(|| {
        Warning::recommend(
            WarningCode::SingleControlPlane,
            "Production runs a single control-plane node; use stacked HA or external etcd with 3 or more members",
        )
    })
}

fn single_zone_production(ctx: &ReviewContext<'_>) -> Option<Warning> {
    (has_production(ctx) && ctx.ha_dr.node_distribution == NodeDistribution::SingleAz).then(|| {
        Warning::recommend(
            WarningCode::SingleZoneProduction,
            "Production is confined to one availability zone; a zone outage takes it down",
        )
    })
}

fn managed_distribution_ha_ignored(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let profile = ctx.workload.distribution.profile();
    let self_managed_ha = matches!(
        ctx.ha_dr.control_plane_ha,
        ControlPlaneHa::StackedHa | ControlPlaneHa::ExternalEtcd
    );
    (profile.managed_control_plane && self_managed_ha).then(|| {
        Warning::info(
            WarningCode::ManagedDistributionHaIgnored,
            format!(
                "{} manages its own control plane; the {} setting is ignored",
                profile.display_name, ctx.ha_dr.control_plane_ha
            ),
        )
    })
}

fn managed_ha_on_self_managed(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let profile = ctx.workload.distribution.profile();
    (ctx.ha_dr.control_plane_ha == ControlPlaneHa::Managed && profile.sizes_control_plane()).then(|| {
        Warning::warn(
            WarningCode::ManagedHaOnSelfManaged,
            format!(
                "{} has no managed control plane; production will be sized without control-plane nodes",
                profile.display_name
            ),
        )
    })
}

fn vm_control_plane_ha_ignored(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let runtime = ctx.workload.distribution.profile().runtime;
    (runtime == Runtime::VirtualMachines && ctx.ha_dr.control_plane_ha != ControlPlaneHa::Single).then(|| {
        Warning::info(
            WarningCode::VmControlPlaneHaIgnored,
            "Virtual machines have no control plane; the control-plane HA setting is ignored",
        )
    })
}

fn dr_environment_double_count(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let dr_env = ctx.workload.environment(EnvironmentKind::Dr).effective_apps().total() > 0;
    (dr_env && ctx.ha_dr.standby_fraction() > 0.0).then(|| {
        Warning::warn(
            WarningCode::DrEnvironmentDoubleCount,
            format!(
                "A DR environment is sized while {} already adds standby capacity; DR is counted twice",
                ctx.ha_dr.dr_pattern
            ),
        )
    })
}

fn backup_restore_without_backup(ctx: &ReviewContext<'_>) -> Option<Warning> {
    (ctx.ha_dr.dr_pattern == DrPattern::BackupRestore && !ctx.ha_dr.backup.is_enabled()).then(|| {
        Warning::warn(
            WarningCode::BackupRestoreWithoutBackup,
            "Backup & restore DR needs a backup strategy",
        )
    })
}

fn infrequent_backups(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let backup = &ctx.ha_dr.backup;
    (backup.is_enabled()
        && backup.frequency_hours > MAX_RECOMMENDED_BACKUP_INTERVAL_HOURS
        && ctx.ha_dr.dr_pattern != DrPattern::None)
        .then(|| {
            Warning::recommend(
                WarningCode::InfrequentBackups,
                format!(
                    "Backups every {}h allow more data loss than a {} DR pattern suggests; back up at least daily",
                    backup.frequency_hours, ctx.ha_dr.dr_pattern
                ),
            )
        })
}

fn high_prod_overcommit(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let prod = ctx.overcommit.prod;
    let ratio = prod.cpu_ratio.max(prod.memory_ratio);
    (ratio > MAX_RECOMMENDED_PROD_OVERCOMMIT).then(|| {
        Warning::recommend(
            WarningCode::HighProdOvercommit,
            format!(
                "Production overcommit of {ratio}x exceeds {MAX_RECOMMENDED_PROD_OVERCOMMIT}x; expect contention under load"
            ),
        )
    })
}

fn multi_region_without_dr(ctx: &ReviewContext<'_>) -> Option<Warning> {
    (ctx.ha_dr.node_distribution == NodeDistribution::MultiRegion && ctx.ha_dr.dr_pattern == DrPattern::None).then(
        || {
            Warning::recommend(
                WarningCode::MultiRegionWithoutDr,
                "Multi-region placement without a DR pattern; consider warm or hot standby",
            )
        },
    )
}

fn cloud_hosting_self_managed_distribution(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let profile = ctx.workload.distribution.profile();
    (ctx.deployment.hosting == Hosting::Cloud && profile.sizes_control_plane()).then(|| {
        Warning::info(
            WarningCode::CloudHostingSelfManagedDistribution,
            format!(
                "{} is a self-managed distribution; cloud hosting runs on the vendor's platform, so the distribution choice does not apply",
                profile.display_name
            ),
        )
    })
}

fn unlimited_users_without_packs(ctx: &ReviewContext<'_>) -> Option<Warning> {
    (ctx.deployment.use_unlimited_users && ctx.deployment.application_objects == 0).then(|| {
        Warning::warn(
            WarningCode::UnlimitedUsersWithoutPacks,
            "Unlimited users is priced per AO pack; with no application objects it costs nothing",
        )
    })
}

fn standby_on_single_zone(ctx: &ReviewContext<'_>) -> Option<Warning> {
    let hot = matches!(
        ctx.ha_dr.dr_pattern,
        DrPattern::HotStandby | DrPattern::ActiveActive
    );
    (hot && ctx.ha_dr.node_distribution == NodeDistribution::SingleAz).then(|| {
        Warning::recommend(
            WarningCode::StandbyOnSingleZone,
            format!(
                "{} on a single zone protects against site loss but not zone loss",
                ctx.ha_dr.dr_pattern
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Distribution;
    use crate::ha_dr::{BackupConfig, BackupStrategy};
    use crate::models::AppCount;
    use crate::workload::{EnvironmentWorkload, OvercommitRatios};

    fn codes(
        workload: &WorkloadConfig,
        overcommit: &OvercommitConfig,
        ha_dr: &HaDrConfig,
        deployment: &DeploymentConfig,
    ) -> Vec<WarningCode> {
        review(&ReviewContext {
            workload,
            overcommit,
            ha_dr,
            deployment,
        })
        .into_iter()
        .map(|w| w.code)
        .collect()
    }

    fn prod_workload(distribution: Distribution) -> WorkloadConfig {
        WorkloadConfig {
            distribution,
            ..Default::default()
        }
        .with_environment(
            EnvironmentKind::Prod,
            EnvironmentWorkload::new(AppCount::new(4, 2, 0, 0)),
        )
    }

    fn self_managed() -> DeploymentConfig {
        DeploymentConfig {
            hosting: Hosting::SelfManaged,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_workload() {
        let found = codes(
            &WorkloadConfig::default(),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
            &self_managed(),
        );
        assert_eq!(found, vec![WarningCode::NoApplications]);
    }

    #[test]
    fn test_default_production_gets_ha_recommendations() {
        let found = codes(
            &prod_workload(Distribution::Kubeadm),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
            &self_managed(),
        );
        assert_eq!(
            found,
            vec![
                WarningCode::SingleControlPlane,
                WarningCode::SingleZoneProduction
            ]
        );
    }

    #[test]
    fn test_managed_distribution_ignores_stacked_ha() {
        let ha_dr = HaDrConfig {
            control_plane_ha: ControlPlaneHa::StackedHa,
            ..Default::default()
        };
        let found = codes(
            &prod_workload(Distribution::Gke),
            &OvercommitConfig::default(),
            &ha_dr,
            &self_managed(),
        );
        assert!(found.contains(&WarningCode::ManagedDistributionHaIgnored));
        assert!(!found.contains(&WarningCode::SingleControlPlane));
    }

    #[test]
    fn test_managed_ha_on_kubeadm() {
        let ha_dr = HaDrConfig {
            control_plane_ha: ControlPlaneHa::Managed,
            ..Default::default()
        };
        let found = codes(
            &prod_workload(Distribution::Kubeadm),
            &OvercommitConfig::default(),
            &ha_dr,
            &self_managed(),
        );
        assert!(found.contains(&WarningCode::ManagedHaOnSelfManaged));
    }

    #[test]
    fn test_dr_conflicts() {
        let workload = prod_workload(Distribution::Rancher).with_environment(
            EnvironmentKind::Dr,
            EnvironmentWorkload::new(AppCount::new(4, 2, 0, 0)),
        );
        let ha_dr = HaDrConfig {
            dr_pattern: DrPattern::HotStandby,
            backup: BackupConfig {
                strategy: BackupStrategy::Kasten,
                frequency_hours: 48,
                ..Default::default()
            },
            ..Default::default()
        };
        let found = codes(&workload, &OvercommitConfig::default(), &ha_dr, &self_managed());
        assert!(found.contains(&WarningCode::DrEnvironmentDoubleCount));
        assert!(found.contains(&WarningCode::InfrequentBackups));
        assert!(found.contains(&WarningCode::StandbyOnSingleZone));

        let ha_dr = HaDrConfig {
            dr_pattern: DrPattern::BackupRestore,
            ..Default::default()
        };
        let found = codes(&workload, &OvercommitConfig::default(), &ha_dr, &self_managed());
        assert!(found.contains(&WarningCode::BackupRestoreWithoutBackup));
        assert!(!found.contains(&WarningCode::DrEnvironmentDoubleCount));
    }

    #[test]
    fn test_commercial_rules() {
        let overcommit = OvercommitConfig {
            prod: OvercommitRatios {
                cpu_ratio: 3.0,
                memory_ratio: 1.0,
            },
            ..Default::default()
        };
        let deployment = DeploymentConfig {
            use_unlimited_users: true,
            ..Default::default()
        };
        let found = codes(
            &prod_workload(Distribution::VirtualMachines),
            &overcommit,
            &HaDrConfig::default().with_node_distribution(NodeDistribution::MultiRegion),
            &deployment,
        );
        assert!(found.contains(&WarningCode::HighProdOvercommit));
        assert!(found.contains(&WarningCode::UnlimitedUsersWithoutPacks));
        assert!(found.contains(&WarningCode::MultiRegionWithoutDr));
        // VMs have no control plane to size, so cloud hosting raises no sizing note
        assert!(!found.contains(&WarningCode::CloudHostingSelfManagedDistribution));
    }

    #[test]
    fn test_cloud_hosting_with_kubeadm() {
        let found = codes(
            &prod_workload(Distribution::OpenShift),
            &OvercommitConfig::default(),
            &HaDrConfig::default(),
            &DeploymentConfig::default(),
        );
        assert!(found.contains(&WarningCode::CloudHostingSelfManagedDistribution));
    }

    #[test]
    fn test_vm_runtime_ignores_control_plane_ha() {
        let ha_dr = HaDrConfig {
            control_plane_ha: ControlPlaneHa::StackedHa,
            ..Default::default()
        };
        let found = codes(
            &prod_workload(Distribution::VirtualMachines),
            &OvercommitConfig::default(),
            &ha_dr,
            &self_managed(),
        );
        assert!(found.contains(&WarningCode::VmControlPlaneHaIgnored));
        assert!(!found.contains(&WarningCode::SingleControlPlane));
    }
}
