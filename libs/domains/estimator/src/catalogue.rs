//! Static catalogues: size-tier footprints, node-role defaults and the
//! distribution capability table.
//!
//! Adding a distribution is an edit to [`Distribution::profile`]; sizing and
//! pricing only ever look at the returned [`DistributionProfile`].

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use validator::Validate;

use crate::models::{CloudProvider, EnvironmentClass, NodeRole, NodeRoleSpec, SizeTier};

/// Per-application CPU / RAM footprint of a size tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierFootprint {
    pub cpu_cores: f64,
    pub ram_gb: f64,
}

/// Size tier → footprint mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCatalogue {
    pub small: TierFootprint,
    pub medium: TierFootprint,
    pub large: TierFootprint,
    pub xlarge: TierFootprint,
}

impl TierCatalogue {
    pub fn standard() -> Self {
        Self {
            small: TierFootprint {
                cpu_cores: 0.25,
                ram_gb: 0.5,
            },
            medium: TierFootprint {
                cpu_cores: 0.5,
                ram_gb: 1.0,
            },
            large: TierFootprint {
                cpu_cores: 1.0,
                ram_gb: 2.0,
            },
            xlarge: TierFootprint {
                cpu_cores: 2.0,
                ram_gb: 4.0,
            },
        }
    }

    pub fn footprint(&self, tier: SizeTier) -> TierFootprint {
        match tier {
            SizeTier::Small => self.small,
            SizeTier::Medium => self.medium,
            SizeTier::Large => self.large,
            SizeTier::XLarge => self.xlarge,
        }
    }
}

impl Default for TierCatalogue {
    fn default() -> Self {
        Self::standard()
    }
}

/// Prod / non-prod pair of specs for one role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct RoleSpecs {
    #[validate(nested)]
    pub prod: NodeRoleSpec,
    #[validate(nested)]
    pub non_prod: NodeRoleSpec,
}

/// Node-role spec table: {control plane, worker, infra} × {prod, non-prod}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct NodeSpecs {
    #[validate(nested)]
    pub control_plane: RoleSpecs,
    #[validate(nested)]
    pub worker: RoleSpecs,
    #[validate(nested)]
    pub infra: RoleSpecs,
}

impl NodeSpecs {
    pub fn standard() -> Self {
        Self {
            control_plane: RoleSpecs {
                prod: NodeRoleSpec::new(4.0, 16.0, 120.0),
                non_prod: NodeRoleSpec::new(2.0, 8.0, 80.0),
            },
            worker: RoleSpecs {
                prod: NodeRoleSpec::new(8.0, 32.0, 200.0),
                non_prod: NodeRoleSpec::new(4.0, 16.0, 120.0),
            },
            infra: RoleSpecs {
                prod: NodeRoleSpec::new(4.0, 16.0, 200.0),
                non_prod: NodeRoleSpec::new(2.0, 8.0, 120.0),
            },
        }
    }

    pub fn spec(&self, role: NodeRole, class: EnvironmentClass) -> NodeRoleSpec {
        let specs = match role {
            NodeRole::ControlPlane => &self.control_plane,
            NodeRole::Worker => &self.worker,
            NodeRole::Infra => &self.infra,
        };
        match class {
            EnvironmentClass::Prod => specs.prod,
            EnvironmentClass::NonProd => specs.non_prod,
        }
    }
}

impl Default for NodeSpecs {
    fn default() -> Self {
        Self::standard()
    }
}

/// Workload runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Runtime {
    Kubernetes,
    VirtualMachines,
}

/// Kubernetes distribution or plain VM infrastructure
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Distribution {
    #[default]
    Kubeadm,
    #[serde(rename = "openshift")]
    #[strum(serialize = "openshift")]
    OpenShift,
    Rancher,
    Tanzu,
    Eks,
    Aks,
    Gke,
    VirtualMachines,
}

/// Capabilities that drive sizing and pricing for a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionProfile {
    pub display_name: &'static str,
    pub runtime: Runtime,
    pub managed_control_plane: bool,
    pub cloud_provider: Option<CloudProvider>,
}

impl DistributionProfile {
    /// Whether the estimate sizes control-plane nodes at all
    pub fn sizes_control_plane(&self) -> bool {
        self.runtime == Runtime::Kubernetes && !self.managed_control_plane
    }
}

impl Distribution {
    pub fn profile(self) -> DistributionProfile {
        use Distribution::*;

        let (display_name, runtime, managed_control_plane, cloud_provider) = match self {
            Kubeadm => ("Upstream Kubernetes", Runtime::Kubernetes, false, None),
            OpenShift => ("Red Hat OpenShift", Runtime::Kubernetes, false, None),
            Rancher => ("Rancher RKE2", Runtime::Kubernetes, false, None),
            Tanzu => ("VMware Tanzu", Runtime::Kubernetes, false, None),
            Eks => (
                "Amazon EKS",
                Runtime::Kubernetes,
                true,
                Some(CloudProvider::Aws),
            ),
            Aks => (
                "Azure AKS",
                Runtime::Kubernetes,
                true,
                Some(CloudProvider::Azure),
            ),
            Gke => (
                "Google GKE",
                Runtime::Kubernetes,
                true,
                Some(CloudProvider::Gcp),
            ),
            VirtualMachines => ("Virtual machines", Runtime::VirtualMachines, false, None),
        };

        DistributionProfile {
            display_name,
            runtime,
            managed_control_plane,
            cloud_provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_standard_tier_footprints_grow_with_tier() {
        let catalogue = TierCatalogue::standard();
        let cpus: Vec<f64> = SizeTier::iter()
            .map(|t| catalogue.footprint(t).cpu_cores)
            .collect();
        assert_eq!(cpus, vec![0.25, 0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_node_spec_lookup() {
        let specs = NodeSpecs::standard();
        assert_eq!(
            specs.spec(NodeRole::Worker, EnvironmentClass::Prod).cpu_cores,
            8.0
        );
        assert_eq!(
            specs.spec(NodeRole::Infra, EnvironmentClass::NonProd).ram_gb,
            8.0
        );
    }

    #[test]
    fn test_managed_distributions_skip_control_plane() {
        for distribution in Distribution::iter() {
            let profile = distribution.profile();
            if profile.managed_control_plane {
                assert!(profile.cloud_provider.is_some(), "{distribution}");
                assert!(!profile.sizes_control_plane());
            }
        }
        assert!(Distribution::Kubeadm.profile().sizes_control_plane());
        assert!(!Distribution::VirtualMachines.profile().sizes_control_plane());
    }
}
